use actix_web::{dev::Payload, http::header::HeaderValue, web, FromRequest, HttpRequest};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::future::{ready, Ready};
use std::num::ParseIntError;

use crate::error::{LedgerError, Result};
use crate::schemas::{MemberId, User};

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|err| LedgerError::Validation(err.to_string()))
}

/// What a bearer token says about its holder.
///
/// The payload segment is plain base64 JSON so clients can read their own
/// member id without verifying the signature.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenClaims {
    pub sub: MemberId,
    pub name: String,
    pub exp: i64,
}

/// Issues and checks `payload.signature` bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = TokenClaims {
            sub: user.id.clone(),
            name: user.name.clone(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|err| LedgerError::Validation(err.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = keyed(&self.secret)?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let invalid = || LedgerError::Unauthorized("invalid token".to_string());
        let (payload, signature) = token.split_once('.').ok_or_else(invalid)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| invalid())?;

        let mut mac = keyed(&self.secret)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        let claims: TokenClaims = decode_claims(payload).ok_or_else(invalid)?;
        if claims.exp < Utc::now().timestamp() {
            return Err(LedgerError::Unauthorized("token expired".to_string()));
        }
        Ok(claims)
    }
}

/// Reads the claims of a token without checking its signature.
pub fn decode_claims(payload: &str) -> Option<TokenClaims> {
    let payload = payload.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub member_id: MemberId,
    pub name: String,
}

pub fn check_authorization(request: &HttpRequest) -> Result<Session> {
    let missing = || LedgerError::Unauthorized("missing bearer token".to_string());
    let authorization = request
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(HeaderValue::to_str)
        .ok_or_else(missing)?
        .map_err(|_| missing())?;
    let token = authorization
        .strip_prefix("Bearer ")
        .ok_or_else(missing)?
        .trim();

    let signer = request
        .app_data::<web::Data<TokenSigner>>()
        .ok_or_else(|| LedgerError::Unauthorized("token signer not configured".to_string()))?;
    let claims = signer.verify(token)?;
    Ok(Session {
        member_id: claims.sub,
        name: claims.name,
    })
}

impl FromRequest for Session {
    type Error = LedgerError;
    type Future = Ready<Result<Self>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            check_authorization(request)
                .inspect_err(|err| tracing::debug!("rejected request: {err}")),
        )
    }
}

pub fn new_salt() -> String {
    bson::oid::ObjectId::new().to_hex()
}

pub fn hash_password(salt: &str, password: &str) -> Result<String> {
    let mut mac = keyed(salt.as_bytes())?;
    mac.update(password.as_bytes());
    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

pub fn verify_password(user: &User, password: &str) -> bool {
    let Ok(expected) = user
        .password_hash
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|n| u8::from_str_radix(&String::from_iter(n), 16))
        .collect::<std::result::Result<Vec<u8>, ParseIntError>>()
    else {
        return false;
    };
    let Ok(mut mac) = keyed(user.salt.as_bytes()) else {
        return false;
    };
    mac.update(password.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
