use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analytics::workspace_analytics;
use crate::auth::{hash_password, new_salt, verify_password, Session, TokenSigner};
use crate::error::{LedgerError, Result};
use crate::insights::{
    available_categories, build_personal_expense, insights, new_category, predict_category,
};
use crate::ledger::GroupLedger;
use crate::money::Money;
use crate::schemas::{new_id, ExpenseDraft, Member, PersonalExpenseDraft, SettlementStatus, User};
use crate::store::Store;

#[derive(Deserialize)]
struct RegisterJson {
    username: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct LoginJson {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: Member,
}

#[derive(Deserialize)]
struct GroupJson {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct InviteJson {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettlementJson {
    to_user_id: String,
    amount: Money,
    #[serde(default)]
    status: Option<SettlementStatus>,
}

#[derive(Deserialize)]
struct CategoryJson {
    name: String,
}

#[derive(Deserialize)]
struct PredictJson {
    title: String,
}

#[post("/register")]
async fn register(store: web::Data<Store>, json: web::Json<RegisterJson>) -> Result<HttpResponse> {
    let json = json.into_inner();
    let username = json.username.trim().to_string();
    if username.is_empty() {
        return Err(LedgerError::Validation("username is required".to_string()));
    }
    if json.password.len() < 6 {
        return Err(LedgerError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }

    let salt = new_salt();
    let user = User {
        id: new_id(),
        name: json
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| username.clone()),
        email: json.email.unwrap_or_default().trim().to_lowercase(),
        password_hash: hash_password(&salt, &json.password)?,
        salt,
        username,
        created_at: Utc::now(),
    };
    store.insert_user(&user).await?;
    tracing::info!(user = %user.id, "user registered");
    Ok(HttpResponse::Created().json(user.as_member()))
}

#[post("/login")]
async fn login(
    store: web::Data<Store>,
    signer: web::Data<TokenSigner>,
    json: web::Json<LoginJson>,
) -> Result<HttpResponse> {
    let rejected = || LedgerError::Unauthorized("wrong username or password".to_string());
    let user = store
        .user_by_username(json.username.trim())
        .await?
        .ok_or_else(rejected)?;
    if !verify_password(&user, &json.password) {
        return Err(rejected());
    }
    Ok(HttpResponse::Ok().json(LoginResponse {
        token: signer.issue(&user)?,
        user: user.as_member(),
    }))
}

#[get("/groups")]
async fn list_groups(store: web::Data<Store>, session: Session) -> Result<HttpResponse> {
    let overviews: Vec<_> = store
        .groups_of(&session.member_id)
        .await?
        .into_iter()
        .map(|group| GroupLedger::from_group(group).overview(&session.member_id))
        .collect();
    Ok(HttpResponse::Ok().json(overviews))
}

#[post("/groups")]
async fn add_group(
    store: web::Data<Store>,
    session: Session,
    json: web::Json<GroupJson>,
) -> Result<HttpResponse> {
    let creator = store
        .user(&session.member_id)
        .await?
        .as_member();
    let ledger = GroupLedger::create(&json.name, &json.description, creator)?;
    store.insert_group(ledger.group()).await?;
    tracing::info!(group = %ledger.group().id, "group added");
    Ok(HttpResponse::Created().json(ledger.details()))
}

#[get("/groups/{id}")]
async fn get_group(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let ledger = store.group_for_member(&id, &session.member_id).await?;
    Ok(HttpResponse::Ok().json(ledger.details()))
}

#[delete("/groups/{id}")]
async fn delete_group(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    store.delete_group(&id, &session.member_id).await?;
    tracing::info!(group = %id, by = %session.member_id, "group deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/groups/{id}/invite")]
async fn invite_member(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<InviteJson>,
) -> Result<HttpResponse> {
    let email = json.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(LedgerError::Validation("email is required".to_string()));
    }
    let mut ledger = store.group_for_member(&id, &session.member_id).await?;
    let invited = store.user_by_email(&email).await?.as_member();
    let member = ledger.add_member(&session.member_id, invited)?.clone();
    store.save_group(ledger).await?;
    Ok(HttpResponse::Created().json(member))
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
    expense: web::Json<ExpenseDraft>,
) -> Result<HttpResponse> {
    let mut ledger = store.group_for_member(&id, &session.member_id).await?;
    let expense = ledger
        .add_expense(&session.member_id, expense.into_inner())?
        .clone();
    store.save_group(ledger).await?;
    Ok(HttpResponse::Created().json(expense))
}

#[put("/expenses/{id}")]
async fn edit_expense(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
    expense: web::Json<ExpenseDraft>,
) -> Result<HttpResponse> {
    let mut ledger = store.group_with_expense(&id, &session.member_id).await?;
    let expense = ledger
        .edit_expense(&session.member_id, &id, expense.into_inner())?
        .clone();
    store.save_group(ledger).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[post("/groups/{id}/settlements")]
async fn add_settlement(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<SettlementJson>,
) -> Result<HttpResponse> {
    let mut ledger = store.group_for_member(&id, &session.member_id).await?;
    let settlement = ledger
        .add_settlement(
            &session.member_id,
            &json.to_user_id,
            json.amount,
            json.status.unwrap_or(SettlementStatus::Settled),
        )?
        .clone();
    store.save_group(ledger).await?;
    Ok(HttpResponse::Created().json(settlement))
}

#[post("/groups/{group_id}/settlements/{id}/confirm")]
async fn confirm_settlement(
    store: web::Data<Store>,
    session: Session,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (group_id, id) = path.into_inner();
    let mut ledger = store.group_for_member(&group_id, &session.member_id).await?;
    let settlement = ledger.confirm_settlement(&session.member_id, &id)?.clone();
    store.save_group(ledger).await?;
    Ok(HttpResponse::Ok().json(settlement))
}

#[get("/analytics")]
async fn analytics(store: web::Data<Store>, session: Session) -> Result<HttpResponse> {
    let groups = store.groups_of(&session.member_id).await?;
    Ok(HttpResponse::Ok().json(workspace_analytics(&groups, &session.member_id)))
}

#[get("/expenses")]
async fn list_personal(store: web::Data<Store>, session: Session) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(store.personal_expenses(&session.member_id).await?))
}

#[post("/expenses")]
async fn add_personal(
    store: web::Data<Store>,
    session: Session,
    json: web::Json<PersonalExpenseDraft>,
) -> Result<HttpResponse> {
    let expense = build_personal_expense(new_id(), &session.member_id, json.into_inner())?;
    store.insert_personal_expense(&expense).await?;
    tracing::info!(expense = %expense.id, "personal expense added");
    Ok(HttpResponse::Created().json(expense))
}

#[put("/expenses/{id}")]
async fn edit_personal(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<PersonalExpenseDraft>,
) -> Result<HttpResponse> {
    let expense = build_personal_expense(id.into_inner(), &session.member_id, json.into_inner())?;
    store.replace_personal_expense(&expense).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[delete("/expenses/{id}")]
async fn delete_personal(
    store: web::Data<Store>,
    session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    store
        .delete_personal_expense(&session.member_id, &id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/categories")]
async fn list_categories(store: web::Data<Store>, session: Session) -> Result<HttpResponse> {
    let custom = store.categories_of(&session.member_id).await?;
    Ok(HttpResponse::Ok().json(available_categories(&custom)))
}

#[post("/categories")]
async fn add_category(
    store: web::Data<Store>,
    session: Session,
    json: web::Json<CategoryJson>,
) -> Result<HttpResponse> {
    let existing = store.categories_of(&session.member_id).await?;
    let category = new_category(&session.member_id, &json.name, &existing)?;
    store.insert_category(&category).await?;
    Ok(HttpResponse::Created().json(category))
}

#[get("/insights")]
async fn get_insights(store: web::Data<Store>, session: Session) -> Result<HttpResponse> {
    let expenses = store.personal_expenses(&session.member_id).await?;
    Ok(HttpResponse::Ok().json(insights(&expenses)))
}

#[post("/predict")]
async fn predict(
    store: web::Data<Store>,
    session: Session,
    json: web::Json<PredictJson>,
) -> Result<HttpResponse> {
    let custom = store.categories_of(&session.member_id).await?;
    Ok(HttpResponse::Ok().json(predict_category(&json.title, &custom)))
}

/// Mounts every endpoint under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/splitter")
                    .service(list_groups)
                    .service(add_group)
                    .service(get_group)
                    .service(delete_group)
                    .service(invite_member)
                    .service(add_expense)
                    .service(edit_expense)
                    .service(add_settlement)
                    .service(confirm_settlement)
                    .service(analytics),
            )
            .service(register)
            .service(login)
            .service(list_personal)
            .service(add_personal)
            .service(edit_personal)
            .service(delete_personal)
            .service(list_categories)
            .service(add_category)
            .service(get_insights)
            .service(predict),
    );
}
