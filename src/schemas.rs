use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

pub type MemberId = String;

/// Fresh document identifier, shared by every collection.
pub fn new_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: MemberId,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    Equal,
    Percentage,
    Exact,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PaymentMode {
    #[default]
    Cash,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Credit Card", alias = "CreditCard")]
    CreditCard,
    #[serde(rename = "Debit Card", alias = "DebitCard")]
    DebitCard,
    #[serde(rename = "Net Banking", alias = "NetBanking")]
    NetBanking,
}

impl PaymentMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Upi => "UPI",
            Self::CreditCard => "Credit Card",
            Self::DebitCard => "Debit Card",
            Self::NetBanking => "Net Banking",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

/// One participant's owed share of an expense, `{"user", "amount"}` on the wire.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    #[serde(rename = "user", alias = "member")]
    pub member: MemberId,
    #[serde(rename = "amount", alias = "owedAmount")]
    pub owed_amount: Money,
    /// Kept for percentage splits so the expense can be edited again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

/// A participant's requested share as posted by a client.
///
/// `amount` is read for exact splits, `percentage` for percentage splits,
/// neither for equal splits.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInput {
    #[serde(alias = "user")]
    pub member: MemberId,
    #[serde(default, alias = "owedAmount")]
    pub amount: Option<Money>,
    #[serde(default)]
    pub percentage: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub amount: Money,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(rename = "paidBy", alias = "payer")]
    pub payer: MemberId,
    pub split_type: SplitType,
    pub participants: Vec<MemberId>,
    pub splits: Vec<Split>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub edited: bool,
}

/// Body of `POST /groups/{id}/expenses` and `PUT /expenses/{id}`.
///
/// Every optional field left out of an edit keeps the stored value.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: Money,
    pub split_type: SplitType,
    pub participants: Vec<MemberId>,
    #[serde(default)]
    pub splits: Vec<ShareInput>,
    /// Defaults to the caller.
    #[serde(default, rename = "paidBy", alias = "payer")]
    pub payer: Option<MemberId>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub recurring: Option<bool>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Settled,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "fromUser")]
    pub from_member: MemberId,
    #[serde(rename = "toUser")]
    pub to_member: MemberId,
    pub amount: Money,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    ExpenseAdded,
    ExpenseEdited,
    SettlementRecorded,
    MemberJoined,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Audit trail entry. Appended, never rewritten.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: String,
    pub action: ActivityKind,
    #[serde(rename = "actorId")]
    pub actor: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    pub metadata: ActivityMetadata,
    pub created_at: DateTime<Utc>,
}

/// A group document: owns its expenses, settlements and activities.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_by: MemberId,
    pub members: Vec<Member>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub settlements: Vec<Settlement>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// Bumped on every write, used for optimistic concurrency.
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.member(id).is_some()
    }
}

/// Registered account. Only [`Member`] leaves the server.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: MemberId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn as_member(&self) -> Member {
        Member {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Expense outside any group, tracked for a single owner.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalExpense {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: MemberId,
    pub title: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalExpenseDraft {
    pub title: String,
    pub amount: Money,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: MemberId,
    pub name: String,
}
