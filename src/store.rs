//! MongoDB persistence.
//!
//! A group is a single document embedding its expenses, settlements and
//! activities, so every ledger write lands atomically. Writes are guarded by
//! the document `version`: a save only succeeds against the version it was
//! loaded at, otherwise the caller gets [`LedgerError::Conflict`].
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection, Database};

use crate::error::{LedgerError, Result};
use crate::ledger::GroupLedger;
use crate::schemas::{Category, Group, PersonalExpense, User};
use crate::settings;

#[derive(Clone, Debug)]
pub struct Store {
    db: Database,
}

impl Store {
    pub async fn connect(settings: &settings::Database) -> Result<Self> {
        let client = Client::with_uri_str(&settings.uri).await?;
        Ok(Self::new(client.database(&settings.name)))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("Users")
    }

    fn groups(&self) -> Collection<Group> {
        self.db.collection("Groups")
    }

    fn expenses(&self) -> Collection<PersonalExpense> {
        self.db.collection("Expenses")
    }

    fn categories(&self) -> Collection<Category> {
        self.db.collection("Categories")
    }

    pub async fn insert_user(&self, user: &User) -> Result<()> {
        let mut clauses = vec![doc! { "username": &user.username }];
        if !user.email.is_empty() {
            clauses.push(doc! { "email": &user.email });
        }
        let taken = self
            .users()
            .find_one(doc! { "$or": clauses }, None)
            .await?;
        if taken.is_some() {
            return Err(LedgerError::ExistingKey(user.username.clone()));
        }
        self.users().insert_one(user, None).await?;
        Ok(())
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users()
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    pub async fn user(&self, id: &str) -> Result<User> {
        self.users()
            .find_one(doc! { "_id": id }, None)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {id}")))
    }

    pub async fn user_by_email(&self, email: &str) -> Result<User> {
        self.users()
            .find_one(doc! { "email": email }, None)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {email}")))
    }

    pub async fn insert_group(&self, group: &Group) -> Result<()> {
        self.groups().insert_one(group, None).await?;
        Ok(())
    }

    /// Loads a group the member belongs to. Other groups look missing.
    pub async fn group_for_member(&self, id: &str, member: &str) -> Result<GroupLedger> {
        self.groups()
            .find_one(doc! { "_id": id, "members._id": member }, None)
            .await?
            .map(GroupLedger::from_group)
            .ok_or_else(|| LedgerError::NotFound(format!("group {id}")))
    }

    pub async fn group_with_expense(&self, expense_id: &str, member: &str) -> Result<GroupLedger> {
        self.groups()
            .find_one(doc! { "expenses._id": expense_id, "members._id": member }, None)
            .await?
            .map(GroupLedger::from_group)
            .ok_or_else(|| LedgerError::NotFound(format!("expense {expense_id}")))
    }

    pub async fn groups_of(&self, member: &str) -> Result<Vec<Group>> {
        let cursor = self
            .groups()
            .find(doc! { "members._id": member }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Writes the ledger back if nobody else saved the group in between.
    pub async fn save_group(&self, ledger: GroupLedger) -> Result<Group> {
        let mut group = ledger.into_group();
        let loaded = group.version;
        group.version = loaded + 1;

        let result = self
            .groups()
            .replace_one(doc! { "_id": &group.id, "version": loaded }, &group, None)
            .await?;
        if result.matched_count == 0 {
            tracing::warn!(group = %group.id, version = loaded, "stale group write");
            return Err(LedgerError::Conflict(format!("group {}", group.id)));
        }
        Ok(group)
    }

    /// Removes the group with everything it owns.
    pub async fn delete_group(&self, id: &str, member: &str) -> Result<()> {
        let result = self
            .groups()
            .delete_one(doc! { "_id": id, "members._id": member }, None)
            .await?;
        if result.deleted_count == 0 {
            return Err(LedgerError::NotFound(format!("group {id}")));
        }
        Ok(())
    }

    pub async fn personal_expenses(&self, owner: &str) -> Result<Vec<PersonalExpense>> {
        let cursor = self.expenses().find(doc! { "owner": owner }, None).await?;
        let mut expenses: Vec<PersonalExpense> = cursor.try_collect().await?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    pub async fn insert_personal_expense(&self, expense: &PersonalExpense) -> Result<()> {
        self.expenses().insert_one(expense, None).await?;
        Ok(())
    }

    pub async fn replace_personal_expense(&self, expense: &PersonalExpense) -> Result<()> {
        let result = self
            .expenses()
            .replace_one(doc! { "_id": &expense.id, "owner": &expense.owner }, expense, None)
            .await?;
        if result.matched_count == 0 {
            return Err(LedgerError::NotFound(format!("expense {}", expense.id)));
        }
        Ok(())
    }

    pub async fn delete_personal_expense(&self, owner: &str, id: &str) -> Result<()> {
        let result = self
            .expenses()
            .delete_one(doc! { "_id": id, "owner": owner }, None)
            .await?;
        if result.deleted_count == 0 {
            return Err(LedgerError::NotFound(format!("expense {id}")));
        }
        Ok(())
    }

    pub async fn categories_of(&self, owner: &str) -> Result<Vec<Category>> {
        let cursor = self
            .categories()
            .find(doc! { "owner": owner }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn insert_category(&self, category: &Category) -> Result<()> {
        self.categories().insert_one(category, None).await?;
        Ok(())
    }
}
