//! One group's ledger: members, expenses, settlements and the activity log.
//!
//! Every write is validated in full before anything is changed, so a failed
//! call leaves the group exactly as it was. Balances and simplified debts are
//! recomputed from the history on each read.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::balance::{compute_balance_from_group, Balances};
use crate::error::{LedgerError, Result};
use crate::exchange::{get_exchanges_from_group, Exchange};
use crate::money::Money;
use crate::schemas::{
    new_id, Activity, ActivityKind, ActivityMetadata, Expense, ExpenseDraft, Group, Member,
    MemberId, Settlement, SettlementStatus,
};
use crate::split::{check_amount, compute_splits};

/// Payload of `GET /groups/{id}`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetails {
    pub group: GroupSummary,
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
    pub balances: Balances,
    pub simplified_debts: Vec<Exchange>,
    pub activities: Vec<Activity>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: MemberId,
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
}

/// Row of the caller's group list.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOverview {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub member_count: usize,
    pub total_spend: Money,
    pub your_balance: Money,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupLedger {
    group: Group,
}

impl GroupLedger {
    /// Starts a group with its creator as the only member.
    pub fn create(name: &str, description: &str, creator: Member) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("group name is required".to_string()));
        }
        Ok(Self {
            group: Group {
                id: new_id(),
                name: name.to_string(),
                description: description.trim().to_string(),
                created_by: creator.id.clone(),
                members: vec![creator],
                expenses: vec![],
                settlements: vec![],
                activities: vec![],
                version: 0,
                created_at: Utc::now(),
            },
        })
    }

    pub fn from_group(group: Group) -> Self {
        Self { group }
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn into_group(self) -> Group {
        self.group
    }

    fn require_member(&self, id: &str) -> Result<&Member> {
        self.group
            .member(id)
            .ok_or_else(|| LedgerError::NotFound(format!("member {id}")))
    }

    fn log(
        &mut self,
        action: ActivityKind,
        actor: &str,
        related_id: Option<String>,
        metadata: ActivityMetadata,
    ) {
        self.group.activities.push(Activity {
            id: new_id(),
            action,
            actor: actor.to_string(),
            related_id,
            metadata,
            created_at: Utc::now(),
        });
    }

    pub fn add_member(&mut self, actor: &str, member: Member) -> Result<&Member> {
        if self.group.is_member(&member.id) {
            return Err(LedgerError::ExistingKey(member.email));
        }
        tracing::info!(group = %self.group.id, member = %member.id, "member joined");
        let metadata = ActivityMetadata {
            name: Some(member.name.clone()),
            ..Default::default()
        };
        let related = Some(member.id.clone());
        let at = self.group.members.len();
        self.group.members.push(member);
        self.log(ActivityKind::MemberJoined, actor, related, metadata);
        Ok(&self.group.members[at])
    }

    /// Builds a validated expense from `draft` without touching the group.
    ///
    /// Optional fields the draft leaves out are taken from `current` when
    /// editing. A new expense is paid by `actor` unless the draft says so.
    fn build_expense(
        &self,
        id: String,
        actor: &str,
        draft: ExpenseDraft,
        current: Option<&Expense>,
    ) -> Result<Expense> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(LedgerError::Validation("title is required".to_string()));
        }
        let payer = draft
            .payer
            .or_else(|| current.map(|e| e.payer.clone()))
            .unwrap_or_else(|| actor.to_string());
        self.require_member(&payer)?;
        for participant in &draft.participants {
            self.require_member(participant)?;
        }
        let splits = compute_splits(
            draft.amount,
            draft.split_type,
            &draft.participants,
            &draft.splits,
        )?;

        let recurring = draft
            .recurring
            .or(current.map(|e| e.recurring))
            .unwrap_or(false);
        let frequency = draft.frequency.or(current.and_then(|e| e.frequency));
        Ok(Expense {
            id,
            title: title.to_string(),
            amount: draft.amount,
            date: draft
                .date
                .or(current.map(|e| e.date))
                .unwrap_or_else(Utc::now),
            category: draft
                .category
                .or_else(|| current.and_then(|e| e.category.clone())),
            payment_mode: draft
                .payment_mode
                .or(current.map(|e| e.payment_mode))
                .unwrap_or_default(),
            payer,
            split_type: draft.split_type,
            participants: draft.participants,
            splits,
            recurring,
            frequency: recurring.then(|| frequency.unwrap_or_default()),
            notes: draft
                .notes
                .or_else(|| current.and_then(|e| e.notes.clone())),
            edited: current.is_some(),
        })
    }

    /// Records a new expense paid by `draft.payer`, or by `actor` when unset.
    pub fn add_expense(&mut self, actor: &str, draft: ExpenseDraft) -> Result<&Expense> {
        self.require_member(actor)?;
        let expense = self
            .build_expense(new_id(), actor, draft, None)
            .inspect_err(|err| tracing::warn!(group = %self.group.id, "expense rejected: {err}"))?;

        tracing::info!(
            group = %self.group.id,
            expense = %expense.id,
            amount = %expense.amount,
            "expense added"
        );
        let metadata = ActivityMetadata {
            title: Some(expense.title.clone()),
            amount: Some(expense.amount),
            ..Default::default()
        };
        let related = Some(expense.id.clone());
        let at = self.group.expenses.len();
        self.group.expenses.push(expense);
        self.log(ActivityKind::ExpenseAdded, actor, related, metadata);
        Ok(&self.group.expenses[at])
    }

    /// Replaces an expense with a re-validated version of it. Only its payer
    /// may do so.
    ///
    /// Fields the draft leaves unset carry over from the stored expense.
    /// Settlements already recorded are left alone.
    pub fn edit_expense(
        &mut self,
        actor: &str,
        expense_id: &str,
        draft: ExpenseDraft,
    ) -> Result<&Expense> {
        self.require_member(actor)?;
        let position = self
            .group
            .expenses
            .iter()
            .position(|e| e.id == expense_id)
            .ok_or_else(|| LedgerError::NotFound(format!("expense {expense_id}")))?;
        let current = &self.group.expenses[position];
        if current.payer != actor {
            return Err(LedgerError::Unauthorized(
                "only the payer can edit an expense".to_string(),
            ));
        }
        let expense = self
            .build_expense(current.id.clone(), actor, draft, Some(current))
            .inspect_err(|err| {
                tracing::warn!(group = %self.group.id, expense = expense_id, "edit rejected: {err}")
            })?;

        tracing::info!(group = %self.group.id, expense = expense_id, "expense edited");
        let metadata = ActivityMetadata {
            title: Some(expense.title.clone()),
            amount: Some(expense.amount),
            ..Default::default()
        };
        self.group.expenses[position] = expense;
        let related = Some(expense_id.to_string());
        self.log(ActivityKind::ExpenseEdited, actor, related, metadata);
        Ok(&self.group.expenses[position])
    }

    /// Records a payment from `from` to `to`. Payments are append-only.
    pub fn add_settlement(
        &mut self,
        from: &str,
        to: &str,
        amount: Money,
        status: SettlementStatus,
    ) -> Result<&Settlement> {
        check_amount(amount)?;
        if from == to {
            return Err(LedgerError::Validation(
                "cannot settle a debt with yourself".to_string(),
            ));
        }
        self.require_member(from)?;
        let to_name = self.require_member(to)?.name.clone();

        let settlement = Settlement {
            id: new_id(),
            from_member: from.to_string(),
            to_member: to.to_string(),
            amount,
            status,
            created_at: Utc::now(),
        };
        tracing::info!(group = %self.group.id, from, to, %amount, ?status, "settlement recorded");
        let metadata = ActivityMetadata {
            amount: Some(amount),
            to_name: Some(to_name),
            ..Default::default()
        };
        let related = Some(settlement.id.clone());
        let at = self.group.settlements.len();
        self.group.settlements.push(settlement);
        self.log(ActivityKind::SettlementRecorded, from, related, metadata);
        Ok(&self.group.settlements[at])
    }

    /// Marks a pending payment as settled. Settled payments never change.
    pub fn confirm_settlement(&mut self, actor: &str, settlement_id: &str) -> Result<&Settlement> {
        let settlement = self
            .group
            .settlements
            .iter_mut()
            .find(|s| s.id == settlement_id)
            .ok_or_else(|| LedgerError::NotFound(format!("settlement {settlement_id}")))?;
        if settlement.status == SettlementStatus::Settled {
            return Err(LedgerError::Validation(format!(
                "settlement {settlement_id} is already settled"
            )));
        }
        if settlement.to_member != actor {
            return Err(LedgerError::Unauthorized(
                "only the receiver can confirm a payment".to_string(),
            ));
        }
        settlement.status = SettlementStatus::Settled;
        tracing::info!(settlement = settlement_id, "settlement confirmed");
        Ok(&*settlement)
    }

    /// Newest first.
    pub fn list_activity(&self) -> Vec<&Activity> {
        self.group.activities.iter().rev().collect()
    }

    pub fn current_balances(&self) -> Balances {
        compute_balance_from_group(&self.group)
    }

    /// Transfers that settle every balance, at most one fewer than there are
    /// members. Usually the greedy largest-debtor plan of [`simplify_debts`];
    /// when the direct pairwise debts need strictly fewer transfers, those are
    /// returned instead.
    ///
    /// [`simplify_debts`]: crate::exchange::simplify_debts
    pub fn current_simplified_debts(&self) -> Vec<Exchange> {
        get_exchanges_from_group(&self.group)
    }

    pub fn details(&self) -> GroupDetails {
        let group = &self.group;
        GroupDetails {
            group: GroupSummary {
                id: group.id.clone(),
                name: group.name.clone(),
                description: group.description.clone(),
                created_by: group.created_by.clone(),
                members: group.members.clone(),
                created_at: group.created_at,
            },
            expenses: group.expenses.clone(),
            settlements: group.settlements.clone(),
            balances: self.current_balances(),
            simplified_debts: self.current_simplified_debts(),
            activities: self.list_activity().into_iter().cloned().collect(),
        }
    }

    pub fn overview(&self, member: &str) -> GroupOverview {
        GroupOverview {
            id: self.group.id.clone(),
            name: self.group.name.clone(),
            description: self.group.description.clone(),
            member_count: self.group.members.len(),
            total_spend: self.group.expenses.iter().map(|e| e.amount).sum(),
            your_balance: self.current_balances().get(member),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Frequency, PaymentMode, ShareInput, SplitType};

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: format!("{id}@example.com"),
        }
    }

    fn ledger() -> GroupLedger {
        let mut ledger = GroupLedger::create("Trip", "Weekend away", member("alice")).unwrap();
        ledger.add_member("alice", member("bob")).unwrap();
        ledger.add_member("alice", member("carol")).unwrap();
        ledger
    }

    fn draft(amount: i64, split_type: SplitType, splits: Vec<ShareInput>) -> ExpenseDraft {
        ExpenseDraft {
            title: "Dinner".to_string(),
            amount: Money::units(amount),
            split_type,
            participants: vec!["alice".into(), "bob".into(), "carol".into()],
            splits,
            payer: None,
            date: None,
            category: Some("Food".to_string()),
            payment_mode: Some(PaymentMode::Upi),
            recurring: None,
            frequency: None,
            notes: None,
        }
    }

    #[test]
    fn create_requires_a_name() {
        assert!(matches!(
            GroupLedger::create("  ", "", member("alice")),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn joining_twice_is_rejected() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.add_member("alice", member("bob")),
            Err(LedgerError::ExistingKey(_))
        ));
        assert_eq!(ledger.group().members.len(), 3);
    }

    #[test]
    fn add_expense_logs_activity() {
        let mut ledger = ledger();
        let id = ledger
            .add_expense("alice", draft(300, SplitType::Equal, vec![]))
            .unwrap()
            .id
            .clone();
        let latest = ledger.list_activity()[0];
        assert_eq!(latest.action, ActivityKind::ExpenseAdded);
        assert_eq!(latest.related_id.as_deref(), Some(id.as_str()));
        assert_eq!(latest.metadata.amount, Some(Money::units(300)));
        assert_eq!(ledger.group().expenses[0].payer, "alice");
    }

    #[test]
    fn rejected_expense_leaves_group_untouched() {
        let mut ledger = ledger();
        let before = ledger.clone();
        let bad = draft(
            100,
            SplitType::Exact,
            vec![ShareInput {
                member: "alice".to_string(),
                amount: Some(Money::units(100)),
                percentage: None,
            }],
        );
        assert!(ledger.add_expense("alice", bad).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn outsiders_cannot_take_part() {
        let mut ledger = ledger();
        let mut outsider = draft(30, SplitType::Equal, vec![]);
        outsider.participants.push("mallory".to_string());
        assert_eq!(
            ledger.add_expense("alice", outsider).unwrap_err(),
            LedgerError::NotFound("member mallory".to_string())
        );
    }

    #[test]
    fn edit_marks_expense_and_keeps_identity() {
        let mut ledger = ledger();
        let id = ledger
            .add_expense("bob", draft(300, SplitType::Equal, vec![]))
            .unwrap()
            .id
            .clone();
        let edited = ledger
            .edit_expense("bob", &id, draft(90, SplitType::Equal, vec![]))
            .unwrap();
        assert!(edited.edited);
        assert_eq!(edited.id, id);
        assert_eq!(edited.payer, "bob");
        assert_eq!(ledger.group().expenses.len(), 1);
        assert_eq!(ledger.list_activity()[0].action, ActivityKind::ExpenseEdited);
        assert_eq!(ledger.current_balances().get("bob"), Money::units(60));
    }

    #[test]
    fn edit_keeps_fields_the_client_leaves_out() {
        let mut ledger = ledger();
        let mut original = draft(300, SplitType::Equal, vec![]);
        original.recurring = Some(true);
        original.frequency = Some(Frequency::Weekly);
        original.notes = Some("every friday".to_string());
        let id = ledger.add_expense("alice", original).unwrap().id.clone();

        let body = serde_json::json!({
            "title": "Dinner and drinks",
            "amount": 120,
            "splitType": "EXACT",
            "participants": ["alice", "bob"],
            "splits": [
                { "user": "alice", "amount": 20 },
                { "user": "bob", "amount": 100 }
            ],
            "date": "2026-05-01T19:30:00Z"
        });
        let edit: ExpenseDraft = serde_json::from_value(body).unwrap();
        let edited = ledger.edit_expense("alice", &id, edit).unwrap();

        assert_eq!(edited.title, "Dinner and drinks");
        assert_eq!(edited.amount, Money::units(120));
        assert_eq!(edited.category.as_deref(), Some("Food"));
        assert_eq!(edited.payment_mode, PaymentMode::Upi);
        assert!(edited.recurring);
        assert_eq!(edited.frequency, Some(Frequency::Weekly));
        assert_eq!(edited.notes.as_deref(), Some("every friday"));
        assert_eq!(edited.payer, "alice");
        assert_eq!(ledger.current_balances().get("bob"), Money::units(-100));
    }

    #[test]
    fn only_the_payer_edits_an_expense() {
        let mut ledger = ledger();
        let id = ledger
            .add_expense("bob", draft(300, SplitType::Equal, vec![]))
            .unwrap()
            .id
            .clone();
        let before = ledger.clone();
        assert!(matches!(
            ledger.edit_expense("carol", &id, draft(90, SplitType::Equal, vec![])),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let mut ledger = ledger();
        let mut huge = draft(0, SplitType::Equal, vec![]);
        huge.amount = Money::MAX_AMOUNT + Money::CENT;
        assert!(matches!(
            ledger.add_expense("alice", huge),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.add_settlement(
                "bob",
                "alice",
                Money::MAX_AMOUNT + Money::CENT,
                SettlementStatus::Settled
            ),
            Err(LedgerError::Validation(_))
        ));

        let mut largest = draft(0, SplitType::Equal, vec![]);
        largest.amount = Money::MAX_AMOUNT;
        largest.participants = vec!["alice".into(), "bob".into()];
        for _ in 0..3 {
            ledger.add_expense("alice", largest.clone()).unwrap();
        }
        let overview = ledger.overview("alice");
        assert_eq!(overview.total_spend, Money::units(3_000_000_000));
        assert_eq!(overview.your_balance, Money::units(1_500_000_000));
    }

    #[test]
    fn edit_of_missing_expense_is_not_found() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.edit_expense("alice", "nope", draft(10, SplitType::Equal, vec![])),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn settlement_rules() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.add_settlement("bob", "bob", Money::units(1), SettlementStatus::Settled),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.add_settlement("bob", "alice", Money::ZERO, SettlementStatus::Settled),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.add_settlement("bob", "zed", Money::units(1), SettlementStatus::Settled),
            Err(LedgerError::NotFound(_))
        ));
        let settlement = ledger
            .add_settlement("bob", "alice", Money::units(5), SettlementStatus::Settled)
            .unwrap();
        assert_eq!(settlement.status, SettlementStatus::Settled);
        let latest = ledger.list_activity()[0];
        assert_eq!(latest.action, ActivityKind::SettlementRecorded);
        assert_eq!(latest.metadata.to_name.as_deref(), Some("ALICE"));
    }

    #[test]
    fn pending_settlement_counts_once_confirmed() {
        let mut ledger = ledger();
        ledger
            .add_expense("alice", draft(300, SplitType::Equal, vec![]))
            .unwrap();
        let id = ledger
            .add_settlement("bob", "alice", Money::units(100), SettlementStatus::Pending)
            .unwrap()
            .id
            .clone();
        assert_eq!(ledger.current_balances().get("bob"), Money::units(-100));

        assert!(matches!(
            ledger.confirm_settlement("bob", &id),
            Err(LedgerError::Unauthorized(_))
        ));
        ledger.confirm_settlement("alice", &id).unwrap();
        assert_eq!(ledger.current_balances().get("bob"), Money::ZERO);
        assert!(matches!(
            ledger.confirm_settlement("alice", &id),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn details_use_client_field_names() {
        let mut ledger = ledger();
        ledger
            .add_expense("alice", draft(300, SplitType::Equal, vec![]))
            .unwrap();
        ledger
            .add_settlement("bob", "alice", Money::units(50), SettlementStatus::Settled)
            .unwrap();
        let json = serde_json::to_value(ledger.details()).unwrap();

        assert!(json["group"]["_id"].is_string());
        assert_eq!(json["group"]["members"][1]["_id"], "bob");
        let expense = &json["expenses"][0];
        assert!(expense["_id"].is_string());
        assert_eq!(expense["paidBy"], "alice");
        assert_eq!(expense["splits"][0]["user"], "alice");
        assert_eq!(expense["splits"][0]["amount"], 100.0);
        let settlement = &json["settlements"][0];
        assert_eq!(settlement["fromUser"], "bob");
        assert_eq!(settlement["toUser"], "alice");
        assert_eq!(json["simplifiedDebts"][0]["from"], "carol");
        assert_eq!(json["simplifiedDebts"][0]["to"], "alice");
        assert_eq!(json["balances"]["alice"], 150.0);
        assert!(json["activities"][0]["_id"].is_string());
        assert_eq!(json["activities"][0]["actorId"], "bob");
        assert_eq!(json["activities"][0]["relatedId"], json["settlements"][0]["_id"]);
    }

    #[test]
    fn details_match_the_ledger_views() {
        let mut ledger = ledger();
        ledger
            .add_expense("alice", draft(300, SplitType::Equal, vec![]))
            .unwrap();
        let details = ledger.details();
        assert_eq!(details.balances, ledger.current_balances());
        assert_eq!(details.simplified_debts.len(), 2);
        assert_eq!(details.activities[0].action, ActivityKind::ExpenseAdded);
        assert_eq!(details.group.members.len(), 3);

        let overview = ledger.overview("alice");
        assert_eq!(overview.total_spend, Money::units(300));
        assert_eq!(overview.your_balance, Money::units(200));
    }
}
