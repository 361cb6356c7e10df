//! Spending figures for one member across the groups they belong to.
use serde::Serialize;
use std::collections::BTreeMap;

use crate::balance::compute_balance_from_group;
use crate::money::Money;
use crate::schemas::{Group, SettlementStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAmount {
    /// `YYYY-MM`
    pub month: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub id: String,
    pub name: String,
    pub group_total_spend: Money,
    /// What the member was supposed to pay: the sum of their shares.
    pub your_liability: Money,
    /// Face value of the expenses the member paid for.
    pub your_paid: Money,
    pub settled_by_you: Money,
    pub settled_to_you: Money,
    pub net_spend: Money,
    /// Settled volume over group spend, in percent, capped at 100.
    pub progress: f64,
    pub my_balance: Money,
    pub monthly_history: Vec<MonthlyAmount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_workspace_spend: Money,
    pub total_net_personal_spend: Money,
    pub total_you_owe: Money,
    pub total_you_are_owed: Money,
    pub active_groups: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceAnalytics {
    pub kpis: Kpis,
    pub group_stats: Vec<GroupStats>,
    pub combined_history: Vec<MonthlyAmount>,
}

fn history(months: BTreeMap<String, Money>) -> Vec<MonthlyAmount> {
    months
        .into_iter()
        .map(|(month, amount)| MonthlyAmount { month, amount })
        .collect()
}

pub fn group_stats(group: &Group, member: &str) -> GroupStats {
    let mut total_spend = Money::ZERO;
    let mut liability = Money::ZERO;
    let mut paid = Money::ZERO;
    let mut months: BTreeMap<String, Money> = BTreeMap::new();

    for expense in &group.expenses {
        total_spend += expense.amount;
        if expense.payer == member {
            paid += expense.amount;
        }
        if let Some(split) = expense.splits.iter().find(|s| s.member == member) {
            liability += split.owed_amount;
            *months
                .entry(expense.date.format("%Y-%m").to_string())
                .or_default() += split.owed_amount;
        }
    }

    let settled = || {
        group
            .settlements
            .iter()
            .filter(|s| s.status == SettlementStatus::Settled)
    };
    let settled_by_you: Money = settled()
        .filter(|s| s.from_member == member)
        .map(|s| s.amount)
        .sum();
    let settled_to_you: Money = settled()
        .filter(|s| s.to_member == member)
        .map(|s| s.amount)
        .sum();
    let settled_volume: Money = settled().map(|s| s.amount).sum();

    let progress = if total_spend.is_positive() {
        let ratio = settled_volume.cents() as f64 / total_spend.cents() as f64 * 100.0;
        (ratio.min(100.0) * 100.0).round() / 100.0
    } else {
        100.0
    };

    GroupStats {
        id: group.id.clone(),
        name: group.name.clone(),
        group_total_spend: total_spend,
        your_liability: liability,
        your_paid: paid,
        settled_by_you,
        settled_to_you,
        net_spend: paid - settled_to_you + settled_by_you,
        progress,
        my_balance: compute_balance_from_group(group).get(member),
        monthly_history: history(months),
    }
}

pub fn workspace_analytics(groups: &[Group], member: &str) -> WorkspaceAnalytics {
    let group_stats: Vec<GroupStats> = groups.iter().map(|g| group_stats(g, member)).collect();

    let mut kpis = Kpis {
        total_workspace_spend: Money::ZERO,
        total_net_personal_spend: Money::ZERO,
        total_you_owe: Money::ZERO,
        total_you_are_owed: Money::ZERO,
        active_groups: group_stats.len(),
    };
    let mut combined: BTreeMap<String, Money> = BTreeMap::new();
    for stats in &group_stats {
        kpis.total_workspace_spend += stats.group_total_spend;
        kpis.total_net_personal_spend += stats.net_spend;
        if stats.my_balance.is_positive() {
            kpis.total_you_are_owed += stats.my_balance;
        } else {
            kpis.total_you_owe += stats.my_balance.abs();
        }
        for entry in &stats.monthly_history {
            *combined.entry(entry.month.clone()).or_default() += entry.amount;
        }
    }

    WorkspaceAnalytics {
        kpis,
        group_stats,
        combined_history: history(combined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::GroupLedger;
    use crate::schemas::{ExpenseDraft, Member, SplitType};
    use chrono::{TimeZone, Utc};

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    fn spend(ledger: &mut GroupLedger, payer: &str, units: i64, month: u32) {
        let draft = ExpenseDraft {
            title: "Groceries".to_string(),
            amount: Money::units(units),
            split_type: SplitType::Equal,
            participants: vec!["alice".into(), "bob".into()],
            splits: vec![],
            payer: Some(payer.to_string()),
            date: Some(Utc.with_ymd_and_hms(2026, month, 3, 12, 0, 0).unwrap()),
            category: None,
            payment_mode: None,
            recurring: None,
            frequency: None,
            notes: None,
        };
        ledger.add_expense(payer, draft).unwrap();
    }

    fn group() -> Group {
        let mut ledger = GroupLedger::create("Flat", "", member("alice")).unwrap();
        ledger.add_member("alice", member("bob")).unwrap();
        spend(&mut ledger, "alice", 100, 1);
        spend(&mut ledger, "bob", 40, 2);
        ledger
            .add_settlement(
                "bob",
                "alice",
                Money::units(30),
                SettlementStatus::Settled,
            )
            .unwrap();
        ledger.into_group()
    }

    #[test]
    fn group_figures_for_one_member() {
        let stats = group_stats(&group(), "alice");
        assert_eq!(stats.group_total_spend, Money::units(140));
        assert_eq!(stats.your_liability, Money::units(70));
        assert_eq!(stats.your_paid, Money::units(100));
        assert_eq!(stats.settled_to_you, Money::units(30));
        assert_eq!(stats.net_spend, Money::units(70));
        assert_eq!(stats.my_balance, Money::ZERO);
        assert_eq!(stats.progress, 21.43);
        assert_eq!(
            stats.monthly_history,
            vec![
                MonthlyAmount {
                    month: "2026-01".to_string(),
                    amount: Money::units(50)
                },
                MonthlyAmount {
                    month: "2026-02".to_string(),
                    amount: Money::units(20)
                },
            ]
        );
    }

    #[test]
    fn empty_group_counts_as_done() {
        let ledger = GroupLedger::create("Empty", "", member("alice")).unwrap();
        let stats = group_stats(ledger.group(), "alice");
        assert_eq!(stats.progress, 100.0);
        assert!(stats.monthly_history.is_empty());
    }

    #[test]
    fn workspace_totals_merge_groups() {
        let groups = vec![group(), group()];
        let analytics = workspace_analytics(&groups, "bob");
        assert_eq!(analytics.kpis.active_groups, 2);
        assert_eq!(analytics.kpis.total_workspace_spend, Money::units(280));
        assert_eq!(analytics.kpis.total_you_owe, Money::ZERO);
        assert_eq!(analytics.combined_history[0].amount, Money::units(100));
        assert_eq!(analytics.combined_history[1].month, "2026-02");
    }
}
