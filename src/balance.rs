use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::money::Money;
use crate::schemas::{Expense, Group, MemberId, Settlement, SettlementStatus};

/// Net position of every member: positive is owed to them, negative they owe.
///
/// Keeps insertion order (group member order first) so anything derived from
/// it, such as the simplified debts, is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Balances(Vec<(MemberId, Money)>);

impl Balances {
    /// Every given member starts at zero.
    pub fn new<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MemberId>,
    {
        let mut balances = Balances::default();
        for member in members {
            balances.entry(member.into());
        }
        balances
    }

    fn entry(&mut self, member: MemberId) -> &mut Money {
        let position = match self.0.iter().position(|(id, _)| *id == member) {
            Some(position) => position,
            None => {
                self.0.push((member, Money::ZERO));
                self.0.len() - 1
            }
        };
        &mut self.0[position].1
    }

    pub fn credit(&mut self, member: &str, amount: Money) {
        *self.entry(member.to_string()) += amount;
    }

    pub fn debit(&mut self, member: &str, amount: Money) {
        *self.entry(member.to_string()) -= amount;
    }

    /// Zero for members never seen.
    pub fn get(&self, member: &str) -> Money {
        self.0
            .iter()
            .find(|(id, _)| id == member)
            .map(|(_, amount)| *amount)
            .unwrap_or(Money::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, Money)> {
        self.0.iter().map(|(id, amount)| (id, *amount))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum over all members; zero for any consistent group.
    pub fn total(&self) -> Money {
        self.0.iter().map(|(_, amount)| *amount).sum()
    }

    pub fn is_settled(&self) -> bool {
        self.0.iter().all(|(_, amount)| amount.is_zero())
    }
}

impl FromIterator<(MemberId, Money)> for Balances {
    fn from_iter<T: IntoIterator<Item = (MemberId, Money)>>(iter: T) -> Self {
        let mut balances = Balances::default();
        for (member, amount) in iter {
            *balances.entry(member) += amount;
        }
        balances
    }
}

impl Serialize for Balances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (member, amount) in &self.0 {
            map.serialize_entry(member, amount)?;
        }
        map.end()
    }
}

/// Folds expenses and settled payments into per-member balances.
///
/// The payer of an expense is credited the full amount and every participant
/// is debited their share. A settled payment credits the sender and debits
/// the receiver; pending ones are ignored.
pub fn compute_balances<'a, I>(
    members: I,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Balances
where
    I: IntoIterator<Item = &'a MemberId>,
{
    let mut balance = Balances::new(members.into_iter().cloned());
    for expense in expenses {
        apply_expense(&mut balance, expense);
    }
    for settlement in settlements {
        apply_settlement(&mut balance, settlement);
    }
    balance
}

pub fn compute_balance_from_group(group: &Group) -> Balances {
    compute_balances(
        group.members.iter().map(|m| &m.id),
        &group.expenses,
        &group.settlements,
    )
}

pub fn apply_expense(balance: &mut Balances, expense: &Expense) {
    balance.credit(&expense.payer, expense.amount);
    for split in &expense.splits {
        balance.debit(&split.member, split.owed_amount);
    }
}

pub fn apply_settlement(balance: &mut Balances, settlement: &Settlement) {
    if settlement.status != SettlementStatus::Settled {
        return;
    }
    balance.credit(&settlement.from_member, settlement.amount);
    balance.debit(&settlement.to_member, settlement.amount);
}
