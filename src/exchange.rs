use serde::Serialize;
use std::collections::HashMap;
use std::mem::swap;

use crate::balance::{compute_balance_from_group, Balances};
use crate::money::Money;
use crate::schemas::{Expense, Group, MemberId, Settlement, SettlementStatus};

#[derive(Clone, Debug)]
pub struct PersonalBalance {
    pub id: MemberId,
    pub balance: Money,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct UserPair {
    pub user1: MemberId,
    pub user2: MemberId,
}

/// A payment that moves `amount` from `from` to `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
}

// The exchanges that will be made if no simplification happens:
// every pair of members nets only what they owe each other directly.
pub fn pairwise_debts(
    order: &Balances,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Vec<Exchange> {
    let mut balances_between_people: HashMap<UserPair, Money> = HashMap::new();
    let mut record = |creditor: &MemberId, debtor: &MemberId, amount: Money| {
        if creditor == debtor {
            return;
        }
        let mut pair = UserPair {
            user1: creditor.clone(),
            user2: debtor.clone(),
        };
        let mut amount = amount;

        // We use alphabetical order to ensure all the debts regarding
        // the same users end up stored in the same direction
        if pair.user1 > pair.user2 {
            swap(&mut pair.user1, &mut pair.user2);
            amount = -amount;
        }

        *balances_between_people.entry(pair).or_insert(Money::ZERO) += amount;
    };

    for expense in expenses {
        for split in &expense.splits {
            record(&expense.payer, &split.member, split.owed_amount);
        }
    }
    // A settled payment is a debt running the other way.
    for settlement in settlements {
        if settlement.status == SettlementStatus::Settled {
            record(&settlement.from_member, &settlement.to_member, settlement.amount);
        }
    }

    // Calculate exchanges, user2 owes user1 when the balance is positive
    let mut exchanges = Vec::new();

    for (people_pair, balance) in balances_between_people {
        if balance.is_zero() {
            continue;
        }
        let mut from = people_pair.user2;
        let mut to = people_pair.user1;
        // If the balance is smaller than zero we change the direction
        if balance.is_negative() {
            swap(&mut from, &mut to);
        }

        exchanges.push(Exchange {
            from,
            to,
            amount: balance.abs(),
        });
    }

    let position = |member: &MemberId| {
        order
            .iter()
            .position(|(id, _)| id == member)
            .unwrap_or(usize::MAX)
    };
    exchanges.sort_by(|a, b| {
        (position(&a.from), position(&a.to), &a.from, &a.to)
            .cmp(&(position(&b.from), position(&b.to), &b.from, &b.to))
    });
    exchanges
}

// Index of the biggest balance, the earliest one on ties
fn largest(parties: &[PersonalBalance]) -> Option<usize> {
    parties
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, party)| party.balance)
        .map(|(i, _)| i)
}

/// Greedy minimum cash flow: the biggest debtor repeatedly pays the biggest
/// creditor until nobody is left on one side.
///
/// Produces at most `members - 1` transfers and, replayed with [`replay`],
/// brings every balance back to zero.
pub fn simplify_debts(balances: &Balances) -> Vec<Exchange> {
    // Divide people into payers and receivers
    let mut payers = Vec::new();
    let mut receivers = Vec::new();

    for (id, balance) in balances.iter() {
        let person = PersonalBalance {
            id: id.clone(),
            balance: balance.abs(),
        };
        if balance.is_negative() {
            payers.push(person);
        } else if balance.is_positive() {
            receivers.push(person);
        }
    }

    let mut exchanges: Vec<Exchange> = Vec::new();

    while let (Some(p), Some(r)) = (largest(&payers), largest(&receivers)) {
        let amount = payers[p].balance.min(receivers[r].balance);
        exchanges.push(Exchange {
            from: payers[p].id.clone(),
            to: receivers[r].id.clone(),
            amount,
        });

        payers[p].balance -= amount;
        receivers[r].balance -= amount;
        if payers[p].balance.is_zero() {
            payers.remove(p);
        }
        if receivers[r].balance.is_zero() {
            receivers.remove(r);
        }
    }
    exchanges
}

/// Applies the transfers to `balances` as if they had been settled.
pub fn replay(balances: &Balances, exchanges: &[Exchange]) -> Balances {
    let mut result = balances.clone();
    for exchange in exchanges {
        result.credit(&exchange.from, exchange.amount);
        result.debit(&exchange.to, exchange.amount);
    }
    result
}

/// The greedy plan, or the pairwise debts when those are strictly shorter.
pub fn get_exchanges_from_group(group: &Group) -> Vec<Exchange> {
    let people_balances = compute_balance_from_group(group);

    let naive_exchanges = pairwise_debts(&people_balances, &group.expenses, &group.settlements);
    let simplified_exchanges = simplify_debts(&people_balances);

    // We ensure the simplification didn't accidentally end up being
    // more complicated than the naive exchanges
    if naive_exchanges.len() < simplified_exchanges.len() {
        naive_exchanges
    } else {
        simplified_exchanges
    }
}
