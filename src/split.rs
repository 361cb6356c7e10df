//! Turns an expense amount and a split policy into per-participant shares.
//!
//! All three policies return shares that add up to the expense amount to the
//! cent, so balances folded from them never drift.
use std::collections::HashSet;

use crate::error::{LedgerError, Result};
use crate::money::Money;
use crate::schemas::{MemberId, ShareInput, Split, SplitType};

/// Percentages may miss 100 by this many points before being rejected.
pub const PERCENTAGE_TOLERANCE: f64 = 0.5;
/// Exact shares may miss the expense amount by this much.
pub const EXACT_TOLERANCE: Money = Money::CENT;

/// Computes each participant's owed share, in participant order.
///
/// `breakdown` is ignored for [`SplitType::Equal`]. For the other policies it
/// must hold one entry per participant and nothing else.
pub fn compute_splits(
    amount: Money,
    split_type: SplitType,
    participants: &[MemberId],
    breakdown: &[ShareInput],
) -> Result<Vec<Split>> {
    check_amount(amount)?;
    if participants.is_empty() {
        return Err(LedgerError::Validation(
            "an expense needs at least one participant".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = participants.iter().find(|p| !seen.insert(p.as_str())) {
        return Err(LedgerError::Validation(format!(
            "participant {dup} listed twice"
        )));
    }

    match split_type {
        SplitType::Equal => Ok(equal(amount, participants)),
        SplitType::Percentage => {
            let entries = align(participants, breakdown)?;
            percentage(amount, participants, &entries)
        }
        SplitType::Exact => {
            let entries = align(participants, breakdown)?;
            exact(amount, participants, &entries)
        }
    }
}

/// Rejects amounts that are not positive or exceed [`Money::MAX_AMOUNT`].
pub fn check_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount > Money::MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "amount {amount} exceeds the limit of {}",
            Money::MAX_AMOUNT
        )));
    }
    Ok(())
}

fn equal(amount: Money, participants: &[MemberId]) -> Vec<Split> {
    let count = participants.len() as i64;
    let base = amount.cents() / count;
    let remainder = amount.cents() - base * count;

    participants
        .iter()
        .enumerate()
        .map(|(i, member)| Split {
            member: member.clone(),
            owed_amount: Money::new(base + i64::from((i as i64) < remainder)),
            percentage: None,
        })
        .collect()
}

fn percentage(
    amount: Money,
    participants: &[MemberId],
    entries: &[&ShareInput],
) -> Result<Vec<Split>> {
    let mut percentages = Vec::with_capacity(entries.len());
    for (member, entry) in participants.iter().zip(entries) {
        let pct = entry.percentage.ok_or_else(|| {
            LedgerError::Validation(format!("missing percentage for {member}"))
        })?;
        if !pct.is_finite() || pct < 0.0 {
            return Err(LedgerError::Validation(format!(
                "invalid percentage {pct} for {member}"
            )));
        }
        percentages.push(pct);
    }

    let total: f64 = percentages.iter().sum();
    if (total - 100.0).abs() > PERCENTAGE_TOLERANCE {
        return Err(LedgerError::Validation(format!(
            "percentages add up to {total}, expected 100"
        )));
    }

    // Largest remainder over the normalised percentages.
    let exact: Vec<f64> = percentages
        .iter()
        .map(|pct| amount.cents() as f64 * pct / total)
        .collect();
    let mut cents: Vec<i64> = exact.iter().map(|v| v.floor() as i64).collect();
    let remainder = amount.cents() - cents.iter().sum::<i64>();

    let mut order: Vec<usize> = (0..cents.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa)
    });
    for step in 0..remainder.max(0) as usize {
        cents[order[step % order.len()]] += 1;
    }

    Ok(participants
        .iter()
        .zip(cents)
        .zip(percentages)
        .map(|((member, owed), pct)| Split {
            member: member.clone(),
            owed_amount: Money::new(owed),
            percentage: Some(pct),
        })
        .collect())
}

fn exact(
    amount: Money,
    participants: &[MemberId],
    entries: &[&ShareInput],
) -> Result<Vec<Split>> {
    let mut shares = Vec::with_capacity(entries.len());
    for (member, entry) in participants.iter().zip(entries) {
        let owed = entry
            .amount
            .ok_or_else(|| LedgerError::Validation(format!("missing amount for {member}")))?;
        if owed.is_negative() || owed > Money::MAX_AMOUNT {
            return Err(LedgerError::Validation(format!(
                "invalid amount {owed} for {member}"
            )));
        }
        shares.push(owed);
    }

    let actual: Money = shares.iter().sum();
    let residual = amount - actual;
    if residual.abs() > EXACT_TOLERANCE {
        return Err(LedgerError::Reconciliation {
            expected: amount,
            actual,
        });
    }
    if !residual.is_zero() {
        // The largest share absorbs the rounding cent; first one wins ties.
        let largest = shares
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, share)| **share)
            .map(|(i, _)| i)
            .unwrap_or(0);
        shares[largest] += residual;
    }

    Ok(participants
        .iter()
        .zip(shares)
        .map(|(member, owed)| Split {
            member: member.clone(),
            owed_amount: owed,
            percentage: None,
        })
        .collect())
}

/// Orders `breakdown` like `participants`, rejecting strays and duplicates.
fn align<'a>(
    participants: &[MemberId],
    breakdown: &'a [ShareInput],
) -> Result<Vec<&'a ShareInput>> {
    let mut seen = HashSet::new();
    for entry in breakdown {
        if !participants.contains(&entry.member) {
            return Err(LedgerError::Validation(format!(
                "{} has a share but is not a participant",
                entry.member
            )));
        }
        if !seen.insert(entry.member.as_str()) {
            return Err(LedgerError::Validation(format!(
                "{} has more than one share",
                entry.member
            )));
        }
    }

    participants
        .iter()
        .map(|member| {
            breakdown
                .iter()
                .find(|entry| &entry.member == member)
                .ok_or_else(|| LedgerError::Validation(format!("missing share for {member}")))
        })
        .collect()
}
