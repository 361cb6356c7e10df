//! Personal expense tracking: validation, categories, spending insights and
//! the keyword based category suggestion behind `POST /predict`.
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analytics::MonthlyAmount;
use crate::error::{LedgerError, Result};
use crate::money::Money;
use crate::schemas::{Category, MemberId, PersonalExpense, PersonalExpenseDraft};
use crate::split::check_amount;

pub const FALLBACK_CATEGORY: &str = "Others";

pub const DEFAULT_CATEGORIES: [&str; 8] = [
    "Food",
    "Transport",
    "Shopping",
    "Bills",
    "Entertainment",
    "Health",
    "Travel",
    FALLBACK_CATEGORY,
];

const KEYWORDS: [(&str, &[&str]); 7] = [
    (
        "Food",
        &[
            "food", "lunch", "dinner", "breakfast", "pizza", "burger", "restaurant", "cafe",
            "coffee", "snack", "grocer", "swiggy", "zomato",
        ],
    ),
    (
        "Transport",
        &[
            "uber", "ola", "taxi", "cab", "fuel", "petrol", "diesel", "bus", "metro", "train",
            "parking",
        ],
    ),
    (
        "Shopping",
        &["amazon", "flipkart", "clothes", "shirt", "shoes", "mall", "shopping", "gift"],
    ),
    (
        "Bills",
        &["electricity", "water", "rent", "internet", "wifi", "phone", "recharge", "bill", "gas"],
    ),
    (
        "Entertainment",
        &["movie", "netflix", "spotify", "concert", "game", "cinema", "party"],
    ),
    (
        "Health",
        &["doctor", "pharmacy", "medicine", "hospital", "clinic", "gym", "dentist"],
    ),
    (
        "Travel",
        &["flight", "hotel", "trip", "airbnb", "holiday", "vacation", "booking"],
    ),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub category: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub total_expenses: Money,
    pub avg_monthly: Money,
    pub monthly_totals: Vec<MonthlyAmount>,
    pub category_totals: BTreeMap<String, Money>,
    pub payment_totals: BTreeMap<String, Money>,
    pub top_category: Option<String>,
}

/// Default categories followed by the owner's own, without duplicates.
pub fn available_categories(custom: &[Category]) -> Vec<String> {
    let mut names: Vec<String> = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
    for category in custom {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&category.name)) {
            names.push(category.name.clone());
        }
    }
    names
}

pub fn new_category(owner: &MemberId, name: &str, existing: &[Category]) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("category name is required".to_string()));
    }
    if available_categories(existing)
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
    {
        return Err(LedgerError::ExistingKey(name.to_string()));
    }
    Ok(Category {
        id: crate::schemas::new_id(),
        owner: owner.clone(),
        name: name.to_string(),
    })
}

/// Validates a draft into an expense with the given id.
pub fn build_personal_expense(
    id: String,
    owner: &MemberId,
    draft: PersonalExpenseDraft,
) -> Result<PersonalExpense> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(LedgerError::Validation("title is required".to_string()));
    }
    check_amount(draft.amount)?;
    let category = draft
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    Ok(PersonalExpense {
        id,
        owner: owner.clone(),
        title: title.to_string(),
        amount: draft.amount,
        date: draft.date.unwrap_or_else(|| Utc::now().date_naive()),
        category,
        payment_mode: draft.payment_mode,
        recurring: draft.recurring,
        frequency: draft.recurring.then(|| draft.frequency.unwrap_or_default()),
        notes: draft.notes,
    })
}

pub fn insights(expenses: &[PersonalExpense]) -> Insights {
    let mut months: BTreeMap<String, Money> = BTreeMap::new();
    let mut category_totals: BTreeMap<String, Money> = BTreeMap::new();
    let mut payment_totals: BTreeMap<String, Money> = BTreeMap::new();

    for expense in expenses {
        *months
            .entry(expense.date.format("%Y-%m").to_string())
            .or_default() += expense.amount;
        *category_totals.entry(expense.category.clone()).or_default() += expense.amount;
        *payment_totals
            .entry(expense.payment_mode.label().to_string())
            .or_default() += expense.amount;
    }

    let total_expenses: Money = expenses.iter().map(|e| e.amount).sum();
    let avg_monthly = if months.is_empty() {
        Money::ZERO
    } else {
        Money::new(total_expenses.cents() / months.len() as i64)
    };
    // Ties go to the alphabetically first category.
    let top_category = category_totals
        .iter()
        .rev()
        .max_by_key(|(_, amount)| **amount)
        .map(|(name, _)| name.clone());

    Insights {
        total_expenses,
        avg_monthly,
        monthly_totals: months
            .into_iter()
            .map(|(month, amount)| MonthlyAmount { month, amount })
            .collect(),
        category_totals,
        payment_totals,
        top_category,
    }
}

/// Suggests a category for an expense title.
///
/// The owner's own categories win when their name appears in the title.
pub fn predict_category(title: &str, custom: &[Category]) -> Prediction {
    let title = title.to_lowercase();
    if let Some(category) = custom
        .iter()
        .find(|c| title.contains(&c.name.to_lowercase()))
    {
        return Prediction {
            category: category.name.clone(),
            confidence: 0.9,
        };
    }

    let best = KEYWORDS
        .iter()
        .map(|(category, words)| {
            let hits = words.iter().filter(|w| title.contains(*w)).count();
            (category, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .rev()
        .max_by_key(|(_, hits)| *hits);

    match best {
        Some((category, hits)) => Prediction {
            category: category.to_string(),
            confidence: (0.5 + 0.15 * hits as f64).min(0.95),
        },
        None => Prediction {
            category: FALLBACK_CATEGORY.to_string(),
            confidence: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::PaymentMode;
    use chrono::NaiveDate;

    fn expense(category: &str, mode: PaymentMode, units: i64, month: u32) -> PersonalExpense {
        PersonalExpense {
            id: "x".to_string(),
            owner: "alice".to_string(),
            title: "t".to_string(),
            amount: Money::units(units),
            date: NaiveDate::from_ymd_opt(2026, month, 10).unwrap(),
            category: category.to_string(),
            payment_mode: mode,
            recurring: false,
            frequency: None,
            notes: None,
        }
    }

    fn custom(name: &str) -> Category {
        Category {
            id: "c".to_string(),
            owner: "alice".to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn insights_group_by_month_category_and_mode() {
        let report = insights(&[
            expense("Food", PaymentMode::Upi, 20, 1),
            expense("Bills", PaymentMode::Cash, 50, 1),
            expense("Food", PaymentMode::Upi, 40, 3),
        ]);
        assert_eq!(report.total_expenses, Money::units(110));
        assert_eq!(report.avg_monthly, Money::units(55));
        assert_eq!(report.monthly_totals.len(), 2);
        assert_eq!(report.monthly_totals[0].month, "2026-01");
        assert_eq!(report.category_totals["Food"], Money::units(60));
        assert_eq!(report.payment_totals["UPI"], Money::units(60));
        assert_eq!(report.top_category.as_deref(), Some("Food"));
    }

    #[test]
    fn insights_of_nothing() {
        let report = insights(&[]);
        assert_eq!(report.total_expenses, Money::ZERO);
        assert_eq!(report.avg_monthly, Money::ZERO);
        assert_eq!(report.top_category, None);
    }

    #[test]
    fn predicts_from_keywords() {
        let prediction = predict_category("Uber to the metro station", &[]);
        assert_eq!(prediction.category, "Transport");
        assert!(prediction.confidence > 0.5);
        assert_eq!(predict_category("zzz", &[]).category, FALLBACK_CATEGORY);
    }

    #[test]
    fn custom_categories_take_precedence() {
        let prediction = predict_category("Pottery class dinner", &[custom("Pottery")]);
        assert_eq!(prediction.category, "Pottery");
    }

    #[test]
    fn category_names_are_unique_ignoring_case() {
        let owner = "alice".to_string();
        assert!(matches!(
            new_category(&owner, "food", &[]),
            Err(LedgerError::ExistingKey(_))
        ));
        assert!(matches!(
            new_category(&owner, "pets", &[custom("Pets")]),
            Err(LedgerError::ExistingKey(_))
        ));
        assert_eq!(new_category(&owner, " Pets ", &[]).unwrap().name, "Pets");
        assert_eq!(available_categories(&[custom("Pets")]).len(), 9);
    }

    #[test]
    fn personal_expense_defaults() {
        let draft = PersonalExpenseDraft {
            title: " Rent ".to_string(),
            amount: Money::units(900),
            date: None,
            category: Some("  ".to_string()),
            payment_mode: PaymentMode::NetBanking,
            recurring: true,
            frequency: None,
            notes: None,
        };
        let expense =
            build_personal_expense("id".to_string(), &"alice".to_string(), draft).unwrap();
        assert_eq!(expense.title, "Rent");
        assert_eq!(expense.category, FALLBACK_CATEGORY);
        assert_eq!(expense.frequency, Some(crate::schemas::Frequency::Monthly));
    }
}
