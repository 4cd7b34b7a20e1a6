use serde::Serialize;

use crate::allocation::Allocation;
use crate::catalog::{Category, BUDGET};
use crate::error::{Result, SurveyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BudgetStatus {
    Over { excess: u32 },
    Under { shortfall: u32 },
    Exact,
}

impl BudgetStatus {
    pub fn classify(total: u32) -> Self {
        if total > BUDGET {
            BudgetStatus::Over {
                excess: total - BUDGET,
            }
        } else if total < BUDGET {
            BudgetStatus::Under {
                shortfall: BUDGET - total,
            }
        } else {
            BudgetStatus::Exact
        }
    }

    pub fn guidance(self) -> String {
        match self.into_error() {
            Some(err) => err.to_string(),
            None => format!("Perfect, total is exactly ${BUDGET}. You can submit now."),
        }
    }

    fn into_error(self) -> Option<SurveyError> {
        match self {
            BudgetStatus::Over { excess } => Some(SurveyError::OverBudget {
                target: BUDGET,
                excess,
            }),
            BudgetStatus::Under { shortfall } => Some(SurveyError::UnderBudget {
                target: BUDGET,
                shortfall,
            }),
            BudgetStatus::Exact => None,
        }
    }
}

pub fn subtotal(allocation: &Allocation, category: Category) -> u32 {
    allocation.category_amounts(category).iter().sum()
}

pub fn total(allocation: &Allocation) -> u32 {
    Category::all()
        .map(|category| subtotal(allocation, category))
        .sum()
}

/// Gate for the submit action: only an exact total with at least one positive entry passes.
pub fn ensure_submittable(allocation: &Allocation) -> Result<()> {
    if let Some(err) = BudgetStatus::classify(total(allocation)).into_error() {
        return Err(err);
    }
    if allocation.is_zero() {
        return Err(SurveyError::NoAllocations);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct Subtotal {
    pub category: &'static str,
    pub amount: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub subtotals: Vec<Subtotal>,
    pub total: u32,
    pub budget: u32,
    pub status: BudgetStatus,
    pub guidance: String,
    pub progress: f64,
    pub can_submit: bool,
}

impl Summary {
    pub fn of(allocation: &Allocation) -> Self {
        let subtotals: Vec<Subtotal> = Category::all()
            .map(|category| Subtotal {
                category: category.name(),
                amount: subtotal(allocation, category),
            })
            .collect();
        let total: u32 = subtotals.iter().map(|entry| entry.amount).sum();
        let status = BudgetStatus::classify(total);
        Self {
            subtotals,
            total,
            budget: BUDGET,
            status,
            guidance: status.guidance(),
            progress: f64::from(total.min(BUDGET)) / f64::from(BUDGET),
            can_submit: status == BudgetStatus::Exact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationStore;
    use crate::catalog::{CATEGORIES, ITEMS};
    use proptest::prelude::*;

    fn store_with(entries: &[(&str, &str, i64)]) -> AllocationStore {
        let mut store = AllocationStore::new();
        for (category, item, amount) in entries {
            store.set(category, item, *amount).unwrap();
        }
        store
    }

    #[test]
    fn classification_reports_excess_and_shortfall() {
        assert_eq!(BudgetStatus::classify(120), BudgetStatus::Over { excess: 20 });
        assert_eq!(
            BudgetStatus::classify(85),
            BudgetStatus::Under { shortfall: 15 }
        );
        assert_eq!(
            BudgetStatus::classify(0),
            BudgetStatus::Under { shortfall: 100 }
        );
        assert_eq!(BudgetStatus::classify(100), BudgetStatus::Exact);
    }

    #[test]
    fn subtotals_are_per_priority() {
        let store = store_with(&[
            ("Worship-centered", "Choir", 50),
            ("Worship-centered", "Praise Band", 10),
            ("Missions-Centered", "Missions", 40),
        ]);
        let worship = Category::parse("Worship-centered").unwrap();
        let missions = Category::parse("Missions-Centered").unwrap();
        assert_eq!(subtotal(store.allocation(), worship), 60);
        assert_eq!(subtotal(store.allocation(), missions), 40);
        assert_eq!(total(store.allocation()), 100);
    }

    #[test]
    fn summary_disables_submit_until_exact() {
        let store = store_with(&[("Worship-centered", "Choir", 85)]);
        let summary = Summary::of(store.allocation());
        assert!(!summary.can_submit);
        assert_eq!(
            summary.guidance,
            "Total is less than $100 by $15. Keep allocating to reach $100."
        );
        assert!((summary.progress - 0.85).abs() < f64::EPSILON);

        let store = store_with(&[("Worship-centered", "Choir", 100), ("Support-Centered", "Garden", 20)]);
        let summary = Summary::of(store.allocation());
        assert!(!summary.can_submit);
        assert_eq!(summary.status, BudgetStatus::Over { excess: 20 });
        assert!((summary.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gate_rejects_inexact_totals() {
        let store = store_with(&[("Worship-centered", "Choir", 50)]);
        assert!(matches!(
            ensure_submittable(store.allocation()),
            Err(SurveyError::UnderBudget { shortfall: 50, .. })
        ));

        let store = store_with(&[("Worship-centered", "Choir", 50), ("Missions-Centered", "Missions", 50)]);
        assert!(ensure_submittable(store.allocation()).is_ok());
    }

    proptest! {
        #[test]
        fn total_is_sum_of_subtotals(
            cells in proptest::collection::vec((0..CATEGORIES.len(), 0..ITEMS.len(), 0i64..=100), 0..40)
        ) {
            let mut store = AllocationStore::new();
            for (category, item, amount) in cells {
                store.set(CATEGORIES[category], ITEMS[item], amount).unwrap();
            }
            let allocation = store.allocation();
            let by_priority: u32 = Category::all().map(|c| subtotal(allocation, c)).sum();
            prop_assert_eq!(total(allocation), by_priority);
            let by_entry: u32 = allocation.entries().map(|entry| entry.amount).sum();
            prop_assert_eq!(total(allocation), by_entry);
        }
    }
}
