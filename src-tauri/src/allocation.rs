use serde::Serialize;

use crate::catalog::{Category, Item, CATEGORY_COUNT, ITEM_COUNT, MAX_AMOUNT};
use crate::error::{Result, SurveyError};

/// Full mapping of priority → item → amount.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allocation {
    amounts: [[u32; ITEM_COUNT]; CATEGORY_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub category: &'static str,
    pub item: &'static str,
    pub amount: u32,
}

impl Allocation {
    pub fn get(&self, category: Category, item: Item) -> u32 {
        self.amounts[category.index()][item.index()]
    }

    pub fn category_amounts(&self, category: Category) -> &[u32; ITEM_COUNT] {
        &self.amounts[category.index()]
    }

    /// Every (priority, item, amount), zero amounts included.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        Category::all().flat_map(move |category| {
            Item::all().map(move |item| Entry {
                category: category.name(),
                item: item.name(),
                amount: self.get(category, item),
            })
        })
    }

    pub fn positive_entries(&self) -> Vec<Entry> {
        self.entries().filter(|entry| entry.amount > 0).collect()
    }

    pub fn is_zero(&self) -> bool {
        self.amounts.iter().flatten().all(|amount| *amount == 0)
    }
}

#[derive(Debug, Default)]
pub struct AllocationStore {
    allocation: Allocation,
    submitted: bool,
}

impl AllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one amount. Out-of-range amounts are rejected and leave the store untouched.
    pub fn set(&mut self, category: &str, item: &str, amount: i64) -> Result<()> {
        let category = Category::parse(category)?;
        let item = Item::parse(item)?;
        let amount = checked_amount(amount)?;
        self.allocation.amounts[category.index()][item.index()] = amount;
        self.submitted = false;
        tracing::debug!(
            priority = category.name(),
            item = item.name(),
            amount,
            "allocation updated"
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        self.allocation = Allocation::default();
        self.submitted = false;
    }

    pub fn snapshot(&self) -> Allocation {
        self.allocation.clone()
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }
}

fn checked_amount(amount: i64) -> Result<u32> {
    u32::try_from(amount)
        .ok()
        .filter(|value| *value <= MAX_AMOUNT)
        .ok_or(SurveyError::AmountOutOfRange {
            amount,
            max: MAX_AMOUNT,
        })
}
