use crate::error::{Result, SurveyError};

pub const BUDGET: u32 = 100;
pub const MAX_AMOUNT: u32 = 100;

pub const ITEM_COUNT: usize = 21;
pub const CATEGORY_COUNT: usize = 5;

pub const ITEMS: [&str; ITEM_COUNT] = [
    "Building Maintenance",
    "Building Upgrades",
    "Children's Ministry",
    "Children's Plays",
    "Choir",
    "Congregational Care (deacons, pastoral care, etc.)",
    "Garden",
    "Handbell Choir",
    "Men's Ministry",
    "Missions",
    "Office Expenses",
    "Office Staff",
    "Outreach events - Harvest Party, etc.",
    "Praise Band",
    "Preaching/Worship Leadership",
    "Small Groups",
    "Sound System",
    "Tech - Audio/Visual (sound system, streaming, etc.)",
    "Tech - Office/Building",
    "Women's Ministry",
    "Youth Ministry",
];

pub const CATEGORIES: [&str; CATEGORY_COUNT] = [
    "Worship-centered",
    "Ministry/Spiritual Formation-centered",
    "Missions-Centered",
    "Community-Centered",
    "Support-Centered",
];

/// Position of a priority in [`CATEGORIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Category(usize);

/// Position of an item in [`ITEMS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item(usize);

impl Category {
    pub fn parse(name: &str) -> Result<Self> {
        CATEGORIES
            .iter()
            .position(|candidate| *candidate == name)
            .map(Category)
            .ok_or_else(|| SurveyError::UnknownCategory(name.to_string()))
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..CATEGORY_COUNT).map(Category)
    }

    pub fn name(self) -> &'static str {
        CATEGORIES[self.0]
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl Item {
    pub fn parse(name: &str) -> Result<Self> {
        ITEMS
            .iter()
            .position(|candidate| *candidate == name)
            .map(Item)
            .ok_or_else(|| SurveyError::UnknownItem(name.to_string()))
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..ITEM_COUNT).map(Item)
    }

    pub fn name(self) -> &'static str {
        ITEMS[self.0]
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_to_their_positions() {
        let choir = Item::parse("Choir").unwrap();
        assert_eq!(choir.name(), "Choir");
        assert_eq!(choir.index(), 4);

        let support = Category::parse("Support-Centered").unwrap();
        assert_eq!(support.index(), CATEGORY_COUNT - 1);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            Category::parse("worship-centered"),
            Err(SurveyError::UnknownCategory(_))
        ));
        assert!(matches!(Item::parse("Bake Sale"), Err(SurveyError::UnknownItem(_))));
    }

    #[test]
    fn catalog_names_are_unique() {
        let mut items = ITEMS.to_vec();
        items.sort_unstable();
        items.dedup();
        assert_eq!(items.len(), ITEM_COUNT);
        assert_eq!(Category::all().count(), CATEGORY_COUNT);
    }
}
