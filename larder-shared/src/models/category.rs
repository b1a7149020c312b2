/// Grocery categories
///
/// Categories drive how a grocery list is grouped for shopping. Declaration
/// order is display order (roughly the walk through a store).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store section a grocery item belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "grocery_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GroceryCategory {
    Produce,
    MeatSeafood,
    DairyEggs,
    Bakery,
    Pantry,
    Frozen,
    Beverages,
    SpicesSeasonings,
    Household,
    Other,
}

impl Default for GroceryCategory {
    fn default() -> Self {
        GroceryCategory::Other
    }
}

/// Keyword table for category inference, checked in order
///
/// More specific phrases come before the generic words they contain
/// ("coconut milk" before "milk", "frozen peas" before "peas").
const KEYWORDS: &[(&str, GroceryCategory)] = &[
    ("frozen", GroceryCategory::Frozen),
    ("ice cream", GroceryCategory::Frozen),
    ("coconut milk", GroceryCategory::Pantry),
    ("peanut butter", GroceryCategory::Pantry),
    ("chicken stock", GroceryCategory::Pantry),
    ("chicken broth", GroceryCategory::Pantry),
    ("beef stock", GroceryCategory::Pantry),
    ("vegetable stock", GroceryCategory::Pantry),
    ("black pepper", GroceryCategory::SpicesSeasonings),
    ("bell pepper", GroceryCategory::Produce),
    ("chili powder", GroceryCategory::SpicesSeasonings),
    ("garlic powder", GroceryCategory::SpicesSeasonings),
    ("onion powder", GroceryCategory::SpicesSeasonings),
    ("baking powder", GroceryCategory::Pantry),
    ("baking soda", GroceryCategory::Pantry),
    ("paper towel", GroceryCategory::Household),
    ("dish soap", GroceryCategory::Household),
    ("trash bag", GroceryCategory::Household),
    ("aluminum foil", GroceryCategory::Household),
    ("detergent", GroceryCategory::Household),
    ("chicken", GroceryCategory::MeatSeafood),
    ("beef", GroceryCategory::MeatSeafood),
    ("pork", GroceryCategory::MeatSeafood),
    ("bacon", GroceryCategory::MeatSeafood),
    ("sausage", GroceryCategory::MeatSeafood),
    ("turkey", GroceryCategory::MeatSeafood),
    ("lamb", GroceryCategory::MeatSeafood),
    ("ham", GroceryCategory::MeatSeafood),
    ("salmon", GroceryCategory::MeatSeafood),
    ("tuna", GroceryCategory::MeatSeafood),
    ("shrimp", GroceryCategory::MeatSeafood),
    ("prawn", GroceryCategory::MeatSeafood),
    ("cod", GroceryCategory::MeatSeafood),
    ("fish", GroceryCategory::MeatSeafood),
    ("milk", GroceryCategory::DairyEggs),
    ("cheese", GroceryCategory::DairyEggs),
    ("parmesan", GroceryCategory::DairyEggs),
    ("mozzarella", GroceryCategory::DairyEggs),
    ("butter", GroceryCategory::DairyEggs),
    ("cream", GroceryCategory::DairyEggs),
    ("yogurt", GroceryCategory::DairyEggs),
    ("yoghurt", GroceryCategory::DairyEggs),
    ("egg", GroceryCategory::DairyEggs),
    ("bread", GroceryCategory::Bakery),
    ("baguette", GroceryCategory::Bakery),
    ("bun", GroceryCategory::Bakery),
    ("roll", GroceryCategory::Bakery),
    ("tortilla", GroceryCategory::Bakery),
    ("pita", GroceryCategory::Bakery),
    ("croissant", GroceryCategory::Bakery),
    ("salt", GroceryCategory::SpicesSeasonings),
    ("pepper", GroceryCategory::SpicesSeasonings),
    ("cumin", GroceryCategory::SpicesSeasonings),
    ("paprika", GroceryCategory::SpicesSeasonings),
    ("oregano", GroceryCategory::SpicesSeasonings),
    ("cinnamon", GroceryCategory::SpicesSeasonings),
    ("nutmeg", GroceryCategory::SpicesSeasonings),
    ("thyme", GroceryCategory::SpicesSeasonings),
    ("turmeric", GroceryCategory::SpicesSeasonings),
    ("vanilla", GroceryCategory::SpicesSeasonings),
    ("coffee", GroceryCategory::Beverages),
    ("tea", GroceryCategory::Beverages),
    ("juice", GroceryCategory::Beverages),
    ("wine", GroceryCategory::Beverages),
    ("beer", GroceryCategory::Beverages),
    ("soda", GroceryCategory::Beverages),
    ("water", GroceryCategory::Beverages),
    ("flour", GroceryCategory::Pantry),
    ("sugar", GroceryCategory::Pantry),
    ("rice", GroceryCategory::Pantry),
    ("pasta", GroceryCategory::Pantry),
    ("spaghetti", GroceryCategory::Pantry),
    ("noodle", GroceryCategory::Pantry),
    ("oil", GroceryCategory::Pantry),
    ("vinegar", GroceryCategory::Pantry),
    ("honey", GroceryCategory::Pantry),
    ("oats", GroceryCategory::Pantry),
    ("beans", GroceryCategory::Pantry),
    ("lentil", GroceryCategory::Pantry),
    ("sauce", GroceryCategory::Pantry),
    ("stock", GroceryCategory::Pantry),
    ("broth", GroceryCategory::Pantry),
    ("apple", GroceryCategory::Produce),
    ("banana", GroceryCategory::Produce),
    ("lemon", GroceryCategory::Produce),
    ("lime", GroceryCategory::Produce),
    ("orange", GroceryCategory::Produce),
    ("berry", GroceryCategory::Produce),
    ("berries", GroceryCategory::Produce),
    ("tomato", GroceryCategory::Produce),
    ("onion", GroceryCategory::Produce),
    ("garlic", GroceryCategory::Produce),
    ("potato", GroceryCategory::Produce),
    ("carrot", GroceryCategory::Produce),
    ("celery", GroceryCategory::Produce),
    ("lettuce", GroceryCategory::Produce),
    ("spinach", GroceryCategory::Produce),
    ("kale", GroceryCategory::Produce),
    ("cucumber", GroceryCategory::Produce),
    ("zucchini", GroceryCategory::Produce),
    ("mushroom", GroceryCategory::Produce),
    ("avocado", GroceryCategory::Produce),
    ("broccoli", GroceryCategory::Produce),
    ("cabbage", GroceryCategory::Produce),
    ("ginger", GroceryCategory::Produce),
    ("cilantro", GroceryCategory::Produce),
    ("parsley", GroceryCategory::Produce),
    ("basil", GroceryCategory::Produce),
    ("scallion", GroceryCategory::Produce),
    ("peas", GroceryCategory::Produce),
];

impl GroceryCategory {
    /// All categories in display order
    pub const ALL: [GroceryCategory; 10] = [
        GroceryCategory::Produce,
        GroceryCategory::MeatSeafood,
        GroceryCategory::DairyEggs,
        GroceryCategory::Bakery,
        GroceryCategory::Pantry,
        GroceryCategory::Frozen,
        GroceryCategory::Beverages,
        GroceryCategory::SpicesSeasonings,
        GroceryCategory::Household,
        GroceryCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroceryCategory::Produce => "produce",
            GroceryCategory::MeatSeafood => "meat_seafood",
            GroceryCategory::DairyEggs => "dairy_eggs",
            GroceryCategory::Bakery => "bakery",
            GroceryCategory::Pantry => "pantry",
            GroceryCategory::Frozen => "frozen",
            GroceryCategory::Beverages => "beverages",
            GroceryCategory::SpicesSeasonings => "spices_seasonings",
            GroceryCategory::Household => "household",
            GroceryCategory::Other => "other",
        }
    }

    /// Human-readable label for list headings
    pub fn label(&self) -> &'static str {
        match self {
            GroceryCategory::Produce => "Produce",
            GroceryCategory::MeatSeafood => "Meat & Seafood",
            GroceryCategory::DairyEggs => "Dairy & Eggs",
            GroceryCategory::Bakery => "Bakery",
            GroceryCategory::Pantry => "Pantry",
            GroceryCategory::Frozen => "Frozen",
            GroceryCategory::Beverages => "Beverages",
            GroceryCategory::SpicesSeasonings => "Spices & Seasonings",
            GroceryCategory::Household => "Household",
            GroceryCategory::Other => "Other",
        }
    }

    /// Position in display order
    pub fn display_order(&self) -> usize {
        *self as usize
    }

    /// Guesses a category from an item name
    ///
    /// Matches whole words (or word prefixes for plurals like "tomatoes")
    /// against the keyword table; falls back to [`GroceryCategory::Other`].
    pub fn infer(name: &str) -> GroceryCategory {
        let lowered = name.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let joined = words.join(" ");

        for (keyword, category) in KEYWORDS {
            let matched = if keyword.contains(' ') {
                joined.contains(keyword)
            } else {
                words.iter().any(|w| w.starts_with(keyword) && w.len() <= keyword.len() + 3)
            };
            if matched {
                return *category;
            }
        }

        GroceryCategory::Other
    }
}

impl fmt::Display for GroceryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
