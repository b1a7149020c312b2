/// Grocery list aggregation from meal plans
///
/// Every ingredient of every assigned recipe becomes one [`IngredientSource`],
/// scaled by the assignment's servings. Sources are merged by normalized name
/// and unit group: metric mass sums in grams, metric volume in millilitres,
/// and every other unit (including no unit) only with itself. Merged metric
/// amounts are shown in the largest unit that keeps the value at least 1.
///
/// Categories come from the ingredient, then the user's item templates, then
/// keyword inference.
///
/// # Example
///
/// ```
/// use larder_shared::grocery::{aggregate, IngredientSource};
/// use larder_shared::models::unit::MeasurementUnit;
/// use std::collections::HashMap;
///
/// let sources = vec![
///     IngredientSource::new("Flour", Some(600.0), Some(MeasurementUnit::G)),
///     IngredientSource::new("flour", Some(0.5), Some(MeasurementUnit::Kg)),
/// ];
///
/// let items = aggregate(&sources, &HashMap::new());
/// assert_eq!(items.len(), 1);
/// assert_eq!(items[0].quantity, Some(1.1));
/// assert_eq!(items[0].unit, Some(MeasurementUnit::Kg));
/// ```

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::models::category::GroceryCategory;
use crate::models::grocery_list::{GroceryItem, GroceryList, ItemSource, NewGroceryItem};
use crate::models::item_template::{normalize_name, UserItemTemplate};
use crate::models::meal_plan::{MealPlan, PlanDateError};
use crate::models::unit::MeasurementUnit;

/// Error type for grocery list generation
#[derive(Debug, thiserror::Error)]
pub enum GroceryError {
    /// No assignments (or no ingredients) in the requested range
    #[error("The meal plan has no recipes in the selected dates")]
    EmptyPlan,

    #[error(transparent)]
    InvalidRange(#[from] PlanDateError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Longest grocery list name the database accepts
pub const MAX_LIST_NAME_CHARS: usize = 255;

const GENERATED_SUFFIX: &str = " groceries";

/// Name for a list generated from `plan_name`, shortened to fit the name column
pub fn generated_list_name(plan_name: &str) -> String {
    let room = MAX_LIST_NAME_CHARS - GENERATED_SUFFIX.chars().count();
    let base: String = plan_name.chars().take(room).collect();
    format!("{}{}", base.trim_end(), GENERATED_SUFFIX)
}

/// One recipe ingredient occurrence, before merging
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct IngredientSource {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub category: Option<GroceryCategory>,

    /// Servings the recipe is written for
    pub recipe_servings: i32,

    /// Servings requested by the assignment
    pub assignment_servings: Option<i32>,
}

impl IngredientSource {
    /// Source at the recipe's own servings
    pub fn new(name: &str, quantity: Option<f64>, unit: Option<MeasurementUnit>) -> Self {
        Self {
            name: name.to_string(),
            quantity,
            unit,
            category: None,
            recipe_servings: 1,
            assignment_servings: None,
        }
    }

    /// Multiplier from the recipe's servings to the assignment's
    pub fn scale_factor(&self) -> f64 {
        match self.assignment_servings {
            Some(wanted) if self.recipe_servings > 0 => wanted as f64 / self.recipe_servings as f64,
            _ => 1.0,
        }
    }

    pub fn scaled_quantity(&self) -> Option<f64> {
        self.quantity.map(|q| q * self.scale_factor())
    }
}

/// One merged grocery line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedItem {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub category: GroceryCategory,
}

impl From<AggregatedItem> for NewGroceryItem {
    fn from(item: AggregatedItem) -> Self {
        NewGroceryItem {
            name: item.name,
            quantity: item.quantity,
            unit: item.unit,
            category: item.category,
            notes: None,
            source: ItemSource::MealPlan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum UnitGroup {
    Metric(MeasurementUnit),
    Exact(Option<MeasurementUnit>),
}

impl UnitGroup {
    fn of(unit: Option<MeasurementUnit>) -> Self {
        match unit.and_then(|u| u.metric_base()) {
            Some((base, _)) => UnitGroup::Metric(base),
            None => UnitGroup::Exact(unit),
        }
    }
}

/// Quantity converted into its group's base unit
fn to_group_quantity(quantity: f64, unit: Option<MeasurementUnit>) -> f64 {
    match unit.and_then(|u| u.metric_base()) {
        Some((_, factor)) => quantity * factor,
        None => quantity,
    }
}

/// Rounds to two decimals
pub fn round_quantity(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Picks the display unit for a metric total in its base unit
fn render_metric(total: f64, base: MeasurementUnit) -> (f64, MeasurementUnit) {
    match base {
        MeasurementUnit::G if total >= 1000.0 => (total / 1000.0, MeasurementUnit::Kg),
        MeasurementUnit::G if total > 0.0 && total < 1.0 => (total * 1000.0, MeasurementUnit::Mg),
        MeasurementUnit::Ml if total >= 1000.0 => (total / 1000.0, MeasurementUnit::L),
        _ => (total, base),
    }
}

struct Bucket {
    name: String,
    group: UnitGroup,
    total: Option<f64>,
    category: Option<GroceryCategory>,
}

/// Merges ingredient sources into grocery lines
///
/// `templates` maps normalized names to the user's remembered category.
/// Output is ordered by category display order, then name.
pub fn aggregate(
    sources: &[IngredientSource],
    templates: &HashMap<String, GroceryCategory>,
) -> Vec<AggregatedItem> {
    let mut order: Vec<(String, UnitGroup)> = Vec::new();
    let mut buckets: HashMap<(String, UnitGroup), Bucket> = HashMap::new();

    for source in sources {
        let normalized = normalize_name(&source.name);
        if normalized.is_empty() {
            continue;
        }

        let group = UnitGroup::of(source.unit);
        let key = (normalized, group);

        let bucket = buckets.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Bucket {
                name: source.name.trim().to_string(),
                group,
                total: None,
                category: None,
            }
        });

        if let Some(quantity) = source.scaled_quantity() {
            let converted = to_group_quantity(quantity, source.unit);
            bucket.total = Some(bucket.total.unwrap_or(0.0) + converted);
        }

        if bucket.category.is_none() {
            bucket.category = source.category;
        }
    }

    let mut items: Vec<AggregatedItem> = order
        .into_iter()
        .filter_map(|key| {
            let bucket = buckets.remove(&key)?;
            let (normalized, _) = key;

            let (quantity, unit) = match (bucket.group, bucket.total) {
                (UnitGroup::Metric(base), Some(total)) => {
                    let (value, unit) = render_metric(total, base);
                    (Some(round_quantity(value)), Some(unit))
                }
                (UnitGroup::Metric(base), None) => (None, Some(base)),
                (UnitGroup::Exact(unit), total) => (total.map(round_quantity), unit),
            };

            let category = bucket
                .category
                .or_else(|| templates.get(&normalized).copied())
                .unwrap_or_else(|| GroceryCategory::infer(&normalized));

            Some(AggregatedItem {
                name: bucket.name,
                quantity: quantity.filter(|q| *q > 0.0),
                unit,
                category,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        a.category
            .display_order()
            .cmp(&b.category.display_order())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    items
}

/// Items of one category, for display
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: GroceryCategory,
    pub label: &'static str,
    pub items: Vec<GroceryItem>,
}

/// Groups items by category in display order
///
/// Within a group unpurchased items come first, then by name ignoring case.
/// Empty categories are omitted.
pub fn group_by_category(items: Vec<GroceryItem>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = GroceryCategory::ALL
        .iter()
        .map(|category| CategoryGroup {
            category: *category,
            label: category.label(),
            items: Vec::new(),
        })
        .collect();

    for item in items {
        let index = item.category.display_order();
        if let Some(group) = groups.get_mut(index) {
            group.items.push(item);
        }
    }

    groups.retain(|g| !g.items.is_empty());
    for group in &mut groups {
        group.items.sort_by(|a, b| {
            a.purchased
                .cmp(&b.purchased)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
    }

    groups
}

/// Loads ingredient sources for a plan between two dates, inclusive
pub async fn load_sources(
    pool: &PgPool,
    plan_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<IngredientSource>, sqlx::Error> {
    sqlx::query_as::<_, IngredientSource>(
        r#"
        SELECT i.name, i.quantity, i.unit, i.category,
               r.servings AS recipe_servings, a.servings AS assignment_servings
        FROM meal_assignments a
        JOIN recipes r ON r.id = a.recipe_id AND r.deleted_at IS NULL
        JOIN recipe_ingredients i ON i.recipe_id = r.id
        WHERE a.meal_plan_id = $1 AND a.date BETWEEN $2 AND $3
        ORDER BY a.date ASC, a.meal_type ASC, i.position ASC
        "#,
    )
    .bind(plan_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Creates a grocery list from a plan's assignments
///
/// `range` restricts the dates used and must fall inside the plan. The list
/// belongs to `owner_id` and is named `"<plan name> groceries"`.
///
/// # Errors
///
/// - `GroceryError::InvalidRange` when `range` leaves the plan
/// - `GroceryError::EmptyPlan` when nothing in range has ingredients
pub async fn generate_from_plan(
    pool: &PgPool,
    plan: &MealPlan,
    owner_id: Uuid,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<(GroceryList, Vec<GroceryItem>), GroceryError> {
    let (from, to) = range.unwrap_or((plan.start_date, plan.end_date));
    if from > to {
        return Err(PlanDateError::StartAfterEnd.into());
    }
    plan.check_date(from)?;
    plan.check_date(to)?;

    let sources = load_sources(pool, plan.id, from, to).await?;
    if sources.is_empty() {
        return Err(GroceryError::EmptyPlan);
    }

    let mut names: Vec<String> = sources.iter().map(|s| normalize_name(&s.name)).collect();
    names.sort();
    names.dedup();
    let templates = UserItemTemplate::categories_for(pool, owner_id, &names).await?;

    let items: Vec<NewGroceryItem> = aggregate(&sources, &templates)
        .into_iter()
        .map(NewGroceryItem::from)
        .collect();

    let name = generated_list_name(&plan.name);
    let (list, rows) =
        GroceryList::create_with_items(pool, owner_id, &name, Some(plan.id), &items).await?;

    info!(
        grocery_list_id = %list.id,
        meal_plan_id = %plan.id,
        sources = sources.len(),
        items = rows.len(),
        "Generated grocery list from meal plan"
    );

    Ok((list, rows))
}
