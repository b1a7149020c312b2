/// Database models for Larder
///
/// Each module holds a row type, its input types, and the SQL that reads and
/// writes it. Soft-deletable records (recipes, meal plans, grocery lists) are
/// hidden from every finder once `deleted_at` is set.
///
/// # Models
///
/// - `user`: users mirrored from the auth service
/// - `recipe`: recipes with ordered ingredients and steps
/// - `meal_plan`: dated plans and recipe assignments
/// - `grocery_list`: lists, items, and public share links
/// - `item_template`: per-user autocomplete memory
/// - `content_share`: user-to-user share grants
/// - `unit`, `category`: closed enumerations shared by the above
///
/// # Example
///
/// ```no_run
/// use larder_shared::db::pool::{connect, PoolConfig};
/// use larder_shared::models::user::{NewUser, User};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = connect(&PoolConfig::new("postgresql://localhost/larder", 5)).await?;
///
/// let user = User::insert(&pool, NewUser {
///     email: "cook@example.com".to_string(),
///     name: Some("Sam".to_string()),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod category;
pub mod content_share;
pub mod grocery_list;
pub mod item_template;
pub mod meal_plan;
pub mod recipe;
pub mod unit;
pub mod user;
