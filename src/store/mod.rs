//! Meal persistence.
//!
//! Handlers only see the [`MealStore`] trait; the SQLite implementation and
//! the seed-file loader live in submodules.

mod seed;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use seed::parse_seed;
pub use sqlite::{default_database_path, remove_database, SqliteMealStore};

/// A single row of the `meals` table as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    pub quantity: i64,
    pub price: String,
}

impl Meal {
    pub fn new(name: impl Into<String>, quantity: i64, price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            price: price.into(),
        }
    }
}

/// Trait for meal storage backends.
///
/// Lookups that find nothing return `ServiceError::NotFound`; creating a
/// meal whose name is taken returns `ServiceError::Conflict`.
#[async_trait]
pub trait MealStore: Send + Sync {
    /// Insert a new meal. Names are unique.
    async fn create_meal(&self, meal: &Meal) -> Result<()>;

    /// All meals in the store's native order.
    async fn list_meals(&self) -> Result<Vec<Meal>>;

    async fn get_meal_by_id(&self, id: i64) -> Result<Meal>;

    async fn get_meal_by_name(&self, name: &str) -> Result<Meal>;

    /// Delete by id. Deleting a missing id is not an error; the returned
    /// status is always 200.
    async fn delete_meal_by_id(&self, id: i64) -> Result<u16>;

    /// Drop the whole table. Fails if it does not exist.
    async fn drop_meals_table(&self) -> Result<()>;
}
