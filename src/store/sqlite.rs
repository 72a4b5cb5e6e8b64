//! SQLite-backed meal store.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{parse_seed, Meal, MealStore};
use crate::error::{Result, ServiceError};

const DATABASE_FILE: &str = "database.db3";

/// Default database location: `$TEMP`, then `$TMP`, then the working directory.
pub fn default_database_path() -> PathBuf {
    let dir = std::env::var_os("TEMP")
        .or_else(|| std::env::var_os("TMP"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(DATABASE_FILE)
}

/// Delete a database file so the next open starts clean.
pub fn remove_database(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
        info!(path = %path.display(), "Removed database file");
    }
    Ok(())
}

/// Meal store over a single SQLite connection.
///
/// Statements run on tokio's blocking pool; the connection mutex serializes
/// them.
#[derive(Clone)]
pub struct SqliteMealStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMealStore {
    /// Open (or create) the database at `path`.
    ///
    /// The `meals` table is created when missing, and a freshly created table
    /// is filled from `seed_file` if that file exists.
    pub fn open(path: impl AsRef<Path>, seed_file: Option<&Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening meal database");
        let conn = Connection::open(path)?;
        Self::from_connection(conn, seed_file)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(seed_file: Option<&Path>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, seed_file)
    }

    fn from_connection(mut conn: Connection, seed_file: Option<&Path>) -> Result<Self> {
        if !table_exists(&conn)? {
            let seed = match seed_file.filter(|p| p.exists()) {
                Some(path) => Some((path, parse_seed(&std::fs::read_to_string(path)?)?)),
                None => None,
            };
            create_table(&mut conn, seed)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await?
    }
}

fn table_exists(conn: &Connection) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='meals'",
            [],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Create the table and insert seed rows as one unit, so a failed insert
/// leaves no table behind.
fn create_table(conn: &mut Connection, seed: Option<(&Path, Vec<Meal>)>) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "CREATE TABLE meals (id INTEGER PRIMARY KEY, name TEXT, quantity INTEGER, price TEXT)",
        [],
    )?;

    if let Some((path, meals)) = &seed {
        let mut insert =
            tx.prepare("INSERT INTO meals (name, quantity, price) VALUES (?1, ?2, ?3)")?;
        for meal in meals {
            insert.execute(params![meal.name, meal.quantity, meal.price])?;
        }
        info!(
            path = %path.display(),
            rows = meals.len(),
            "Seeding meals table"
        );
    }
    tx.commit()?;

    info!("Created meals table");
    Ok(())
}

fn meal_from_row(row: &Row<'_>) -> rusqlite::Result<Meal> {
    Ok(Meal {
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        price: row.get("price")?,
    })
}

#[async_trait]
impl MealStore for SqliteMealStore {
    async fn create_meal(&self, meal: &Meal) -> Result<()> {
        let meal = meal.clone();
        self.with_conn(move |conn| {
            let exists = conn
                .query_row("SELECT id FROM meals WHERE name = ?1", [&meal.name], |_| Ok(()))
                .optional()?
                .is_some();
            if exists {
                return Err(ServiceError::Conflict);
            }

            conn.execute(
                "INSERT INTO meals (name, quantity, price) VALUES (?1, ?2, ?3)",
                params![meal.name, meal.quantity, meal.price],
            )?;
            debug!(name = %meal.name, "Inserted meal");
            Ok(())
        })
        .await
    }

    async fn list_meals(&self) -> Result<Vec<Meal>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name, quantity, price FROM meals")?;
            let meals = stmt
                .query_map([], meal_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(meals)
        })
        .await
    }

    async fn get_meal_by_id(&self, id: i64) -> Result<Meal> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT name, quantity, price FROM meals WHERE id = ?1",
                [id],
                meal_from_row,
            )
            .optional()?
            .ok_or(ServiceError::NotFound)
        })
        .await
    }

    async fn get_meal_by_name(&self, name: &str) -> Result<Meal> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT name, quantity, price FROM meals WHERE name = ?1",
                [&name],
                meal_from_row,
            )
            .optional()?
            .ok_or(ServiceError::NotFound)
        })
        .await
    }

    async fn delete_meal_by_id(&self, id: i64) -> Result<u16> {
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
            debug!(id, removed, "Deleted meal");
            Ok(200)
        })
        .await
    }

    async fn drop_meals_table(&self) -> Result<()> {
        self.with_conn(|conn| {
            if !table_exists(conn)? {
                return Err(ServiceError::MissingTable);
            }
            conn.execute("DROP TABLE meals", [])?;
            Ok(())
        })
        .await
    }
}
