use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parking_lot::RwLock;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use wanderplan_core::{BudgetTier, NewTrip, Trip};

pub trait TripRepository: Send + Sync {
    async fn create_trip(&self, new_trip: NewTrip, user_id: &str) -> Result<Trip>;
    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>>;
    async fn list_trips_for_owner(&self, user_id: &str) -> Result<Vec<Trip>>;
    async fn update_plan(&self, trip_id: Uuid, plan: &str) -> Result<Option<Trip>>;
    async fn count_trips(&self) -> Result<u64>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    trips: Arc<RwLock<HashMap<Uuid, Trip>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TripRepository for MemoryStore {
    async fn create_trip(&self, new_trip: NewTrip, user_id: &str) -> Result<Trip> {
        let trip = Trip::from_new(new_trip, user_id, Utc::now());
        self.trips.write().insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
        Ok(self.trips.read().get(&trip_id).cloned())
    }

    async fn list_trips_for_owner(&self, user_id: &str) -> Result<Vec<Trip>> {
        let mut trips = self
            .trips
            .read()
            .values()
            .filter(|trip| trip.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trips)
    }

    async fn update_plan(&self, trip_id: Uuid, plan: &str) -> Result<Option<Trip>> {
        let mut trips = self.trips.write();
        let Some(trip) = trips.get_mut(&trip_id) else {
            return Ok(None);
        };
        trip.plan = Some(plan.to_string());
        trip.updated_at = Utc::now();
        Ok(Some(trip.clone()))
    }

    async fn count_trips(&self) -> Result<u64> {
        Ok(self.trips.read().len() as u64)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trips (
              id TEXT PRIMARY KEY,
              user_id TEXT NOT NULL,
              destination TEXT NOT NULL,
              start_date TEXT NOT NULL,
              end_date TEXT NOT NULL,
              budget_preference TEXT NOT NULL
                CHECK (budget_preference IN ('free', 'poor', 'moderate', 'unlimited')),
              plan TEXT,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS trips_user_id_idx ON trips (user_id);")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

const TRIP_COLUMNS: &str =
    "id, user_id, destination, start_date, end_date, budget_preference, plan, created_at, updated_at";

impl TripRepository for SqliteStore {
    async fn create_trip(&self, new_trip: NewTrip, user_id: &str) -> Result<Trip> {
        let trip = Trip::from_new(new_trip, user_id, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO trips (id, user_id, destination, start_date, end_date,
                               budget_preference, plan, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(trip.id.to_string())
        .bind(&trip.user_id)
        .bind(&trip.destination)
        .bind(trip.start_date.to_string())
        .bind(trip.end_date.to_string())
        .bind(trip.budget_preference.as_code())
        .bind(&trip.plan)
        .bind(stored_timestamp(trip.created_at))
        .bind(stored_timestamp(trip.updated_at))
        .execute(&self.pool)
        .await
        .context("failed inserting trip")?;

        Ok(trip)
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
        let row = sqlx::query(&format!("SELECT {} FROM trips WHERE id = ?1", TRIP_COLUMNS))
            .bind(trip_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| trip_from_row(&row)).transpose()
    }

    async fn list_trips_for_owner(&self, user_id: &str) -> Result<Vec<Trip>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM trips WHERE user_id = ?1 ORDER BY created_at DESC",
            TRIP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trip_from_row).collect()
    }

    async fn update_plan(&self, trip_id: Uuid, plan: &str) -> Result<Option<Trip>> {
        let result = sqlx::query("UPDATE trips SET plan = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(plan)
            .bind(stored_timestamp(Utc::now()))
            .bind(trip_id.to_string())
            .execute(&self.pool)
            .await
            .context("failed updating trip plan")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_trip(trip_id).await
    }

    async fn count_trips(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM trips")
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.get("total");
        Ok(total.max(0) as u64)
    }
}

fn trip_from_row(row: &SqliteRow) -> Result<Trip> {
    let id: String = row.get("id");
    let budget: String = row.get("budget_preference");

    Ok(Trip {
        id: Uuid::parse_str(&id).with_context(|| format!("invalid trip id {}", id))?,
        user_id: row.get("user_id"),
        destination: row.get("destination"),
        start_date: parse_stored_date(row.get("start_date"))?,
        end_date: parse_stored_date(row.get("end_date"))?,
        budget_preference: BudgetTier::parse(&budget)
            .with_context(|| format!("invalid budget preference {}", budget))?,
        plan: row.get("plan"),
        created_at: parse_stored_timestamp(row.get("created_at"))?,
        updated_at: parse_stored_timestamp(row.get("updated_at"))?,
    })
}

fn parse_stored_date(value: String) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .with_context(|| format!("invalid stored date {}", value))
}

/// Fixed-width so `ORDER BY created_at` sorts chronologically.
fn stored_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_stored_timestamp(value: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .with_context(|| format!("invalid stored timestamp {}", value))
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl TripRepository for Store {
    async fn create_trip(&self, new_trip: NewTrip, user_id: &str) -> Result<Trip> {
        match self {
            Store::Memory(store) => store.create_trip(new_trip, user_id).await,
            Store::Sqlite(store) => store.create_trip(new_trip, user_id).await,
        }
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
        match self {
            Store::Memory(store) => store.get_trip(trip_id).await,
            Store::Sqlite(store) => store.get_trip(trip_id).await,
        }
    }

    async fn list_trips_for_owner(&self, user_id: &str) -> Result<Vec<Trip>> {
        match self {
            Store::Memory(store) => store.list_trips_for_owner(user_id).await,
            Store::Sqlite(store) => store.list_trips_for_owner(user_id).await,
        }
    }

    async fn update_plan(&self, trip_id: Uuid, plan: &str) -> Result<Option<Trip>> {
        match self {
            Store::Memory(store) => store.update_plan(trip_id, plan).await,
            Store::Sqlite(store) => store.update_plan(trip_id, plan).await,
        }
    }

    async fn count_trips(&self) -> Result<u64> {
        match self {
            Store::Memory(store) => store.count_trips().await,
            Store::Sqlite(store) => store.count_trips().await,
        }
    }
}
