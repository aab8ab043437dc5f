//! Turso Embedded / libSQL storage layer (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding registered
//! households and the contact records created for them.
//!
//! **Access rules:**
//! - `register`: read-write via [`Storage::open`]
//! - `list` / `context`: read-only via [`Storage::open_readonly`]
//!
//! Households are keyed by their primary display name, compared without
//! regard to case. Saving a household whose name already exists replaces
//! the stored record and keeps its id and registration time.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use intakeforge_shared::{HouseholdId, HouseholdRecord, IntakeForgeError, Result};
use libsql::{Connection, Database, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Every contact id starts with this object prefix.
pub const CONTACT_ID_PREFIX: &str = "003";

/// Digits following the prefix in a contact id.
const CONTACT_ID_DIGITS: usize = 13;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The flat contact profile created when a household is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub mailing_street: String,
    pub mailing_city: String,
    pub mailing_state: String,
    pub mailing_zip: String,
    pub annual_income: String,
    pub employer: String,
    pub occupation: String,
    pub risk_tolerance: String,
    pub investment_goal: String,
    pub time_horizon_years: String,
    pub net_worth: String,
    pub liquid_assets: String,
    pub lead_source: String,
    pub notes: String,
}

/// A stored contact.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: String,
    pub household_name: String,
    pub record: ContactRecord,
    pub created_at: DateTime<Utc>,
}

/// A registered household as stored.
#[derive(Debug, Clone, Serialize)]
pub struct StoredHousehold {
    pub id: HouseholdId,
    /// Display name as last saved.
    pub name: String,
    pub contact_id: Option<String>,
    pub record: HouseholdRecord,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Format a contact sequence number as a contact id.
pub fn contact_id_for(seq: i64) -> String {
    format!("{CONTACT_ID_PREFIX}{seq:0width$}", width = CONTACT_ID_DIGITS)
}

fn seq_from_contact_id(id: &str) -> Option<i64> {
    let digits = id.strip_prefix(CONTACT_ID_PREFIX)?;
    if digits.len() != CONTACT_ID_DIGITS {
        return None;
    }
    digits.parse().ok()
}

/// Case-insensitive lookup key for a household name.
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// HouseholdStore
// ---------------------------------------------------------------------------

/// Persistence boundary used by registration and context building.
#[allow(async_fn_in_trait)]
pub trait HouseholdStore {
    /// The household whose display name matches `name`, ignoring case.
    async fn load_household(&self, name: &str) -> Result<Option<StoredHousehold>>;

    /// Save `household` under its display name, replacing a case-insensitive match.
    async fn save_household(
        &self,
        household: &HouseholdRecord,
        contact_id: Option<&str>,
    ) -> Result<StoredHousehold>;

    /// Allocate a contact id and store `record` under it.
    async fn create_contact(&self, household_name: &str, record: &ContactRecord) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IntakeForgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(IntakeForgeError::Storage(format!(
                "no registry database at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        IntakeForgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(IntakeForgeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Household operations
    // -----------------------------------------------------------------------

    /// All registered households, ordered by name.
    pub async fn list_households(&self) -> Result<Vec<StoredHousehold>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, contact_id, record_json, registered_at, updated_at
                 FROM households ORDER BY name_key",
                params![],
            )
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?
        {
            results.push(row_to_household(&row)?);
        }
        Ok(results)
    }

    /// Remove a household by name, ignoring case. Returns whether a row was deleted.
    pub async fn delete_household(&self, name: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "DELETE FROM households WHERE name_key = ?1",
                params![name_key(name)],
            )
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Contact operations
    // -----------------------------------------------------------------------

    /// A contact by id.
    pub async fn get_contact(&self, id: &str) -> Result<Option<Contact>> {
        let Some(seq) = seq_from_contact_id(id) else {
            return Ok(None);
        };
        let mut rows = self
            .conn
            .query(
                "SELECT seq, household_name, record_json, created_at FROM contacts WHERE seq = ?1",
                params![seq],
            )
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_contact(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(IntakeForgeError::Storage(e.to_string())),
        }
    }
}

impl HouseholdStore for Storage {
    async fn load_household(&self, name: &str) -> Result<Option<StoredHousehold>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, contact_id, record_json, registered_at, updated_at
                 FROM households WHERE name_key = ?1",
                params![name_key(name)],
            )
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_household(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(IntakeForgeError::Storage(e.to_string())),
        }
    }

    async fn save_household(
        &self,
        household: &HouseholdRecord,
        contact_id: Option<&str>,
    ) -> Result<StoredHousehold> {
        self.check_writable()?;
        let name = household.display_name();
        if name.is_empty() {
            return Err(IntakeForgeError::validation(
                "household has no primary name to register under",
            ));
        }
        let record_json = serde_json::to_string(household)
            .map_err(|e| IntakeForgeError::Storage(format!("cannot encode household: {e}")))?;
        let now = Utc::now().to_rfc3339();
        let id = HouseholdId::new().to_string();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO households (id, name, name_key, contact_id, record_json, registered_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(name_key) DO UPDATE SET
                   name = excluded.name,
                   contact_id = COALESCE(excluded.contact_id, households.contact_id),
                   record_json = excluded.record_json,
                   updated_at = excluded.updated_at
                 RETURNING id, name, contact_id, record_json, registered_at, updated_at",
                params![
                    id.as_str(),
                    name.as_str(),
                    name_key(&name),
                    contact_id,
                    record_json.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        let stored = match rows.next().await {
            Ok(Some(row)) => row_to_household(&row)?,
            Ok(None) => {
                return Err(IntakeForgeError::Storage(
                    "household upsert returned no row".into(),
                ));
            }
            Err(e) => return Err(IntakeForgeError::Storage(e.to_string())),
        };
        debug!(household = %stored.name, id = %stored.id, "saved household");
        Ok(stored)
    }

    async fn create_contact(&self, household_name: &str, record: &ContactRecord) -> Result<String> {
        self.check_writable()?;
        let record_json = serde_json::to_string(record)
            .map_err(|e| IntakeForgeError::Storage(format!("cannot encode contact: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO contacts (household_name, record_json, created_at)
                 VALUES (?1, ?2, ?3)
                 RETURNING seq",
                params![household_name, record_json.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

        let seq = match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| IntakeForgeError::Storage(e.to_string()))?,
            Ok(None) => {
                return Err(IntakeForgeError::Storage(
                    "contact insert returned no row".into(),
                ));
            }
            Err(e) => return Err(IntakeForgeError::Storage(e.to_string())),
        };
        let id = contact_id_for(seq);
        debug!(household = household_name, contact_id = %id, "created contact");
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IntakeForgeError::Storage(format!("invalid date: {e}")))
}

fn row_to_household(row: &libsql::Row) -> Result<StoredHousehold> {
    let id: String = row
        .get(0)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;
    let record_json: String = row
        .get(3)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;
    let registered_at: String = row
        .get(4)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;
    let updated_at: String = row
        .get(5)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

    Ok(StoredHousehold {
        id: id
            .parse()
            .map_err(|e| IntakeForgeError::Storage(format!("invalid household id {id}: {e}")))?,
        name: row
            .get::<String>(1)
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?,
        contact_id: row.get::<String>(2).ok(),
        record: serde_json::from_str(&record_json)
            .map_err(|e| IntakeForgeError::Storage(format!("invalid household record: {e}")))?,
        registered_at: parse_timestamp(&registered_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_contact(row: &libsql::Row) -> Result<Contact> {
    let seq: i64 = row
        .get(0)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;
    let record_json: String = row
        .get(2)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(3)
        .map_err(|e| IntakeForgeError::Storage(e.to_string()))?;

    Ok(Contact {
        id: contact_id_for(seq),
        household_name: row
            .get::<String>(1)
            .map_err(|e| IntakeForgeError::Storage(e.to_string()))?,
        record: serde_json::from_str(&record_json)
            .map_err(|e| IntakeForgeError::Storage(format!("invalid contact record: {e}")))?,
        created_at: parse_timestamp(&created_at)?,
    })
}
