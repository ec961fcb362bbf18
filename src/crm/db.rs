use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};

use super::models::*;

/// Columns selected for every lead query, in `LeadRow` order.
const LEAD_COLUMNS: &str = "id, name, company, email, phone, product, brand, volume, packaging, \
     message, estimated_investment, stage, created_at, updated_at, notes, last_contact";

/// Async-safe handle to the lead database.
///
/// Wraps `LeadDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<LeadDb>>,
}

impl DbHandle {
    pub fn new(db: LeadDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&LeadDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct LeadDb {
    conn: Connection,
}

impl LeadDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.migrate().context("Failed to run migrations")?;
        Ok(())
    }

    /// Create the `leads` table and indexes. Safe to run repeatedly.
    pub fn migrate(&self) -> Result<()> {
        let allowed_stages = LeadStage::ALL
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        self.conn
            .execute_batch(&format!(
                "
                CREATE TABLE IF NOT EXISTS leads (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    company TEXT NOT NULL,
                    email TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    product TEXT NOT NULL,
                    brand TEXT NOT NULL,
                    volume TEXT NOT NULL,
                    packaging TEXT NOT NULL,
                    message TEXT,
                    estimated_investment TEXT,
                    stage TEXT NOT NULL DEFAULT 'entrante' CHECK (stage IN ({allowed_stages})),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    notes TEXT NOT NULL DEFAULT '[]'
                );

                CREATE INDEX IF NOT EXISTS idx_leads_created ON leads(created_at);
                CREATE INDEX IF NOT EXISTS idx_leads_stage ON leads(stage);
                "
            ))
            .context("Failed to create leads table")?;

        // Additive migration; only "duplicate column" is tolerated.
        match self
            .conn
            .execute("ALTER TABLE leads ADD COLUMN last_contact TEXT", [])
        {
            Ok(_) => {}
            Err(e) if e.to_string().contains("duplicate column") => {}
            Err(e) => return Err(anyhow::anyhow!("Failed to add last_contact column: {}", e)),
        }

        Ok(())
    }

    // ── Lead CRUD ─────────────────────────────────────────────────────

    pub fn create_lead(&self, new: &NewLead) -> Result<Lead> {
        let id = uuid::Uuid::new_v4().to_string();
        let lead = Lead::from_new(id.clone(), new.clone(), now_micros());

        self.conn
            .execute(
                "INSERT INTO leads (id, name, company, email, phone, product, brand, volume, packaging,
                                    message, estimated_investment, stage, created_at, updated_at, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    lead.id,
                    lead.name,
                    lead.company,
                    lead.email,
                    lead.phone,
                    lead.product.as_str(),
                    lead.brand.as_str(),
                    lead.volume.as_str(),
                    lead.packaging.as_str(),
                    lead.message,
                    lead.estimated_investment,
                    lead.stage.as_str(),
                    format_ts(&lead.created_at),
                    format_ts(&lead.updated_at),
                    serde_json::to_string(&lead.notes).context("Failed to encode notes")?,
                ],
            )
            .context("Failed to insert lead")?;

        self.get_lead(&id)?.context("Lead not found after insert")
    }

    /// All leads, newest first.
    pub fn list_leads(&self) -> Result<Vec<Lead>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC, rowid DESC"
            ))
            .context("Failed to prepare list_leads")?;
        let rows = stmt
            .query_map([], LeadRow::from_row)
            .context("Failed to query leads")?;
        let mut leads = Vec::new();
        for row in rows {
            let r = row.context("Failed to read lead row")?;
            leads.push(r.into_lead()?);
        }
        Ok(leads)
    }

    pub fn get_lead(&self, id: &str) -> Result<Option<Lead>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"))
            .context("Failed to prepare get_lead")?;
        let mut rows = stmt
            .query_map(params![id], LeadRow::from_row)
            .context("Failed to query lead")?;
        match rows.next() {
            Some(row) => {
                let r = row.context("Failed to read lead row")?;
                Ok(Some(r.into_lead()?))
            }
            None => Ok(None),
        }
    }

    /// Apply a partial update. Returns `None` when the lead does not exist.
    /// An empty update is not a mutation and leaves `updated_at` alone.
    pub fn update_lead(&self, id: &str, update: &LeadUpdate) -> Result<Option<Lead>> {
        if update.is_empty() {
            return self.get_lead(id);
        }
        self.modify_lead(id, |lead| update.apply_to(lead))
    }

    /// Push a note and stamp `last_contact` inside the same transaction that
    /// reads the current notes, so concurrent appends never overwrite each other.
    pub fn append_note(&self, id: &str, note: &str) -> Result<Option<Lead>> {
        self.modify_lead(id, |lead| {
            lead.notes.push(note.to_string());
            lead.last_contact = Some(now_micros());
        })
    }

    /// Read, mutate and write back one lead in a single transaction.
    fn modify_lead(&self, id: &str, apply: impl FnOnce(&mut Lead)) -> Result<Option<Lead>> {
        // unchecked_transaction is fine: DbHandle's Mutex serializes access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let Some(mut lead) = self.get_lead(id)? else {
            return Ok(None);
        };
        apply(&mut lead);
        lead.touch();

        tx.execute(
            "UPDATE leads SET name = ?1, company = ?2, email = ?3, phone = ?4, product = ?5,
                              brand = ?6, volume = ?7, packaging = ?8, message = ?9,
                              estimated_investment = ?10, stage = ?11, updated_at = ?12,
                              notes = ?13, last_contact = ?14
             WHERE id = ?15",
            params![
                lead.name,
                lead.company,
                lead.email,
                lead.phone,
                lead.product.as_str(),
                lead.brand.as_str(),
                lead.volume.as_str(),
                lead.packaging.as_str(),
                lead.message,
                lead.estimated_investment,
                lead.stage.as_str(),
                format_ts(&lead.updated_at),
                serde_json::to_string(&lead.notes).context("Failed to encode notes")?,
                lead.last_contact.as_ref().map(format_ts),
                id,
            ],
        )
        .context("Failed to update lead")?;

        tx.commit().context("Failed to commit lead update")?;
        self.get_lead(id)?
            .context("Lead not found after update")
            .map(Some)
    }

    pub fn delete_lead(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM leads WHERE id = ?1", params![id])
            .context("Failed to delete lead")?;
        Ok(count > 0)
    }

    // ── Health ────────────────────────────────────────────────────────

    pub fn table_exists(&self) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'leads'",
                [],
                |row| row.get(0),
            )
            .context("Failed to inspect sqlite_master")
    }

    pub fn lead_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))
            .context("Failed to count leads")?;
        Ok(count as usize)
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{}'", raw))
}

/// Intermediate row struct for leads; enum and timestamp columns are raw text.
struct LeadRow {
    id: String,
    name: String,
    company: String,
    email: String,
    phone: String,
    product: String,
    brand: String,
    volume: String,
    packaging: String,
    message: Option<String>,
    estimated_investment: Option<String>,
    stage: String,
    created_at: String,
    updated_at: String,
    notes: String,
    last_contact: Option<String>,
}

impl LeadRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            company: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            product: row.get(5)?,
            brand: row.get(6)?,
            volume: row.get(7)?,
            packaging: row.get(8)?,
            message: row.get(9)?,
            estimated_investment: row.get(10)?,
            stage: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            notes: row.get(14)?,
            last_contact: row.get(15)?,
        })
    }

    fn into_lead(self) -> Result<Lead> {
        let stage = LeadStage::from_str(&self.stage)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse lead stage")?;
        let product = ProductType::from_str(&self.product)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse lead product")?;
        let brand = BrandOwnership::from_str(&self.brand)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse lead brand")?;
        let volume = VolumeBucket::from_str(&self.volume)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse lead volume")?;
        let packaging = PackagingType::from_str(&self.packaging)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse lead packaging")?;
        let notes: Vec<String> =
            serde_json::from_str(&self.notes).context("Failed to parse lead notes JSON")?;
        let last_contact = match self.last_contact {
            Some(ref raw) => Some(parse_ts(raw)?),
            None => None,
        };

        Ok(Lead {
            id: self.id,
            name: self.name,
            company: self.company,
            email: self.email,
            phone: self.phone,
            product,
            brand,
            volume,
            packaging,
            message: self.message,
            estimated_investment: self.estimated_investment,
            stage,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            notes,
            last_contact,
        })
    }
}
