//! The `LeadStore` seam and its local implementations.
//!
//! The board controller and the REST handlers only ever talk to a
//! `LeadStore`; they never hold on to a concrete collection. Three backends
//! implement it:
//!
//! | Backend           | Where it lives    | Used by                          |
//! |-------------------|-------------------|----------------------------------|
//! | `SqliteLeadStore` | this module       | `serve`, CLI commands            |
//! | `MemoryLeadStore` | this module       | `serve --in-memory`, tests       |
//! | `HttpLeadStore`   | `crm::client`     | CLI commands with `--api`        |
//!
//! Concurrent updates to the same lead are last-write-wins; there is no
//! version token.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::db::{DbHandle, LeadDb};
use super::models::*;
use crate::errors::StoreError;

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Full snapshot, newest first.
    async fn fetch_leads(&self) -> Result<Vec<Lead>, StoreError>;

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StoreError>;

    /// Persist a new lead in the first pipeline stage with a fresh id and timestamps.
    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError>;

    /// Apply a partial update and return the stored lead.
    async fn update_lead(&self, id: &str, update: LeadUpdate) -> Result<Lead, StoreError>;

    async fn delete_lead(&self, id: &str) -> Result<bool, StoreError>;

    async fn check(&self) -> Result<StoreStatus, StoreError>;

    /// Create the backing schema if missing. Idempotent; a no-op for
    /// backends without one.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Append a note and stamp `last_contact`. The read of the current notes
    /// and the write happen as one step, so concurrent appends are all kept.
    async fn append_note(&self, id: &str, note: String) -> Result<Lead, StoreError>;
}

/// Trim a note and reject it when nothing is left.
pub fn normalize_note(note: &str) -> Result<String, StoreError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(StoreError::validation("note", "is required"));
    }
    Ok(note.to_string())
}

// ── SQLite ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SqliteLeadStore {
    db: DbHandle,
}

impl SqliteLeadStore {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
        Ok(Self::new(DbHandle::new(LeadDb::new(path)?)))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(DbHandle::new(LeadDb::new_in_memory()?)))
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn fetch_leads(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(self.db.call(|db| db.list_leads()).await?)
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        let id = id.to_string();
        Ok(self.db.call(move |db| db.get_lead(&id)).await?)
    }

    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError> {
        let lead = self.db.call(move |db| db.create_lead(&new)).await?;
        tracing::info!(lead_id = %lead.id, company = %lead.company, "lead created");
        Ok(lead)
    }

    async fn update_lead(&self, id: &str, update: LeadUpdate) -> Result<Lead, StoreError> {
        let owned_id = id.to_string();
        let updated = self
            .db
            .call(move |db| db.update_lead(&owned_id, &update))
            .await?;
        updated.ok_or_else(|| StoreError::not_found(id))
    }

    async fn delete_lead(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        Ok(self.db.call(move |db| db.delete_lead(&id)).await?)
    }

    async fn check(&self) -> Result<StoreStatus, StoreError> {
        let (table_exists, lead_count) = self
            .db
            .call(|db| {
                let exists = db.table_exists()?;
                let count = if exists { db.lead_count()? } else { 0 };
                Ok((exists, count))
            })
            .await?;
        Ok(StoreStatus {
            connected: true,
            table_exists,
            lead_count,
            timestamp: now_micros(),
        })
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.db.call(|db| db.migrate()).await?;
        tracing::info!("lead schema ensured");
        Ok(())
    }

    async fn append_note(&self, id: &str, note: String) -> Result<Lead, StoreError> {
        let note = normalize_note(&note)?;
        let owned_id = id.to_string();
        let updated = self
            .db
            .call(move |db| db.append_note(&owned_id, &note))
            .await?;
        updated.ok_or_else(|| StoreError::not_found(id))
    }
}

// ── In-memory ─────────────────────────────────────────────────────────

/// Lead collection held in process memory. Each instance is independent;
/// nothing is shared through globals.
#[derive(Clone, Default)]
pub struct MemoryLeadStore {
    leads: Arc<RwLock<Vec<Lead>>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, e.g. a fixture board.
    pub fn with_leads(leads: Vec<Lead>) -> Self {
        Self {
            leads: Arc::new(RwLock::new(leads)),
        }
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn fetch_leads(&self) -> Result<Vec<Lead>, StoreError> {
        let mut leads = self.leads.read().await.clone();
        // Reversed first so the stable sort keeps later inserts ahead on equal timestamps.
        leads.reverse();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError> {
        let lead = Lead::from_new(uuid::Uuid::new_v4().to_string(), new, now_micros());
        self.leads.write().await.push(lead.clone());
        tracing::info!(lead_id = %lead.id, company = %lead.company, "lead created");
        Ok(lead)
    }

    async fn update_lead(&self, id: &str, update: LeadUpdate) -> Result<Lead, StoreError> {
        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;
        if !update.is_empty() {
            update.apply_to(lead);
            lead.touch();
        }
        Ok(lead.clone())
    }

    async fn delete_lead(&self, id: &str) -> Result<bool, StoreError> {
        let mut leads = self.leads.write().await;
        let before = leads.len();
        leads.retain(|l| l.id != id);
        Ok(leads.len() < before)
    }

    async fn check(&self) -> Result<StoreStatus, StoreError> {
        Ok(StoreStatus {
            connected: true,
            table_exists: true,
            lead_count: self.leads.read().await.len(),
            timestamp: now_micros(),
        })
    }

    async fn append_note(&self, id: &str, note: String) -> Result<Lead, StoreError> {
        let note = normalize_note(&note)?;
        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;
        lead.notes.push(note);
        lead.last_contact = Some(now_micros());
        lead.touch();
        Ok(lead.clone())
    }
}
