//! Database setup and health commands — `leadboard init-db`, `leadboard check-db`.

use std::path::Path;

use anyhow::{Context, Result};

use leadboard::crm::db::LeadDb;
use leadboard::crm::store::{LeadStore, SqliteLeadStore};

pub fn cmd_init_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    LeadDb::new(db_path)?;
    println!("Lead database initialized at {}", db_path.display());
    Ok(())
}

pub async fn cmd_check_db(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        anyhow::bail!(
            "No database at {}. Run 'leadboard init-db' first.",
            db_path.display()
        );
    }

    let store = SqliteLeadStore::open(db_path)?;
    let status = store.check().await?;

    println!("Database: {}", db_path.display());
    if status.connected {
        println!("  {}", console::style("Connected").green());
    }
    if status.table_exists {
        println!("  Table exists with {} leads", status.lead_count);
    } else {
        println!(
            "  {}",
            console::style("Connected, but the leads table does not exist").yellow()
        );
    }
    println!("  Checked at {}", status.timestamp.to_rfc3339());
    Ok(())
}
