//! Board commands — `leadboard stages`, `leadboard board`, `leadboard move`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::Style;

use leadboard::crm::board::{BoardController, BoardNotice, DropOutcome, IgnoreReason, NoticeLevel};
use leadboard::crm::client::HttpLeadStore;
use leadboard::crm::stages::{StageColor, list_stages, stage_info};
use leadboard::crm::store::{LeadStore, SqliteLeadStore};

/// Remote store when `api` is given, otherwise the local SQLite database.
pub fn open_store(api: Option<&str>, db_path: &Path) -> Result<Arc<dyn LeadStore>> {
    match api {
        Some(url) => {
            tracing::debug!(url, "using remote lead store");
            Ok(Arc::new(HttpLeadStore::new(url)))
        }
        None => {
            if !db_path.exists() {
                anyhow::bail!(
                    "No database at {}. Run 'leadboard init-db' first or pass --api.",
                    db_path.display()
                );
            }
            Ok(Arc::new(SqliteLeadStore::open(db_path)?))
        }
    }
}

fn stage_style(color: StageColor) -> Style {
    let style = Style::new().bold();
    match color {
        StageColor::Blue => style.blue(),
        StageColor::Yellow => style.yellow(),
        // No orange in the 8-color palette.
        StageColor::Orange => style.color256(208),
        StageColor::Purple => style.magenta(),
        StageColor::Green => style.green(),
        StageColor::Red => style.red(),
    }
}

pub fn cmd_stages() {
    for (i, stage) in list_stages().iter().enumerate() {
        println!(
            "{}. {} ({}) [{}]",
            i + 1,
            stage_style(stage.color).apply_to(stage.label),
            stage.id,
            stage.color.as_str()
        );
    }
}

pub async fn cmd_board(store: Arc<dyn LeadStore>) -> Result<()> {
    let mut board = BoardController::new(store);
    board.load().await?;
    let view = board.board();

    for column in &view.columns {
        println!(
            "{} {}",
            stage_style(column.color).apply_to(&column.label),
            console::style(format!("({})", column.count)).dim()
        );
        for lead in &column.leads {
            println!(
                "  {}  {} - {} <{}>",
                console::style(&lead.id).dim(),
                lead.company,
                lead.name,
                lead.email
            );
        }
        println!();
    }

    println!(
        "Total: {}  Ganados: {}  Conversión: {:.1}%",
        view.stats.total, view.stats.won, view.stats.conversion_rate
    );
    Ok(())
}

fn print_notice(notice: &BoardNotice) {
    match notice.level {
        NoticeLevel::Success => println!("{}", console::style(&notice.message).green()),
        NoticeLevel::Failure => eprintln!("{}", console::style(&notice.message).red()),
    }
}

/// Drag `lead_id` onto the `stage` column.
pub async fn cmd_move(store: Arc<dyn LeadStore>, lead_id: &str, stage: &str) -> Result<()> {
    let mut board = BoardController::new(store);
    let mut notices = board.subscribe();
    board.load().await?;

    if !board.start_drag(lead_id) {
        anyhow::bail!("Lead {} not found", lead_id);
    }
    let outcome = board.end_drag(Some(stage)).await;

    while let Ok(notice) = notices.try_recv() {
        print_notice(&notice);
    }

    match outcome {
        DropOutcome::Moved(lead) => {
            let info = stage_info(lead.stage);
            println!(
                "{} -> {}",
                lead.company,
                stage_style(info.color).apply_to(info.label)
            );
            Ok(())
        }
        DropOutcome::Ignored(IgnoreReason::SameStage) => {
            println!("Lead {} is already in {}", lead_id, stage);
            Ok(())
        }
        DropOutcome::Ignored(IgnoreReason::InvalidTarget(target)) => {
            let valid: Vec<&str> = list_stages().iter().map(|s| s.id.as_str()).collect();
            anyhow::bail!(
                "Unknown stage '{}'. Valid stages: {}",
                target,
                valid.join(", ")
            )
        }
        DropOutcome::Ignored(reason) => anyhow::bail!("Move ignored: {:?}", reason),
        DropOutcome::Failed(e) => Err(e.into()),
    }
}
