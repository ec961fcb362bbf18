//! Board state controller.
//!
//! Owns the displayed lead list and the single active drag slot, and turns
//! drag gestures into `LeadStore::update_lead` calls. The column partition is
//! never stored: `board()` derives it from the list on every call, so the
//! columns only ever reflect confirmed store state.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use super::models::*;
use super::stages::{is_valid_stage, list_stages, parse_stage};
use super::store::LeadStore;
use crate::errors::StoreError;

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// User-visible message emitted after a store round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl BoardNotice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DragState {
    Idle,
    Dragging { lead: Lead },
}

/// Why a drop did not reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotDragging,
    NoTarget,
    InvalidTarget(String),
    SameStage,
}

#[derive(Debug)]
pub enum DropOutcome {
    Ignored(IgnoreReason),
    Moved(Lead),
    Failed(StoreError),
}

pub struct BoardController {
    store: Arc<dyn LeadStore>,
    leads: Vec<Lead>,
    drag: DragState,
    notices: broadcast::Sender<BoardNotice>,
}

impl BoardController {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            store,
            leads: Vec::new(),
            drag: DragState::Idle,
            notices,
        }
    }

    /// Replace the list with a fresh snapshot from the store.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        match self.store.fetch_leads().await {
            Ok(leads) => {
                tracing::debug!(count = leads.len(), "board loaded");
                self.leads = leads;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load leads");
                self.notify(BoardNotice::failure("Error al cargar los leads"));
                Err(e)
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardNotice> {
        self.notices.subscribe()
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn board(&self) -> BoardView {
        partition(&self.leads)
    }

    pub fn stats(&self) -> LeadStats {
        LeadStats::from_leads(&self.leads)
    }

    /// The lead captured by the current drag, for rendering an overlay.
    pub fn active_lead(&self) -> Option<&Lead> {
        match &self.drag {
            DragState::Dragging { lead } => Some(lead),
            DragState::Idle => None,
        }
    }

    /// Begin dragging `lead_id`. Returns false and stays idle if the id is
    /// not on the board.
    pub fn start_drag(&mut self, lead_id: &str) -> bool {
        match self.leads.iter().find(|l| l.id == lead_id) {
            Some(lead) => {
                tracing::debug!(lead_id, stage = %lead.stage, "drag started");
                self.drag = DragState::Dragging { lead: lead.clone() };
                true
            }
            None => {
                tracing::debug!(lead_id, "drag start on unknown lead");
                self.drag = DragState::Idle;
                false
            }
        }
    }

    /// Resolve the active drag against the drop target id, if any.
    ///
    /// The drag slot is cleared before anything else happens. At most one
    /// store call is made, and only for a valid stage different from the
    /// lead's current one.
    pub async fn end_drag(&mut self, over: Option<&str>) -> DropOutcome {
        let dragged = match std::mem::replace(&mut self.drag, DragState::Idle) {
            DragState::Dragging { lead } => lead,
            DragState::Idle => return DropOutcome::Ignored(IgnoreReason::NotDragging),
        };

        let Some(target) = over else {
            tracing::debug!(lead_id = %dragged.id, "drag abandoned without target");
            return DropOutcome::Ignored(IgnoreReason::NoTarget);
        };

        if !is_valid_stage(target) {
            tracing::debug!(lead_id = %dragged.id, drop_target = target, "drop on invalid stage ignored");
            return DropOutcome::Ignored(IgnoreReason::InvalidTarget(target.to_string()));
        }
        let stage = match parse_stage(target) {
            Ok(stage) => stage,
            Err(e) => return DropOutcome::Failed(e),
        };

        let current = self
            .leads
            .iter()
            .find(|l| l.id == dragged.id)
            .map(|l| l.stage)
            .unwrap_or(dragged.stage);
        if current == stage {
            return DropOutcome::Ignored(IgnoreReason::SameStage);
        }

        tracing::debug!(lead_id = %dragged.id, from = %current, to = %stage, "drop resolved");
        match self
            .update_lead(&dragged.id, LeadUpdate::stage(stage))
            .await
        {
            Ok(lead) => DropOutcome::Moved(lead),
            Err(e) => DropOutcome::Failed(e),
        }
    }

    /// Persist `update` and replace the matching record with the stored lead.
    /// On failure the list is left untouched and a failure notice is sent.
    pub async fn update_lead(&mut self, id: &str, update: LeadUpdate) -> Result<Lead, StoreError> {
        match self.store.update_lead(id, update).await {
            Ok(lead) => {
                if let Some(slot) = self.leads.iter_mut().find(|l| l.id == lead.id) {
                    *slot = lead.clone();
                }
                self.notify(BoardNotice::success("Lead actualizado correctamente"));
                Ok(lead)
            }
            Err(e) => {
                tracing::warn!(lead_id = id, error = %e, "lead update failed");
                self.notify(BoardNotice::failure("Error al actualizar el lead"));
                Err(e)
            }
        }
    }

    pub async fn create_lead(&mut self, new: NewLead) -> Result<Lead, StoreError> {
        match self.store.create_lead(new).await {
            Ok(lead) => {
                self.leads.insert(0, lead.clone());
                self.notify(BoardNotice::success(format!(
                    "Lead \"{}\" creado correctamente",
                    lead.name
                )));
                Ok(lead)
            }
            Err(e) => {
                self.notify(BoardNotice::failure(format!(
                    "Error al crear el lead: {}",
                    e
                )));
                Err(e)
            }
        }
    }

    pub async fn delete_lead(&mut self, id: &str) -> Result<bool, StoreError> {
        match self.store.delete_lead(id).await {
            Ok(removed) => {
                if removed {
                    self.leads.retain(|l| l.id != id);
                    if self.active_lead().is_some_and(|l| l.id == id) {
                        self.drag = DragState::Idle;
                    }
                    self.notify(BoardNotice::success("Lead eliminado correctamente"));
                }
                Ok(removed)
            }
            Err(e) => {
                self.notify(BoardNotice::failure("Error al eliminar el lead"));
                Err(e)
            }
        }
    }

    fn notify(&self, notice: BoardNotice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}

/// Group leads into one column per stage, in pipeline order. Each lead lands
/// in exactly one column and keeps its relative order from `leads`.
pub fn partition(leads: &[Lead]) -> BoardView {
    let columns = list_stages()
        .iter()
        .map(|info| {
            let in_stage: Vec<Lead> = leads
                .iter()
                .filter(|l| l.stage == info.id)
                .cloned()
                .collect();
            ColumnView {
                stage: info.id,
                label: info.label.to_string(),
                color: info.color,
                count: in_stage.len(),
                leads: in_stage,
            }
        })
        .collect();
    BoardView {
        columns,
        stats: LeadStats::from_leads(leads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::store::MemoryLeadStore;

    fn lead(id: &str, stage: LeadStage) -> Lead {
        let mut lead = Lead::from_new(
            id.to_string(),
            NewLead {
                name: format!("Contacto {id}"),
                company: format!("Empresa {id}"),
                email: format!("contacto{id}@empresa.com"),
                phone: "+54 11 5555-0000".into(),
                product: ProductType::Alfajores,
                brand: BrandOwnership::Yes,
                volume: VolumeBucket::From1000To5000,
                packaging: PackagingType::CustomFlowpack,
                message: None,
                estimated_investment: None,
            },
            now_micros(),
        );
        lead.stage = stage;
        lead
    }

    async fn controller(leads: Vec<Lead>) -> BoardController {
        let store = Arc::new(MemoryLeadStore::with_leads(leads));
        let mut board = BoardController::new(store);
        board.load().await.unwrap();
        board
    }

    fn column_ids(view: &BoardView, stage: LeadStage) -> Vec<String> {
        view.columns
            .iter()
            .find(|c| c.stage == stage)
            .map(|c| c.leads.iter().map(|l| l.id.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_partition_covers_every_lead_once() {
        let leads = vec![
            lead("1", LeadStage::Intake),
            lead("2", LeadStage::Won),
            lead("3", LeadStage::Intake),
            lead("4", LeadStage::Lost),
        ];
        let view = partition(&leads);
        assert_eq!(view.columns.len(), 6);

        let mut seen: Vec<String> = view
            .columns
            .iter()
            .flat_map(|c| c.leads.iter().map(|l| l.id.clone()))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["1", "2", "3", "4"]);

        assert_eq!(column_ids(&view, LeadStage::Intake), vec!["1", "3"]);
        let intake = &view.columns[0];
        assert_eq!(intake.count, 2);
        assert_eq!(intake.label, "Entrante");
        assert_eq!(view.stats.total, 4);
        assert_eq!(view.stats.won, 1);
        assert_eq!(view.stats.conversion_rate, 25.0);
    }

    #[test]
    fn test_partition_empty_board() {
        let view = partition(&[]);
        assert!(view.columns.iter().all(|c| c.count == 0));
        assert_eq!(view.stats.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn test_start_drag_captures_active_lead() {
        let mut board = controller(vec![lead("1", LeadStage::Intake)]).await;
        assert!(board.active_lead().is_none());
        assert!(board.start_drag("1"));
        assert_eq!(board.active_lead().map(|l| l.id.as_str()), Some("1"));
    }

    #[tokio::test]
    async fn test_start_drag_unknown_lead_stays_idle() {
        let mut board = controller(vec![lead("1", LeadStage::Intake)]).await;
        assert!(!board.start_drag("nope"));
        assert!(board.active_lead().is_none());
    }

    #[tokio::test]
    async fn test_end_drag_while_idle_is_ignored() {
        let mut board = controller(vec![lead("1", LeadStage::Intake)]).await;
        let outcome = board.end_drag(Some("ganado")).await;
        assert!(matches!(
            outcome,
            DropOutcome::Ignored(IgnoreReason::NotDragging)
        ));
        assert_eq!(board.leads()[0].stage, LeadStage::Intake);
    }

    #[tokio::test]
    async fn test_drop_without_target_clears_drag() {
        let mut board = controller(vec![lead("1", LeadStage::Intake)]).await;
        let before = board.leads().to_vec();
        board.start_drag("1");
        let outcome = board.end_drag(None).await;
        assert!(matches!(outcome, DropOutcome::Ignored(IgnoreReason::NoTarget)));
        assert!(board.active_lead().is_none());
        assert_eq!(board.leads(), before.as_slice());
    }

    #[tokio::test]
    async fn test_drop_on_invalid_target() {
        let mut board = controller(vec![lead("1", LeadStage::Intake)]).await;
        let before = board.leads().to_vec();
        board.start_drag("1");
        // Dropping onto another card reports the card id as the target.
        let outcome = board.end_drag(Some("2")).await;
        match outcome {
            DropOutcome::Ignored(IgnoreReason::InvalidTarget(target)) => assert_eq!(target, "2"),
            other => panic!("Expected InvalidTarget, got {:?}", other),
        }
        assert_eq!(board.leads(), before.as_slice());
    }

    #[tokio::test]
    async fn test_drop_on_own_column_is_noop() {
        let mut board = controller(vec![lead("1", LeadStage::FollowUp)]).await;
        let before = board.leads().to_vec();
        board.start_drag("1");
        let outcome = board.end_drag(Some("seguimiento")).await;
        assert!(matches!(outcome, DropOutcome::Ignored(IgnoreReason::SameStage)));
        assert_eq!(board.leads(), before.as_slice());
    }

    #[tokio::test]
    async fn test_drop_moves_lead_and_notifies() {
        let mut board = controller(vec![
            lead("1", LeadStage::Intake),
            lead("2", LeadStage::Intake),
        ])
        .await;
        let mut notices = board.subscribe();

        board.start_drag("1");
        let outcome = board.end_drag(Some("ganado")).await;
        let moved = match outcome {
            DropOutcome::Moved(lead) => lead,
            other => panic!("Expected Moved, got {:?}", other),
        };
        assert_eq!(moved.stage, LeadStage::Won);

        let view = board.board();
        assert_eq!(column_ids(&view, LeadStage::Won), vec!["1"]);
        assert_eq!(column_ids(&view, LeadStage::Intake), vec!["2"]);
        assert_eq!(board.stats().won, 1);

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_update_unknown_lead_leaves_list_and_notifies_failure() {
        let mut board = controller(vec![lead("1", LeadStage::Intake)]).await;
        let mut notices = board.subscribe();
        let before = board.leads().to_vec();

        let err = board
            .update_lead("missing", LeadUpdate::stage(LeadStage::Won))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(board.leads(), before.as_slice());
        assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Failure);
    }

    #[tokio::test]
    async fn test_create_and_delete_keep_partition() {
        let mut board = controller(vec![lead("1", LeadStage::Negotiation)]).await;
        let created = board
            .create_lead(NewLead {
                name: "Ana".into(),
                company: "Dulces Ana".into(),
                email: "ana@dulces.com".into(),
                phone: "+54 11 4444-0000".into(),
                product: ProductType::Galletitas,
                brand: BrandOwnership::No,
                volume: VolumeBucket::Over5000,
                packaging: PackagingType::ClearFlowpack,
                message: None,
                estimated_investment: None,
            })
            .await
            .unwrap();
        assert_eq!(board.leads()[0].id, created.id);
        assert_eq!(column_ids(&board.board(), LeadStage::Intake), vec![created.id.clone()]);

        board.start_drag("1");
        assert!(board.delete_lead("1").await.unwrap());
        assert!(board.active_lead().is_none());
        assert_eq!(board.leads().len(), 1);
        assert!(!board.delete_lead("1").await.unwrap());
    }
}
