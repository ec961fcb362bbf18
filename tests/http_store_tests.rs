//! `HttpLeadStore` against a live router on an ephemeral port.

use std::sync::Arc;

use leadboard::config::MailConfig;
use leadboard::crm::api::AppState;
use leadboard::crm::board::{BoardController, DropOutcome};
use leadboard::crm::client::HttpLeadStore;
use leadboard::crm::contact::LogMailer;
use leadboard::crm::models::*;
use leadboard::crm::server::build_router;
use leadboard::crm::store::{LeadStore, MemoryLeadStore};
use leadboard::errors::StoreError;

async fn spawn_server() -> (String, MemoryLeadStore) {
    let backing = MemoryLeadStore::new();
    let state = Arc::new(AppState {
        store: Arc::new(backing.clone()),
        mailer: Arc::new(LogMailer),
        mail: MailConfig::default(),
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), backing)
}

fn new_lead(company: &str) -> NewLead {
    NewLead {
        name: "Juan Pérez".into(),
        company: company.to_string(),
        email: "juan@example.com".into(),
        phone: "+54 11 1234-5678".into(),
        product: ProductType::Alfajores,
        brand: BrandOwnership::Yes,
        volume: VolumeBucket::Over5000,
        packaging: PackagingType::CustomFlowpack,
        message: Some("Consulta por alfajores triples".into()),
        estimated_investment: Some("$12.000.000".into()),
    }
}

#[tokio::test]
async fn create_fetch_update_delete_roundtrip() {
    let (url, backing) = spawn_server().await;
    let store = HttpLeadStore::new(&url);

    let created = store.create_lead(new_lead("Norte")).await.unwrap();
    assert_eq!(created.stage, LeadStage::Intake);
    assert_eq!(created.message.as_deref(), Some("Consulta por alfajores triples"));

    let fetched = store.fetch_leads().await.unwrap();
    assert_eq!(fetched, vec![created.clone()]);
    assert_eq!(backing.fetch_leads().await.unwrap(), fetched);

    let moved = store
        .update_lead(&created.id, LeadUpdate::stage(LeadStage::FirstCall))
        .await
        .unwrap();
    assert_eq!(moved.stage, LeadStage::FirstCall);
    assert!(moved.updated_at > created.updated_at);

    let noted = store
        .append_note(&created.id, "Llamar el lunes".into())
        .await
        .unwrap();
    assert_eq!(noted.notes, vec!["Llamar el lunes"]);

    assert_eq!(
        store.get_lead(&created.id).await.unwrap().unwrap().notes,
        vec!["Llamar el lunes"]
    );
    assert!(store.delete_lead(&created.id).await.unwrap());
    assert!(!store.delete_lead(&created.id).await.unwrap());
    assert!(store.get_lead(&created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn errors_map_to_store_errors() {
    let (url, _backing) = spawn_server().await;
    let store = HttpLeadStore::new(&url);

    let err = store
        .update_lead("missing", LeadUpdate::stage(LeadStage::Won))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let lead = store.create_lead(new_lead("Sur")).await.unwrap();
    let err = store
        .append_note(&lead.id, "   ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
    assert_eq!(err.to_string(), "Invalid note: is required");
}

#[tokio::test]
async fn check_reports_remote_count() {
    let (url, backing) = spawn_server().await;
    backing.create_lead(new_lead("A")).await.unwrap();
    let status = HttpLeadStore::new(&url).check().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.lead_count, 1);
}

#[tokio::test]
async fn ensure_schema_over_http() {
    let (url, backing) = spawn_server().await;
    backing.create_lead(new_lead("A")).await.unwrap();
    HttpLeadStore::new(&url).ensure_schema().await.unwrap();
    assert_eq!(backing.fetch_leads().await.unwrap().len(), 1);
}

#[tokio::test]
async fn board_controller_drives_remote_store() {
    let (url, backing) = spawn_server().await;
    let lead = backing.create_lead(new_lead("Norte")).await.unwrap();

    let mut board = BoardController::new(Arc::new(HttpLeadStore::new(&url)));
    board.load().await.unwrap();
    board.start_drag(&lead.id);
    let outcome = board.end_drag(Some("negociacion")).await;
    assert!(matches!(outcome, DropOutcome::Moved(_)));

    let remote = backing.get_lead(&lead.id).await.unwrap().unwrap();
    assert_eq!(remote.stage, LeadStage::Negotiation);
    assert_eq!(board.leads()[0], remote);
}
