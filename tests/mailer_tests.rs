//! `ResendMailer` against a local stand-in for the Resend API.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use leadboard::config::MailConfig;
use leadboard::crm::api::AppState;
use leadboard::crm::contact::{ContactEmail, Mailer, ResendMailer};
use leadboard::crm::server::build_router;
use leadboard::crm::store::{LeadStore, MemoryLeadStore};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn accept_email(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.requests.lock().unwrap().push((auth, body));
    Json(json!({ "id": "email-1" }))
}

async fn reject_email() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": "The from address is not verified" })),
    )
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_resend() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/emails", post(accept_email))
        .with_state(captured.clone());
    (spawn(app).await, captured)
}

fn email() -> ContactEmail {
    ContactEmail {
        from: "onboarding@resend.dev".into(),
        to: "ventas@example.com".into(),
        reply_to: "juan@example.com".into(),
        subject: "Nueva consulta de cotización - Norte".into(),
        body: "Datos del Cliente\n".into(),
    }
}

#[tokio::test]
async fn posts_email_with_bearer_key() {
    let (url, captured) = spawn_resend().await;
    let mailer = ResendMailer::new(&url, "re_test_123");
    mailer.send(&email()).await.unwrap();

    let requests = captured.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer re_test_123"));
    assert_eq!(
        body,
        &json!({
            "from": "onboarding@resend.dev",
            "to": ["ventas@example.com"],
            "reply_to": "juan@example.com",
            "subject": "Nueva consulta de cotización - Norte",
            "text": "Datos del Cliente\n",
        })
    );
}

#[tokio::test]
async fn rejected_email_is_an_error() {
    let url = spawn(Router::new().route("/emails", post(reject_email))).await;
    let err = ResendMailer::new(&url, "re_test_123")
        .send(&email())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("422"), "{message}");
    assert!(message.contains("not verified"), "{message}");
}

#[tokio::test]
async fn contact_form_delivers_through_resend() {
    let (resend_url, captured) = spawn_resend().await;
    let mail = MailConfig {
        api_url: resend_url,
        api_key: Some("re_test_123".into()),
        ..MailConfig::default()
    };
    let store = MemoryLeadStore::new();
    let state = Arc::new(AppState {
        store: Arc::new(store.clone()),
        mailer: Arc::new(ResendMailer::from_config(&mail).unwrap()),
        mail,
    });
    let app_url = spawn(build_router(state)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/contact", app_url))
        .json(&json!({
            "name": "Juan Pérez",
            "company": "Norte",
            "email": "juan@example.com",
            "phone": "+54 11 1234-5678",
            "product": "alfajores",
            "brand": "si",
            "volume": "mas-5000",
            "packaging": "a-granel"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["notified"], true);

    let leads = store.fetch_leads().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(body["leadId"], leads[0].id.as_str());

    let requests = captured.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0].1;
    assert_eq!(sent["to"], json!(["contacto@fasonpro.com.ar"]));
    assert_eq!(sent["reply_to"], "juan@example.com");
    assert_eq!(sent["subject"], "Nueva consulta de cotización - Norte");
    assert!(sent["text"].as_str().unwrap().contains("Tipo de producto: Alfajores"));
}
