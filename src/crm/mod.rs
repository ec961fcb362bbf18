//! Lead pipeline CRM: storage, board state, and the HTTP back-end.
//!
//! ## Overview
//!
//! Quote requests arrive through the landing-page contact form, become
//! leads in the first pipeline stage, and are moved across a six-column
//! Kanban board until they are won or lost.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │ Browser  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ / CLI    │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘          │         │                                        │
//!                       │         │ LeadStore::update_lead()               │
//!                       │         v                                        │
//!                       │  store.rs  (LeadStore trait, Sqlite / Memory)    │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  db.rs     (LeadDb, DbHandle)                    │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `models`   | `Lead`, `LeadStage`, closed enums, payloads, views      |
//! | `stages`   | Ordered stage list with labels and colors               |
//! | `board`    | `BoardController` drag state machine and partition      |
//! | `client`   | `HttpLeadStore`: `LeadStore` over the REST API          |
//! | `contact`  | Contact-form email rendering, `Mailer` trait            |
//! | `embedded` | Landing page assets compiled in with `rust-embed`       |
//!
//! ## Typical Flow (drag a card to "Ganado")
//!
//! 1. `BoardController::start_drag(id)` captures the lead for the overlay.
//! 2. `end_drag(Some("ganado"))` validates the target and skips drops on
//!    the lead's own column.
//! 3. One `LeadStore::update_lead(id, {stage})` call; locally that is
//!    `SqliteLeadStore`, remotely `HttpLeadStore` → `PUT /api/leads/{id}`.
//! 4. The returned lead replaces the old record and `board()` re-derives
//!    the columns. A failure leaves the list untouched and emits a notice.

pub mod api;
pub mod board;
pub mod client;
pub mod contact;
pub mod db;
pub mod embedded;
pub mod models;
pub mod server;
pub mod stages;
pub mod store;
