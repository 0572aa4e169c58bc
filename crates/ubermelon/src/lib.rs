//! UberMelon - the most loved melons on the internet.
//!
//! A tiny axum application with four routes:
//! - `GET /`: ask the visitor for a name (or skip ahead if we already know it)
//! - `GET /get-name`: remember the visitor name in the session
//! - `GET /top-melons`: greet the visitor and list the melons with their love counts
//! - `POST /love-melon`: add one love to a melon
//!
//! All mutable state lives in an [`AppState`] built per server instance, so two
//! servers in the same process never see each other's melons or sessions.

pub mod error;
pub mod pages;
pub mod routes;
pub mod session;
pub mod store;
pub mod telemetry;

pub use error::{AppError, Result};
pub use routes::{build_router, serve, AppConfig, AppState};
pub use session::{SessionId, SessionStore, VisitorSession, SESSION_COOKIE};
pub use store::{MelonRecord, MelonStore};
pub use telemetry::init_tracing;

/// UberMelon version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
