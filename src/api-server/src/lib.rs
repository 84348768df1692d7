//! REST API boundary for the authorization policy engine
//!
//! Exposes the staged-apply protocol, the decision debug endpoint, the
//! protected-access check with structured denial payloads, and the access
//! request workflow over HTTP. Business modules consume only this contract;
//! rule kinds and effects travel as wire strings (`"p"`/`"g"`,
//! `"allow"`/`"deny"`) and become closed enums at this layer.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::create_router;
pub use server::{run, ServerConfig};
pub use state::AppState;
