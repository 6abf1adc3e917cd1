//! Queue backend HTTP API.
//!
//! Serves the routes the remote queue store talks to:
//! - `POST /api/submit`
//! - `GET /api/queue`
//! - `POST /api/complete/:id`
//! - `GET /api/health`
//!
//! The router is composable: `queue_api_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::queue_api_router;
pub use server::{start_api_server_on, ApiServer, ApiServerSession};
pub use types::ApiContext;
