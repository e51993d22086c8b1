//! HTTP layer: routes, extractors and error mapping

pub mod auth;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod teams;
pub mod types;

pub use middleware::RequireClaims;
pub use router::create_router;
pub use state::AppState;
