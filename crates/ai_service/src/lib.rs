//! Superfund AI Service
//!
//! Application layer between the HTTP gateway and the model crates:
//! - `store`: lazily loaded, atomically replaced model state
//! - `recommend`: risk filtering and ranking over the dataset
//! - `chat`: reply composition from recommendation and prediction outcomes
//! - `service`: the facade the gateway calls

pub mod chat;
pub mod config;
pub mod errors;
pub mod recommend;
pub mod service;
pub mod store;

pub use chat::{compose_reply, ChatRequest, Outcome, HELP_TEXT};
pub use config::ServiceConfig;
pub use errors::ServiceError;
pub use recommend::{recommend, RecommendColumns, Recommendation, TOP_N};
pub use service::AdvisorService;
pub use store::ModelStore;

/// Version of the service crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
