pub mod auth;
pub mod errors;
pub mod models;
pub mod routes;
pub mod state;

pub use errors::{ApiError, ErrorCode};
pub use models::*;
pub use routes::create_router;
pub use state::AppState;
