//! HTTP surface: health, room lookup and the WebSocket upgrade route.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{HealthResponse, RoomResponse};
pub use routes::create_router;
pub use state::AppState;
