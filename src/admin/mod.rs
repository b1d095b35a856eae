mod dto;
pub mod handlers;
mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::dashboard_routes())
        .merge(handlers::user_routes())
        .merge(handlers::relationship_routes())
}
