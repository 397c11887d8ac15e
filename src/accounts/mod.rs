use axum::Router;

use crate::state::AppState;

mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
