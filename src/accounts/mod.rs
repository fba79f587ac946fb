use crate::state::AppState;
use axum::Router;

pub mod account;
pub(crate) mod dto;
pub mod handlers;
mod password;
pub mod store;
pub(crate) mod token;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::account_routes())
}
