use crate::state::AppState;
use axum::Router;

mod dto;
pub mod errors;
pub mod handlers;
mod pages;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
