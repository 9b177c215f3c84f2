// Export route modules
pub mod api;
pub mod chat;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(api::routes())
        .merge(chat::routes(state))
}
