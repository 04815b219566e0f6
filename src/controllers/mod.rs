pub mod themes;
pub mod domes;
pub mod shows;
pub mod sessions;
pub mod reservations;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(themes::routes())
        .merge(domes::routes())
        .merge(shows::routes())
        .merge(sessions::routes())
        .merge(reservations::routes())
}
