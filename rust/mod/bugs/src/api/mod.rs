mod bugs;

use std::sync::Arc;

use axum::Router;

use crate::store::BugStore;

/// Build the bug API router.
///
/// Routes are relative; the server nests them under `/api`.
/// - `POST   /bugs`       - create bug
/// - `GET    /bugs`       - list all bugs
/// - `PUT    /bugs/{id}`  - partial update
/// - `DELETE /bugs/{id}`  - delete bug
pub fn router(store: Arc<BugStore>) -> Router {
    bugs::router(store)
}
