//! Read access to stored service aggregates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ServiceId;
use domain::Service;
use fsm::{FsmError, ServiceRepository};
use service_store::ServiceStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ServiceStore> {
    pub repository: ServiceRepository<S>,
}

impl<S: ServiceStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            repository: ServiceRepository::new(store),
        }
    }
}

/// GET /services/{id}: the stored aggregate as the FSM sees it.
#[tracing::instrument(skip(state))]
pub async fn get<S: ServiceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Service>, ApiError> {
    let id = ServiceId::new(id);
    let service = state
        .repository
        .load(&id)
        .await?
        .ok_or(FsmError::ServiceNotFound(id))?;
    Ok(Json(service))
}
