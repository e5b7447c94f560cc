use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::error::FacadeResult;
use crate::server::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/service-request/schema", get(service_request_schema))
        .route("/service-types", get(service_types))
        .route("/service-request", post(create_service_request))
        .route(
            "/collateral/collateralOverview/{location_id}",
            get(collateral_overview).patch(update_collateral_overview),
        )
        .route("/collateral/fields", get(collateral_fields))
}

async fn service_request_schema(State(state): State<AppState>) -> FacadeResult<Json<Value>> {
    state.facade.service_request_schema().await.map(Json)
}

async fn service_types(State(state): State<AppState>) -> FacadeResult<Json<Vec<String>>> {
    state.facade.service_types().await.map(Json)
}

async fn create_service_request(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> FacadeResult<Json<Value>> {
    state.facade.create_service_request(body).await.map(Json)
}

async fn collateral_overview(
    State(state): State<AppState>,
    Path(location_id): Path<u64>,
) -> FacadeResult<Json<Value>> {
    state.facade.collateral_overview(location_id).await.map(Json)
}

async fn update_collateral_overview(
    State(state): State<AppState>,
    Path(location_id): Path<u64>,
    Json(body): Json<Value>,
) -> FacadeResult<Json<Value>> {
    state.facade.update_collateral_overview(location_id, body).await.map(Json)
}

async fn collateral_fields(State(state): State<AppState>) -> FacadeResult<Json<Value>> {
    state.facade.collateral_fields().await.map(Json)
}
