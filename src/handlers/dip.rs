use super::common::{
    created_response, no_content_response, optional_order_month, parse_iso_date,
    success_response, validate_input,
};
use crate::{
    entities::{dip_group, dip_history, HistoryType},
    errors::ServiceError,
    models::OrderMonth,
    services::dip::{DipGroupView, NewDipGroup, NewDipHistory, ProductionModel},
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

pub fn dip_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:id", delete(delete_group))
        .route("/groups/:id/complete", post(complete_group))
        .route("/production-models", get(production_models))
        .route("/records", post(add_record))
        .route("/records/:id", put(update_record).delete(delete_record))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(length(min = 1, max = 20))]
    pub lot: String,
    pub year: i32,
    #[serde(deserialize_with = "required_order_month")]
    #[schema(value_type = i32, example = 11)]
    pub month: OrderMonth,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddRecordRequest {
    pub group_id: i32,
    #[schema(example = "2025-11-03")]
    pub date: String,
    #[serde(rename = "type")]
    pub kind: HistoryType,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRecordRequest {
    pub date: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

fn required_order_month<'de, D>(deserializer: D) -> Result<OrderMonth, D::Error>
where
    D: serde::Deserializer<'de>,
{
    optional_order_month(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("month is required"))
}

/// DIP groups with their shipping and receiving histories
#[utoipa::path(
    get,
    path = "/api/v1/dip/groups",
    responses(
        (status = 200, description = "All DIP groups", body = ApiResponse<Vec<DipGroupView>>)
    ),
    tag = "dip"
)]
pub async fn list_groups(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DipGroupView>>>, ServiceError> {
    let groups = state.services.dip.list_groups().await?;
    Ok(Json(ApiResponse::success(groups)))
}

/// Lots with recorded production around the current month
#[utoipa::path(
    get,
    path = "/api/v1/dip/production-models",
    responses(
        (status = 200, description = "Production-completed lots", body = ApiResponse<Vec<ProductionModel>>)
    ),
    tag = "dip"
)]
pub async fn production_models(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductionModel>>>, ServiceError> {
    let today = Local::now().date_naive();
    let models = state.services.dip.production_models(today).await?;
    Ok(Json(ApiResponse::success(models)))
}

/// Open a DIP group for a lot
#[utoipa::path(
    post,
    path = "/api/v1/dip/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = ApiResponse<dip_group::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Group already exists for the lot", body = crate::errors::ErrorResponse)
    ),
    tag = "dip"
)]
pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let group = state
        .services
        .dip
        .create_group(NewDipGroup {
            model: request.model,
            lot: request.lot,
            year: request.year,
            month: request.month,
        })
        .await?;
    Ok(created_response(group))
}

/// Delete a group and its histories
#[utoipa::path(
    delete,
    path = "/api/v1/dip/groups/{id}",
    params(("id" = i32, Path, description = "DIP group id")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dip"
)]
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.dip.delete_group(id).await?;
    Ok(no_content_response())
}

/// Mark shipping for a group as finished
#[utoipa::path(
    post,
    path = "/api/v1/dip/groups/{id}/complete",
    params(("id" = i32, Path, description = "DIP group id")),
    responses(
        (status = 200, description = "Group completed", body = ApiResponse<dip_group::Model>),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dip"
)]
pub async fn complete_group(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let group = state.services.dip.complete_group(id).await?;
    Ok(success_response(group))
}

/// Record a shipment or receipt
#[utoipa::path(
    post,
    path = "/api/v1/dip/records",
    request_body = AddRecordRequest,
    responses(
        (status = 201, description = "History entry added", body = ApiResponse<dip_history::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dip"
)]
pub async fn add_record(
    State(state): State<AppState>,
    Json(request): Json<AddRecordRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let date = parse_iso_date("date", &request.date)?;
    let entry = state
        .services
        .dip
        .add_history(NewDipHistory {
            group_id: request.group_id,
            date,
            kind: request.kind,
            quantity: request.quantity,
        })
        .await?;
    Ok(created_response(entry))
}

/// Correct the date or quantity of a history entry
#[utoipa::path(
    put,
    path = "/api/v1/dip/records/{id}",
    params(("id" = i32, Path, description = "History entry id")),
    request_body = UpdateRecordRequest,
    responses(
        (status = 200, description = "History entry updated", body = ApiResponse<dip_history::Model>),
        (status = 404, description = "History entry not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dip"
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRecordRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let date = parse_iso_date("date", &request.date)?;
    let entry = state
        .services
        .dip
        .update_history(id, date, request.quantity)
        .await?;
    Ok(success_response(entry))
}

#[utoipa::path(
    delete,
    path = "/api/v1/dip/records/{id}",
    params(("id" = i32, Path, description = "History entry id")),
    responses(
        (status = 204, description = "History entry deleted"),
        (status = 404, description = "History entry not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dip"
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.dip.delete_history(id).await?;
    Ok(no_content_response())
}
