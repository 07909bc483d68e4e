use super::common::{
    created_response, empty_string_as_none, optional_order_month, success_response,
    validate_input, DeletedCount,
};
use crate::{
    entities::TbType,
    errors::ServiceError,
    models::{LotQuantity, OrderMonth},
    services::production::{
        SaveWeekSummary, ScheduleInput, ScheduleUpdate, ScheduleView, WeekFilter, WeekKey,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, patch, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub fn production_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/schedules",
            get(list_schedules).post(save_schedules).delete(delete_schedules),
        )
        .route("/schedules/:id", put(update_schedule))
        .route("/schedules/:id/notes", patch(update_notes))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WeekQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub month: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub week_num: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekInfo {
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 1, max = 6))]
    pub week_num: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRowRequest {
    pub id: Option<i32>,
    #[validate(length(min = 1, max = 10))]
    pub line: String,
    pub company: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    pub order_year: Option<i32>,
    #[serde(default, deserialize_with = "optional_order_month")]
    #[schema(value_type = Option<String>, example = "11월분")]
    pub order_month: Option<OrderMonth>,
    pub tb: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lot_label")]
    #[schema(value_type = String, example = "50/100")]
    pub lot: LotQuantity,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveWeekRequest {
    #[validate]
    pub week_info: WeekInfo,
    #[validate]
    pub schedules: Vec<ScheduleRowRequest>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub company: Option<String>,
    pub model: Option<String>,
    pub order_year: Option<i32>,
    #[serde(default, deserialize_with = "optional_order_month")]
    #[schema(value_type = Option<String>)]
    pub order_month: Option<OrderMonth>,
    #[serde(default, deserialize_with = "optional_lot_label")]
    #[schema(value_type = Option<String>)]
    pub lot: Option<LotQuantity>,
    pub manager: Option<String>,
    pub tb: Option<String>,
    /// A number, a numeric string, or `""` for zero
    #[serde(default, deserialize_with = "actual_prod_value")]
    #[schema(value_type = Option<i32>)]
    pub actual_prod: Option<i32>,
    pub prod_start: Option<String>,
    pub prod_end: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotesRequest {
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseValue {
    Number(i64),
    Text(String),
}

fn lot_label<'de, D>(deserializer: D) -> Result<LotQuantity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_lot_label(deserializer)?.unwrap_or_default())
}

/// Lot strings arrive as `"50/100"`, `"100"` or a bare number.
fn optional_lot_label<'de, D>(deserializer: D) -> Result<Option<LotQuantity>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LooseValue>::deserialize(deserializer)? {
        None => None,
        Some(LooseValue::Number(n)) => Some(LotQuantity::parse(&n.to_string())),
        Some(LooseValue::Text(text)) => Some(LotQuantity::parse(&text)),
    })
}

fn actual_prod_value<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<LooseValue>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(LooseValue::Number(n)) => n,
        Some(LooseValue::Text(text)) if text.trim().is_empty() => 0,
        Some(LooseValue::Text(text)) => text.trim().parse::<i64>().map_err(|_| {
            serde::de::Error::custom(format!("actualProd '{}' is not a number", text))
        })?,
    };
    i32::try_from(value)
        .map(Some)
        .map_err(|_| serde::de::Error::custom("actualProd is out of range"))
}

fn parse_tb(raw: Option<&str>) -> Result<Option<TbType>, ServiceError> {
    match raw {
        None => Ok(None),
        Some(label) => TbType::parse_label(label).map_err(ServiceError::ValidationError),
    }
}

fn blank_as_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ScheduleRowRequest {
    fn into_input(self) -> Result<ScheduleInput, ServiceError> {
        let tb = parse_tb(self.tb.as_deref())?;
        Ok(ScheduleInput {
            id: self.id,
            line: self.line.trim().to_string(),
            company: blank_as_none(self.company),
            model: self.model.trim().to_string(),
            order_year: self.order_year,
            order_month: self.order_month,
            tb,
            start_date: blank_as_none(self.start_date),
            end_date: blank_as_none(self.end_date),
            lot: self.lot,
        })
    }
}

impl UpdateScheduleRequest {
    fn into_update(self) -> Result<ScheduleUpdate, ServiceError> {
        let tb = match self.tb.as_deref() {
            None => None,
            Some(label) => Some(parse_tb(Some(label))?),
        };
        Ok(ScheduleUpdate {
            company: self.company,
            model: self.model,
            order_year: self.order_year,
            order_month: self.order_month,
            lot: self.lot,
            manager: self.manager,
            tb,
            actual_prod: self.actual_prod,
            actual_start_date: self.prod_start,
            actual_end_date: self.prod_end,
        })
    }
}

/// List the schedule rows of a planning week
#[utoipa::path(
    get,
    path = "/api/v1/production/schedules",
    params(WeekQuery),
    responses(
        (status = 200, description = "Schedule rows of the week", body = ApiResponse<Vec<ScheduleView>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<ApiResponse<Vec<ScheduleView>>>, ServiceError> {
    let rows = state
        .services
        .schedules
        .list(WeekFilter {
            year: query.year,
            month: query.month,
            week: query.week_num,
        })
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Replace a planning week with the submitted rows
#[utoipa::path(
    post,
    path = "/api/v1/production/schedules",
    request_body = SaveWeekRequest,
    responses(
        (status = 201, description = "Week synchronized", body = ApiResponse<SaveWeekSummary>),
        (status = 400, description = "Invalid rows", body = crate::errors::ErrorResponse),
        (status = 404, description = "A row id is not part of the week", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn save_schedules(
    State(state): State<AppState>,
    Json(request): Json<SaveWeekRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let week = WeekKey {
        year: request.week_info.year,
        month: request.week_info.month,
        week: request.week_info.week_num,
    };
    let rows = request
        .schedules
        .into_iter()
        .map(ScheduleRowRequest::into_input)
        .collect::<Result<Vec<_>, _>>()?;

    let summary = state.services.schedules.save_week(week, rows).await?;
    Ok(created_response(summary))
}

/// Update plan and progress fields of one row
#[utoipa::path(
    put,
    path = "/api/v1/production/schedules/{id}",
    params(("id" = i32, Path, description = "Schedule row id")),
    request_body = UpdateScheduleRequest,
    responses(
        (status = 200, description = "Row updated", body = ApiResponse<ScheduleView>),
        (status = 400, description = "Invalid field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Row not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<ApiResponse<ScheduleView>>, ServiceError> {
    let row = state
        .services
        .schedules
        .update(id, request.into_update()?)
        .await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Replace the notes of one row
#[utoipa::path(
    patch,
    path = "/api/v1/production/schedules/{id}/notes",
    params(("id" = i32, Path, description = "Schedule row id")),
    request_body = NotesRequest,
    responses(
        (status = 200, description = "Notes updated", body = ApiResponse<ScheduleView>),
        (status = 400, description = "notes missing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Row not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn update_notes(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<NotesRequest>,
) -> Result<Json<ApiResponse<ScheduleView>>, ServiceError> {
    let notes = request
        .notes
        .ok_or_else(|| ServiceError::InvalidInput("notes is required".to_string()))?;
    let row = state.services.schedules.update_notes(id, notes).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Delete every row of a planning week
#[utoipa::path(
    delete,
    path = "/api/v1/production/schedules",
    params(WeekQuery),
    responses(
        (status = 200, description = "Rows deleted", body = ApiResponse<DeletedCount>),
        (status = 400, description = "Week not fully specified", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn delete_schedules(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> Result<Response, ServiceError> {
    let (Some(year), Some(month), Some(week)) = (query.year, query.month, query.week_num) else {
        return Err(ServiceError::InvalidInput(
            "year, month and weekNum are required".to_string(),
        ));
    };
    let deleted = state
        .services
        .schedules
        .delete_week(WeekKey { year, month, week })
        .await?;
    Ok(success_response(DeletedCount { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_accepts_loose_actual_prod() {
        let request: UpdateScheduleRequest =
            serde_json::from_str(r#"{"actualProd": "120"}"#).unwrap();
        assert_eq!(request.actual_prod, Some(120));

        let request: UpdateScheduleRequest =
            serde_json::from_str(r#"{"actualProd": ""}"#).unwrap();
        assert_eq!(request.actual_prod, Some(0));

        let request: UpdateScheduleRequest = serde_json::from_str(r#"{"actualProd": 75}"#).unwrap();
        assert_eq!(request.actual_prod, Some(75));

        let request: UpdateScheduleRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.actual_prod, None);

        assert!(serde_json::from_str::<UpdateScheduleRequest>(r#"{"actualProd": "many"}"#).is_err());
    }

    #[test]
    fn tb_labels_are_checked_and_blank_clears() {
        let request: UpdateScheduleRequest = serde_json::from_str(r#"{"tb": ""}"#).unwrap();
        assert_eq!(request.into_update().unwrap().tb, Some(None));

        let request: UpdateScheduleRequest = serde_json::from_str(r#"{"tb": "T/O"}"#).unwrap();
        assert_eq!(request.into_update().unwrap().tb, Some(Some(TbType::TopOverflow)));

        let request: UpdateScheduleRequest = serde_json::from_str(r#"{"tb": "Middle"}"#).unwrap();
        assert!(matches!(
            request.into_update(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn rows_parse_lot_strings() {
        let row: ScheduleRowRequest = serde_json::from_str(
            r#"{"line": "L1", "model": "AX-100", "orderMonth": "11월분", "tb": "Top", "lot": "50/100"}"#,
        )
        .unwrap();
        assert_eq!(row.lot, LotQuantity::new(50, 100));
        let input = row.into_input().unwrap();
        assert_eq!(input.order_month.map(OrderMonth::get), Some(11));
        assert_eq!(input.tb, Some(TbType::Top));

        let row: ScheduleRowRequest =
            serde_json::from_str(r#"{"line": "L1", "model": "AX-100", "lot": 300}"#).unwrap();
        assert_eq!(row.lot, LotQuantity::new(300, 300));
    }
}
