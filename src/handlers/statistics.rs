use super::common::{empty_string_as_none, parse_iso_date};
use crate::{
    errors::ServiceError,
    models::OrderMonth,
    services::{
        production::ScheduleView,
        statistics::{AoiPeriodSummary, OrderMonthSummary},
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

pub fn statistics_routes() -> Router<AppState> {
    Router::new()
        .route("/order-month-summary", get(order_month_summary))
        .route("/model-details", get(model_details))
        .route("/aoi-performance", get(aoi_performance))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderMonthQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
    /// A month number or a label such as `11월분`
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub order_month: Option<OrderMonth>,
    /// Only read by `model-details`
    pub model: Option<String>,
}

impl OrderMonthQuery {
    fn require_month(&self) -> Result<(i32, OrderMonth), ServiceError> {
        match (self.year, self.order_month) {
            (Some(year), Some(month)) => Ok((year, month)),
            _ => Err(ServiceError::InvalidInput(
                "year and order_month are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Ordered against produced quantity per model for one order month
#[utoipa::path(
    get,
    path = "/api/v1/statistics/order-month-summary",
    params(OrderMonthQuery),
    responses(
        (status = 200, description = "One line per model", body = ApiResponse<Vec<OrderMonthSummary>>),
        (status = 400, description = "year or order_month missing", body = crate::errors::ErrorResponse)
    ),
    tag = "statistics"
)]
pub async fn order_month_summary(
    State(state): State<AppState>,
    Query(query): Query<OrderMonthQuery>,
) -> Result<Json<ApiResponse<Vec<OrderMonthSummary>>>, ServiceError> {
    let (year, month) = query.require_month()?;
    let summary = state
        .services
        .statistics
        .order_month_summary(year, month)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Schedule rows behind one summary line
#[utoipa::path(
    get,
    path = "/api/v1/statistics/model-details",
    params(OrderMonthQuery),
    responses(
        (status = 200, description = "Schedule rows", body = ApiResponse<Vec<ScheduleView>>),
        (status = 400, description = "model, year or order_month missing", body = crate::errors::ErrorResponse)
    ),
    tag = "statistics"
)]
pub async fn model_details(
    State(state): State<AppState>,
    Query(query): Query<OrderMonthQuery>,
) -> Result<Json<ApiResponse<Vec<ScheduleView>>>, ServiceError> {
    let (year, month) = query.require_month()?;
    let model = query
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("model is required".to_string()))?;

    let rows = state
        .services
        .statistics
        .model_details(model, year, month)
        .await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(ScheduleView::from).collect(),
    )))
}

/// Defect statistics per lot for AOI records in a date range
#[utoipa::path(
    get,
    path = "/api/v1/statistics/aoi-performance",
    params(PeriodQuery),
    responses(
        (status = 200, description = "One line per lot", body = ApiResponse<Vec<AoiPeriodSummary>>),
        (status = 400, description = "Missing or malformed dates", body = crate::errors::ErrorResponse)
    ),
    tag = "statistics"
)]
pub async fn aoi_performance(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<Vec<AoiPeriodSummary>>>, ServiceError> {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(ServiceError::InvalidInput(
            "start_date and end_date are required".to_string(),
        ));
    };
    let start = parse_iso_date("start_date", &start)?;
    let end = parse_iso_date("end_date", &end)?;

    let summary = state.services.statistics.aoi_performance(start, end).await?;
    Ok(Json(ApiResponse::success(summary)))
}
