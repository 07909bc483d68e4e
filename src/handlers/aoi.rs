use super::common::{
    created_response, empty_string_as_none, no_content_response, optional_order_month,
    parse_iso_date, success_response,
};
use crate::{
    entities::{dip_group, DefectKind},
    errors::ServiceError,
    models::{LotKey, OrderMonth, YearMonth},
    services::aoi::{AoiRecordUpdate, AoiRecordView, CompanyModels, NewAoiRecord, RecordFilter},
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{de, Deserialize, Deserializer};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

pub fn aoi_routes() -> Router<AppState> {
    Router::new()
        .route("/available-models", get(available_models))
        .route("/records", get(list_records).post(create_record))
        .route("/records/:id", put(update_record).delete(delete_record))
        .route("/groups/:id/complete", post(complete_group))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthWindowQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub start_year: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i32>)]
    pub start_month: Option<OrderMonth>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub end_year: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<i32>)]
    pub end_month: Option<OrderMonth>,
}

impl MonthWindowQuery {
    /// The requested window, or one month either side of `today`.
    fn window(&self, today: NaiveDate) -> (YearMonth, YearMonth) {
        match (self.start_year, self.start_month, self.end_year, self.end_month) {
            (Some(sy), Some(sm), Some(ey), Some(em)) => {
                (YearMonth::new(sy, sm), YearMonth::new(ey, em))
            }
            _ => {
                let current = YearMonth::from_date(today);
                (current.shift(-1), current.shift(1))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    pub model: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub month: Option<i32>,
    pub lot: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub date: Option<String>,
}

impl RecordQuery {
    fn filter(self, today: NaiveDate) -> Result<RecordFilter, ServiceError> {
        let model = self.model.filter(|m| !m.trim().is_empty());
        let lot = self.lot.filter(|l| !l.trim().is_empty());
        if let (Some(model), Some(year), Some(month), Some(lot)) = (model, self.year, self.month, lot) {
            return Ok(RecordFilter::Lot(LotKey::new(model.trim(), year, month, lot.trim())));
        }

        let start = self.start_date.filter(|d| !d.trim().is_empty());
        let end = self.end_date.filter(|d| !d.trim().is_empty());
        if let (Some(start), Some(end)) = (start, end) {
            return Ok(RecordFilter::Range {
                start: parse_iso_date("start_date", &start)?,
                end: parse_iso_date("end_date", &end)?,
            });
        }

        match self.date.filter(|d| !d.trim().is_empty()) {
            Some(date) => Ok(RecordFilter::Date(parse_iso_date("date", &date)?)),
            None => Ok(RecordFilter::Date(today)),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRecordRequest {
    pub model: String,
    pub year: i32,
    #[serde(deserialize_with = "optional_order_month")]
    #[schema(value_type = i32, example = 11)]
    pub month: Option<OrderMonth>,
    pub lot: String,
    /// Defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[serde(alias = "inspection_point")]
    pub inspection_point: Option<i32>,
    #[serde(alias = "inspection_qty")]
    pub inspection_qty: Option<i32>,
    /// Counts keyed by defect name, e.g. `{"missing": 2}`
    #[serde(default)]
    #[schema(value_type = Object)]
    pub defects: BTreeMap<DefectKind, i32>,
    /// Reference tags keyed by defect name, e.g. `{"missing": "C12, R3"}`.
    /// The `missing_ref` form returned by reads is accepted too.
    #[serde(default, deserialize_with = "reference_tags")]
    #[schema(value_type = Object)]
    pub references: BTreeMap<DefectKind, String>,
}

fn reference_tags<'de, D>(deserializer: D) -> Result<BTreeMap<DefectKind, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, tags)| {
            let name = key.strip_suffix("_ref").unwrap_or(&key);
            DefectKind::ALL
                .iter()
                .find(|kind| kind.name() == name)
                .map(|kind| (*kind, tags))
                .ok_or_else(|| de::Error::custom(format!("unknown defect kind `{}`", key)))
        })
        .collect()
}

impl From<UpdateRecordRequest> for AoiRecordUpdate {
    fn from(request: UpdateRecordRequest) -> Self {
        AoiRecordUpdate {
            inspection_point: request.inspection_point,
            inspection_qty: request.inspection_qty,
            defects: request.defects,
            references: request.references,
        }
    }
}

/// DIP lots awaiting inspection, grouped by company
#[utoipa::path(
    get,
    path = "/api/v1/aoi/available-models",
    params(MonthWindowQuery),
    responses(
        (status = 200, description = "Lots per company", body = ApiResponse<Vec<CompanyModels>>)
    ),
    tag = "aoi"
)]
pub async fn available_models(
    State(state): State<AppState>,
    Query(query): Query<MonthWindowQuery>,
) -> Result<Json<ApiResponse<Vec<CompanyModels>>>, ServiceError> {
    let window = query.window(Local::now().date_naive());
    let models = state.services.aoi.available_models(window).await?;
    Ok(Json(ApiResponse::success(models)))
}

/// AOI records by lot, by date range, or for a single day
#[utoipa::path(
    get,
    path = "/api/v1/aoi/records",
    params(RecordQuery),
    responses(
        (status = 200, description = "Matching records, newest first", body = ApiResponse<Vec<AoiRecordView>>),
        (status = 400, description = "Malformed date", body = crate::errors::ErrorResponse)
    ),
    tag = "aoi"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<ApiResponse<Vec<AoiRecordView>>>, ServiceError> {
    let filter = query.filter(Local::now().date_naive())?;
    let records = state.services.aoi.list_records(filter).await?;
    Ok(Json(ApiResponse::success(records)))
}

/// Start an empty inspection record for a lot
#[utoipa::path(
    post,
    path = "/api/v1/aoi/records",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created", body = ApiResponse<AoiRecordView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "aoi"
)]
pub async fn create_record(
    State(state): State<AppState>,
    Json(request): Json<CreateRecordRequest>,
) -> Result<Response, ServiceError> {
    let month = request
        .month
        .ok_or_else(|| ServiceError::ValidationError("month is required".to_string()))?;
    let date = match request.date.as_deref().map(str::trim) {
        None | Some("") => Local::now().date_naive(),
        Some(raw) => parse_iso_date("date", raw)?,
    };
    let record = state
        .services
        .aoi
        .create_record(NewAoiRecord {
            model: request.model,
            year: request.year,
            month,
            lot: request.lot,
            date,
        })
        .await?;
    Ok(created_response(record))
}

/// Edit counts, references and inspection figures of a record
#[utoipa::path(
    put,
    path = "/api/v1/aoi/records/{id}",
    params(("id" = i32, Path, description = "AOI record id")),
    request_body = UpdateRecordRequest,
    responses(
        (status = 200, description = "Record updated", body = ApiResponse<AoiRecordView>),
        (status = 400, description = "Negative or oversized counts", body = crate::errors::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "aoi"
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRecordRequest>,
) -> Result<Response, ServiceError> {
    let record = state.services.aoi.update_record(id, request.into()).await?;
    Ok(success_response(record))
}

#[utoipa::path(
    delete,
    path = "/api/v1/aoi/records/{id}",
    params(("id" = i32, Path, description = "AOI record id")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "aoi"
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.aoi.delete_record(id).await?;
    Ok(no_content_response())
}

/// Close a lot once its inspected quantity covers the committed lot
#[utoipa::path(
    post,
    path = "/api/v1/aoi/groups/{id}/complete",
    params(("id" = i32, Path, description = "DIP group id")),
    responses(
        (status = 200, description = "Lot marked AOI-complete", body = ApiResponse<dip_group::Model>),
        (status = 400, description = "Inspected quantity is short of the lot", body = crate::errors::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "aoi"
)]
pub async fn complete_group(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let group = state.services.aoi.complete_group(id).await?;
    Ok(success_response(group))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn partial_window_falls_back_to_rolling_months() {
        let query = MonthWindowQuery {
            start_year: Some(2025),
            ..Default::default()
        };
        let (start, end) = query.window(day(2026, 1, 15));
        assert_eq!((start.year, start.month.get()), (2025, 12));
        assert_eq!((end.year, end.month.get()), (2026, 2));
    }

    #[test]
    fn references_take_defect_or_column_names() {
        let request: UpdateRecordRequest = serde_json::from_value(serde_json::json!({
            "references": { "missing": "C12", "dip_ref": "J1, J2" }
        }))
        .unwrap();
        assert_eq!(request.references[&DefectKind::Missing], "C12");
        assert_eq!(request.references[&DefectKind::Dip], "J1, J2");

        let unknown = serde_json::from_value::<UpdateRecordRequest>(serde_json::json!({
            "references": { "solder_ball_ref": "U3" }
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn lot_key_wins_over_dates() {
        let query = RecordQuery {
            model: Some("AX-100".into()),
            year: Some(2025),
            month: Some(11),
            lot: Some("100".into()),
            date: Some("2025-11-03".into()),
            ..Default::default()
        };
        assert_eq!(
            query.filter(day(2025, 11, 20)).unwrap(),
            RecordFilter::Lot(LotKey::new("AX-100", 2025, 11, "100"))
        );
    }

    #[test]
    fn missing_filters_default_to_today() {
        let today = day(2025, 11, 20);
        assert_eq!(
            RecordQuery::default().filter(today).unwrap(),
            RecordFilter::Date(today)
        );
        let ranged = RecordQuery {
            start_date: Some("2025-11-01".into()),
            end_date: Some("2025-11-30".into()),
            ..Default::default()
        };
        assert_eq!(
            ranged.filter(today).unwrap(),
            RecordFilter::Range {
                start: day(2025, 11, 1),
                end: day(2025, 11, 30)
            }
        );
    }

    #[test]
    fn update_maps_are_keyed_by_defect_name() {
        let request: UpdateRecordRequest = serde_json::from_str(
            r#"{"inspectionQty": 50, "defects": {"missing": 2, "cold": 1}, "references": {"missing": "C1"}}"#,
        )
        .unwrap();
        assert_eq!(request.inspection_qty, Some(50));
        assert_eq!(request.defects.get(&DefectKind::Cold), Some(&1));
        assert!(serde_json::from_str::<UpdateRecordRequest>(r#"{"defects": {"scratched": 1}}"#).is_err());
    }
}
