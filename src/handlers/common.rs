use crate::{errors::ServiceError, models::OrderMonth, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Parses a `YYYY-MM-DD` query value.
pub fn parse_iso_date(field: &str, raw: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ServiceError::InvalidInput(format!("{} must be a YYYY-MM-DD date, got '{}'", field, raw))
    })
}

/// Rejects names that are blank once trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Treats a blank query or body value as absent.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

/// Order month from a number, a label such as `"11월분"`, blank or null.
pub fn optional_order_month<'de, D>(deserializer: D) -> Result<Option<OrderMonth>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => OrderMonth::new(n).map(Some).map_err(serde::de::Error::custom),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Integer from a JSON number or a numeric string; blank or null is `None`.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", text))),
    }
}

/// Counter returned by bulk deletions.
#[derive(Debug, Clone, Copy, Serialize, utoipa::ToSchema)]
pub struct DeletedCount {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Params {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        year: Option<i32>,
    }

    #[test]
    fn blank_query_values_are_absent() {
        let params: Params = serde_json::from_str(r#"{"year": ""}"#).unwrap();
        assert_eq!(params.year, None);
        let params: Params = serde_json::from_str(r#"{"year": " 2025 "}"#).unwrap();
        assert_eq!(params.year, Some(2025));
        let params: Params = serde_json::from_str("{}").unwrap();
        assert_eq!(params.year, None);
        assert!(serde_json::from_str::<Params>(r#"{"year": "soon"}"#).is_err());
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "optional_order_month")]
        month: Option<OrderMonth>,
        #[serde(default, deserialize_with = "optional_number")]
        qty: Option<i64>,
    }

    #[test]
    fn loose_numbers_and_month_labels() {
        let row: Row = serde_json::from_str(r#"{"month": "11월분", "qty": "40"}"#).unwrap();
        assert_eq!(row.month.map(OrderMonth::get), Some(11));
        assert_eq!(row.qty, Some(40));

        let row: Row = serde_json::from_str(r#"{"month": 3, "qty": ""}"#).unwrap();
        assert_eq!(row.month.map(OrderMonth::get), Some(3));
        assert_eq!(row.qty, None);

        let row: Row = serde_json::from_str(r#"{"month": null}"#).unwrap();
        assert!(row.month.is_none());
        assert!(serde_json::from_str::<Row>(r#"{"month": 13}"#).is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_iso_date("date", "2025-11-03").is_ok());
        assert!(matches!(
            parse_iso_date("date", "11/03/2025"),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
