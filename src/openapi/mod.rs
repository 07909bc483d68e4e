use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PPMS API",
        version = "1.0.0",
        description = r#"
# Production Planning & Quality Inspection API

Weekly SMT production planning, DIP shipping/receiving and AOI inspection for
an electronics assembly line.

## Features

- **Production schedules**: Replace-by-week planning rows with lot quantities
- **DIP tracking**: Shipping and receiving histories per lot
- **AOI inspection**: Per-day defect records with cumulative inspected quantity
- **Statistics**: Order-month fulfillment and AOI defect rates
- **Reference data**: Companies, managers, folders, product models and files

## Error Handling

Errors share one body format:

```json
{
  "error": "Not Found",
  "message": "DIP group 7 not found",
  "request_id": "8c1f...",
  "timestamp": "2025-11-03T09:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "production", description = "Weekly production schedules"),
        (name = "dip", description = "DIP shipping and receiving"),
        (name = "aoi", description = "AOI inspection records"),
        (name = "statistics", description = "Fulfillment and defect statistics"),
        (name = "reference", description = "Companies, managers, folders and models"),
        (name = "files", description = "Files attached to product models"),
        (name = "auth", description = "Login and session")
    ),
    paths(
        // Production
        crate::handlers::production::list_schedules,
        crate::handlers::production::save_schedules,
        crate::handlers::production::update_schedule,
        crate::handlers::production::update_notes,
        crate::handlers::production::delete_schedules,

        // DIP
        crate::handlers::dip::list_groups,
        crate::handlers::dip::production_models,
        crate::handlers::dip::create_group,
        crate::handlers::dip::delete_group,
        crate::handlers::dip::complete_group,
        crate::handlers::dip::add_record,
        crate::handlers::dip::update_record,
        crate::handlers::dip::delete_record,

        // AOI
        crate::handlers::aoi::available_models,
        crate::handlers::aoi::list_records,
        crate::handlers::aoi::create_record,
        crate::handlers::aoi::update_record,
        crate::handlers::aoi::delete_record,
        crate::handlers::aoi::complete_group,

        // Statistics
        crate::handlers::statistics::order_month_summary,
        crate::handlers::statistics::model_details,
        crate::handlers::statistics::aoi_performance,

        // Reference data
        crate::handlers::reference::list_companies,
        crate::handlers::reference::create_company,
        crate::handlers::reference::rename_company,
        crate::handlers::reference::delete_company,
        crate::handlers::reference::list_managers,
        crate::handlers::reference::create_manager,
        crate::handlers::reference::rename_manager,
        crate::handlers::reference::delete_manager,
        crate::handlers::reference::list_folders,
        crate::handlers::reference::create_folder,
        crate::handlers::reference::rename_folder,
        crate::handlers::reference::delete_folder,
        crate::handlers::reference::list_models,
        crate::handlers::reference::create_model,
        crate::handlers::reference::update_model,
        crate::handlers::reference::delete_model,

        // Files
        crate::handlers::files::list_files,
        crate::handlers::files::upload_file,
        crate::handlers::files::download_file,
        crate::handlers::files::delete_file,

        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::session,
        crate::handlers::auth::logout,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::common::DeletedCount,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("PPMS API"));
        assert!(json.contains("/api/v1/production/schedules"));
        assert!(json.contains("/api/v1/aoi/groups/{id}/complete"));
        assert!(json.contains("/api/v1/statistics/order-month-summary"));
        assert!(json.contains("/auth/login"));
    }
}
