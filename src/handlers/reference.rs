use super::common::{
    created_response, empty_string_as_none, no_content_response, not_blank, success_response,
    validate_input, DeletedCount,
};
use crate::{
    entities::{company, manager, model_folder, product_model},
    errors::ServiceError,
    services::reference::ModelUpdate,
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Companies, managers, folders and product models.
pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list_companies).post(create_company))
        .route("/companies/:id", put(rename_company).delete(delete_company))
        .route("/managers", get(list_managers).post(create_manager))
        .route("/managers/:id", put(rename_manager).delete(delete_manager))
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/:id", put(rename_folder).delete(delete_folder))
        .route("/models", get(list_models).post(create_model))
        .route("/models/:id", put(update_model).delete(delete_model))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NameRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub company_id: i32,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelRequest {
    pub company_id: i32,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: String,
    pub folder_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModelRequest {
    pub name: Option<String>,
    /// `null` moves the model out of its folder
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>)]
    pub folder_id: Option<Option<i32>>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub company_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub folder_id: Option<i32>,
}

// Companies

#[utoipa::path(
    get,
    path = "/api/v1/companies",
    responses((status = 200, description = "Companies by name", body = ApiResponse<Vec<company::Model>>)),
    tag = "reference"
)]
pub async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<company::Model>>>, ServiceError> {
    let companies = state.services.reference.list_companies().await?;
    Ok(Json(ApiResponse::success(companies)))
}

#[utoipa::path(
    post,
    path = "/api/v1/companies",
    request_body = NameRequest,
    responses(
        (status = 201, description = "Company created", body = ApiResponse<company::Model>),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn create_company(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let company = state.services.reference.create_company(&request.name).await?;
    Ok(created_response(company))
}

#[utoipa::path(
    put,
    path = "/api/v1/companies/{id}",
    params(("id" = i32, Path, description = "Company id")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Company renamed", body = ApiResponse<company::Model>),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn rename_company(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<NameRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let company = state
        .services
        .reference
        .rename_company(id, &request.name)
        .await?;
    Ok(success_response(company))
}

#[utoipa::path(
    delete,
    path = "/api/v1/companies/{id}",
    params(("id" = i32, Path, description = "Company id")),
    responses(
        (status = 204, description = "Company deleted"),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Company still owns folders or models", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.reference.delete_company(id).await?;
    Ok(no_content_response())
}

// Managers

#[utoipa::path(
    get,
    path = "/api/v1/managers",
    responses((status = 200, description = "Managers by name", body = ApiResponse<Vec<manager::Model>>)),
    tag = "reference"
)]
pub async fn list_managers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<manager::Model>>>, ServiceError> {
    let managers = state.services.reference.list_managers().await?;
    Ok(Json(ApiResponse::success(managers)))
}

#[utoipa::path(
    post,
    path = "/api/v1/managers",
    request_body = NameRequest,
    responses(
        (status = 201, description = "Manager created", body = ApiResponse<manager::Model>),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn create_manager(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let manager = state.services.reference.create_manager(&request.name).await?;
    Ok(created_response(manager))
}

#[utoipa::path(
    put,
    path = "/api/v1/managers/{id}",
    params(("id" = i32, Path, description = "Manager id")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Manager renamed", body = ApiResponse<manager::Model>),
        (status = 404, description = "Manager not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn rename_manager(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<NameRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let manager = state
        .services
        .reference
        .rename_manager(id, &request.name)
        .await?;
    Ok(success_response(manager))
}

#[utoipa::path(
    delete,
    path = "/api/v1/managers/{id}",
    params(("id" = i32, Path, description = "Manager id")),
    responses(
        (status = 204, description = "Manager deleted"),
        (status = 404, description = "Manager not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn delete_manager(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.reference.delete_manager(id).await?;
    Ok(no_content_response())
}

// Folders

#[utoipa::path(
    get,
    path = "/api/v1/folders",
    params(OwnerQuery),
    responses((status = 200, description = "Folders by name", body = ApiResponse<Vec<model_folder::Model>>)),
    tag = "reference"
)]
pub async fn list_folders(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<Vec<model_folder::Model>>>, ServiceError> {
    let folders = state.services.reference.list_folders(query.company_id).await?;
    Ok(Json(ApiResponse::success(folders)))
}

#[utoipa::path(
    post,
    path = "/api/v1/folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = ApiResponse<model_folder::Model>),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used in the company", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn create_folder(
    State(state): State<AppState>,
    Json(request): Json<CreateFolderRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let folder = state
        .services
        .reference
        .create_folder(request.company_id, &request.name)
        .await?;
    Ok(created_response(folder))
}

#[utoipa::path(
    put,
    path = "/api/v1/folders/{id}",
    params(("id" = i32, Path, description = "Folder id")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Folder renamed", body = ApiResponse<model_folder::Model>),
        (status = 404, description = "Folder not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn rename_folder(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<NameRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let folder = state
        .services
        .reference
        .rename_folder(id, &request.name)
        .await?;
    Ok(success_response(folder))
}

/// Delete a folder; its models stay with the company, unfiled
#[utoipa::path(
    delete,
    path = "/api/v1/folders/{id}",
    params(("id" = i32, Path, description = "Folder id")),
    responses(
        (status = 200, description = "Folder deleted, number of detached models", body = ApiResponse<DeletedCount>),
        (status = 404, description = "Folder not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let detached = state.services.reference.delete_folder(id).await?;
    Ok(success_response(DeletedCount { deleted: detached }))
}

// Product models

#[utoipa::path(
    get,
    path = "/api/v1/models",
    params(OwnerQuery),
    responses((status = 200, description = "Models by name", body = ApiResponse<Vec<product_model::Model>>)),
    tag = "reference"
)]
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<Vec<product_model::Model>>>, ServiceError> {
    let models = state
        .services
        .reference
        .list_models(query.company_id, query.folder_id)
        .await?;
    Ok(Json(ApiResponse::success(models)))
}

#[utoipa::path(
    post,
    path = "/api/v1/models",
    request_body = CreateModelRequest,
    responses(
        (status = 201, description = "Model created", body = ApiResponse<product_model::Model>),
        (status = 400, description = "Folder belongs to another company", body = crate::errors::ErrorResponse),
        (status = 404, description = "Company or folder not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn create_model(
    State(state): State<AppState>,
    Json(request): Json<CreateModelRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let model = state
        .services
        .reference
        .create_model(request.company_id, &request.name, request.folder_id)
        .await?;
    Ok(created_response(model))
}

#[utoipa::path(
    put,
    path = "/api/v1/models/{id}",
    params(("id" = i32, Path, description = "Product model id")),
    request_body = UpdateModelRequest,
    responses(
        (status = 200, description = "Model updated", body = ApiResponse<product_model::Model>),
        (status = 404, description = "Model or folder not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn update_model(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateModelRequest>,
) -> Result<Response, ServiceError> {
    let model = state
        .services
        .reference
        .update_model(
            id,
            ModelUpdate {
                name: request.name,
                folder_id: request.folder_id,
            },
        )
        .await?;
    Ok(success_response(model))
}

/// Delete a model together with its attached files
#[utoipa::path(
    delete,
    path = "/api/v1/models/{id}",
    params(("id" = i32, Path, description = "Product model id")),
    responses(
        (status = 204, description = "Model deleted"),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reference"
)]
pub async fn delete_model(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.reference.delete_model(id).await?;
    Ok(no_content_response())
}
