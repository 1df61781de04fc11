use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    services::materials::{
        CreateMaterialRequest, InventorySummary, MaterialResponse, UpdateMaterialRequest,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// Register a new material
#[utoipa::path(
    post,
    path = "/api/v1/materials",
    tag = "Materials",
    summary = "Register a new material",
    description = "Registers a material with its storage layout. The current quantity is derived from the layout when one is given, otherwise from the submitted volume.",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created successfully", body = ApiResponse<MaterialResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_material(
    State(state): State<AppState>,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    if let Err(validation_errors) = request.validate() {
        let errors: Vec<String> = validation_errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                let field = field.clone();
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(errors)),
        ));
    }

    let material = state.services.materials.create_material(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(material))))
}

/// List materials
#[utoipa::path(
    get,
    path = "/api/v1/materials",
    tag = "Materials",
    summary = "List materials",
    description = "Lists materials newest-first with pagination and an optional search over name, project and lot number.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("search" = Option<String>, Query, description = "Search term matched against name, project and lot number")
    ),
    responses(
        (status = 200, description = "Materials retrieved successfully", body = ApiResponse<PaginatedResponse<MaterialResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<MaterialResponse>> {
    let page = query.page.max(1);
    let limit = query
        .limit
        .unwrap_or(state.config.default_page_size)
        .clamp(1, state.config.max_page_size);

    let list = state
        .services
        .materials
        .list_materials(page, limit, query.search.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: list.materials,
        total: list.total,
        page: list.page,
        limit: list.per_page,
        total_pages: (list.total + limit - 1) / limit,
    })))
}

/// Inventory dashboard summary
#[utoipa::path(
    get,
    path = "/api/v1/materials/summary",
    tag = "Materials",
    summary = "Inventory dashboard summary",
    description = "Returns aggregate counts over the inventory: total and depleted materials, submissions in the last seven days, and transactions recorded today.",
    responses(
        (status = 200, description = "Summary computed successfully", body = ApiResponse<InventorySummary>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn inventory_summary(State(state): State<AppState>) -> ApiResult<InventorySummary> {
    let summary = state.services.materials.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Export the inventory as CSV
#[utoipa::path(
    get,
    path = "/api/v1/materials/export",
    tag = "Materials",
    summary = "Export the inventory as CSV",
    description = "Streams the full inventory as a CSV attachment sorted by material name.",
    responses(
        (status = 200, description = "CSV report", content_type = "text/csv", body = String),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn export_materials(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    let csv = state.services.materials.export_csv().await?;
    let filename = format!(
        "attachment; filename=\"inventory_report_{}.csv\"",
        Utc::now().date_naive()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}

/// Get a material by ID
#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    tag = "Materials",
    summary = "Get a material by ID",
    params(
        ("id" = Uuid, Path, description = "Material ID")
    ),
    responses(
        (status = 200, description = "Material retrieved successfully", body = ApiResponse<MaterialResponse>),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MaterialResponse> {
    let material = state.services.materials.get_material(id).await?;
    Ok(Json(ApiResponse::success(material)))
}

/// Update a material
#[utoipa::path(
    put,
    path = "/api/v1/materials/{id}",
    tag = "Materials",
    summary = "Update a material",
    description = "Replaces the material's fields and recomputes its current quantity from the submitted storage layout.",
    params(
        ("id" = Uuid, Path, description = "Material ID")
    ),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Material updated successfully", body = ApiResponse<MaterialResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMaterialRequest>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    if let Err(validation_errors) = request.validate() {
        let errors: Vec<String> = validation_errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                let field = field.clone();
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(errors)),
        ));
    }

    let material = state
        .services
        .materials
        .update_material(id, request)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(material))))
}

/// Delete a material
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    tag = "Materials",
    summary = "Delete a material",
    description = "Deletes the material record. Its transaction history is preserved.",
    params(
        ("id" = Uuid, Path, description = "Material ID")
    ),
    responses(
        (status = 200, description = "Material deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<String> {
    state.services.materials.delete_material(id).await?;
    Ok(Json(ApiResponse::success(format!(
        "Material {} deleted",
        id
    ))))
}
