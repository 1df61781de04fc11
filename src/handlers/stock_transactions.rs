use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    services::stock_transactions::{RecordTransactionRequest, TransactionResponse},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Query parameters accepted by the transaction list endpoint
#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub limit: Option<u64>,
    pub material_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}

/// Record a stock transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "Transactions",
    summary = "Record a stock transaction",
    description = "Records a consumption, addition or adjustment against a material and folds its effect into the material's storage layout and running quantity atomically.",
    request_body = RecordTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn record_transaction(
    State(state): State<AppState>,
    Json(request): Json<RecordTransactionRequest>,
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

    let transaction = state
        .services
        .stock_transactions
        .record_transaction(request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(transaction))))
}

/// List stock transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "Transactions",
    summary = "List stock transactions",
    description = "Lists transactions newest-first, optionally filtered to a single material.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("material_id" = Option<Uuid>, Query, description = "Only transactions for this material")
    ),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<PaginatedResponse<TransactionResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<PaginatedResponse<TransactionResponse>> {
    let page = query.page.max(1);
    let limit = query
        .limit
        .unwrap_or(state.config.default_page_size)
        .clamp(1, state.config.max_page_size);

    let list = state
        .services
        .stock_transactions
        .list_transactions(page, limit, query.material_id)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: list.transactions,
        total: list.total,
        page: list.page,
        limit: list.per_page,
        total_pages: (list.total + limit - 1) / limit,
    })))
}

/// Export the transaction log as CSV
#[utoipa::path(
    get,
    path = "/api/v1/transactions/export",
    tag = "Transactions",
    summary = "Export the transaction log as CSV",
    description = "Streams the full transaction log as a CSV attachment, newest entries first.",
    responses(
        (status = 200, description = "CSV report", content_type = "text/csv", body = String),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn export_transactions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    let csv = state.services.stock_transactions.export_csv().await?;
    let filename = format!(
        "attachment; filename=\"transaction_log_{}.csv\"",
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

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    tag = "Transactions",
    summary = "Get a transaction by ID",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TransactionResponse> {
    let transaction = state.services.stock_transactions.get_transaction(id).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

/// Delete a transaction, reversing its effect
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{id}",
    tag = "Transactions",
    summary = "Delete a transaction",
    description = "Deletes the transaction and backs its quantity effect out of the parent material. Deleting an adjustment recomputes the quantity from the storage layout.",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<String> {
    state
        .services
        .stock_transactions
        .delete_transaction(id)
        .await?;
    Ok(Json(ApiResponse::success(format!(
        "Transaction {} deleted",
        id
    ))))
}

/// List transactions for one material
#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}/transactions",
    tag = "Transactions",
    summary = "List transactions for one material",
    params(
        ("id" = Uuid, Path, description = "Material ID"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<PaginatedResponse<TransactionResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    )
)]
pub async fn list_material_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<PaginatedResponse<TransactionResponse>> {
    let page = query.page.max(1);
    let limit = query
        .limit
        .unwrap_or(state.config.default_page_size)
        .clamp(1, state.config.max_page_size);

    let list = state
        .services
        .stock_transactions
        .list_transactions(page, limit, Some(id))
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: list.transactions,
        total: list.total,
        page: list.page,
        limit: list.per_page,
        total_pages: (list.total + limit - 1) / limit,
    })))
}
