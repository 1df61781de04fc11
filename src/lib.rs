//! LabTrack API Library
//!
//! This crate provides the core functionality for the LabTrack laboratory
//! inventory service: a material registry with unit-aware quantity tracking
//! and a reversible stock transaction log.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod inventory;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API routes mounted under /api/v1
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Materials API
        .route(
            "/materials",
            get(handlers::materials::list_materials).post(handlers::materials::create_material),
        )
        .route(
            "/materials/summary",
            get(handlers::materials::inventory_summary),
        )
        .route(
            "/materials/export",
            get(handlers::materials::export_materials),
        )
        .route(
            "/materials/:id",
            get(handlers::materials::get_material)
                .put(handlers::materials::update_material)
                .delete(handlers::materials::delete_material),
        )
        .route(
            "/materials/:id/transactions",
            get(handlers::stock_transactions::list_material_transactions),
        )
        // Transactions API
        .route(
            "/transactions",
            get(handlers::stock_transactions::list_transactions)
                .post(handlers::stock_transactions::record_transaction),
        )
        .route(
            "/transactions/export",
            get(handlers::stock_transactions::export_transactions),
        )
        .route(
            "/transactions/:id",
            get(handlers::stock_transactions::get_transaction)
                .delete(handlers::stock_transactions::delete_transaction),
        )
        // Suggestions API
        .route("/suggestions", post(handlers::suggestions::suggest_field))
}

/// Build and version information for the running service
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub git: String,
    pub build_time: String,
    pub environment: String,
    pub timestamp: String,
}

/// Result of the dependency health probes
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: String,
}

/// Service build information
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Health",
    summary = "Service build information",
    responses(
        (status = 200, description = "Service status", body = ApiResponse<StatusResponse>)
    )
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let status = StatusResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now().to_rfc3339(),
    };

    Ok(Json(ApiResponse::success(status)))
}

/// Dependency health probe
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    summary = "Dependency health probe",
    responses(
        (status = 200, description = "Health report", body = ApiResponse<HealthResponse>)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(_) => "healthy".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed during health check");
            "unhealthy".to_string()
        }
    };

    let status = if database == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(ApiResponse::success(HealthResponse {
        status: status.to_string(),
        database,
        timestamp: Utc::now().to_rfc3339(),
    })))
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::inventory::*;
    pub use crate::openapi::*;
    pub use crate::tracing::*;
}
