use axum::{extract::State, Json};

use crate::services::suggestions::{SuggestionRequest, SuggestionResponse};
use crate::AppState;

/// Validate a field value against the upstream suggestion service
#[utoipa::path(
    post,
    path = "/api/v1/suggestions",
    tag = "Suggestions",
    summary = "Validate a field value",
    description = "Forwards a field value to the configured validation upstream and returns its verdict. Without an upstream, or when the upstream fails, the value passes through as valid.",
    request_body = SuggestionRequest,
    responses(
        (status = 200, description = "Validation verdict", body = SuggestionResponse)
    )
)]
pub async fn suggest_field(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> Json<SuggestionResponse> {
    Json(state.services.suggestions.suggest(request).await)
}
