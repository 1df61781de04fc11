use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{instrument, warn};
use utoipa::ToSchema;

/// Payload forwarded to the upstream validation service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub field_name: String,
    pub input_value: String,
}

/// Verdict returned by the upstream validation service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub is_valid: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SuggestionResponse {
    /// The all-clear verdict used whenever the upstream cannot weigh in
    pub fn pass_through() -> Self {
        Self {
            is_valid: true,
            suggestions: Vec::new(),
            error_message: None,
        }
    }
}

/// Proxy to an optional upstream field-validation service.
///
/// The proxy degrades gracefully: when no upstream is configured, or the
/// upstream is down, slow, or answers garbage, the caller gets an all-clear
/// verdict instead of an error. Field validation is advisory and must never
/// block data entry.
#[derive(Clone)]
pub struct SuggestionService {
    client: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl SuggestionService {
    /// Creates a suggestion proxy. A `None` base URL disables forwarding.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    /// Forwards a field value upstream and returns the verdict
    #[instrument(skip(self), fields(field = %request.field_name))]
    pub async fn suggest(&self, request: SuggestionRequest) -> SuggestionResponse {
        let base_url = match &self.base_url {
            Some(url) => url,
            None => return SuggestionResponse::pass_through(),
        };

        let response = match self
            .client
            .post(base_url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Suggestion upstream unreachable, passing value through");
                return SuggestionResponse::pass_through();
            }
        };

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                "Suggestion upstream returned an error, passing value through"
            );
            return SuggestionResponse::pass_through();
        }

        match response.json::<SuggestionResponse>().await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "Suggestion upstream sent an unreadable body, passing value through");
                SuggestionResponse::pass_through()
            }
        }
    }
}
