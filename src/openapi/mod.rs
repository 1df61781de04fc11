use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LabTrack API",
        version = "0.2.0",
        description = r#"
# LabTrack Laboratory Inventory API

An API for tracking laboratory materials: where they are stored, how much of
each remains, and every stock movement against them.

## Features

- **Material Registry**: Register materials with lot numbers, storage conditions and retain amounts
- **Storage Layouts**: Model freezers and shelves as locations holding aliquots of a given count and size
- **Unit-aware Quantities**: Running quantities aggregated across mixed volume, mass and discrete units
- **Stock Transactions**: Consumptions, additions and adjustments folded into the material atomically
- **Reversible History**: Deleting a transaction backs its effect out of the material
- **CSV Reports**: Inventory and transaction-log exports for offline analysis
- **Field Suggestions**: Optional upstream validation of free-text fields during data entry

## Error Handling

The API uses consistent error response formats with appropriate HTTP status codes:

```json
{
  "success": false,
  "error": "Not Found",
  "message": "Material with ID 0a0f... not found",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Pagination

List endpoints support pagination with the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20, max: 100)
- `search`: Search term for filtering results
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Materials", description = "Material registry endpoints"),
        (name = "Transactions", description = "Stock transaction endpoints"),
        (name = "Suggestions", description = "Field validation endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Materials
        crate::handlers::materials::list_materials,
        crate::handlers::materials::get_material,
        crate::handlers::materials::create_material,
        crate::handlers::materials::update_material,
        crate::handlers::materials::delete_material,
        crate::handlers::materials::inventory_summary,
        crate::handlers::materials::export_materials,

        // Transactions
        crate::handlers::stock_transactions::list_transactions,
        crate::handlers::stock_transactions::get_transaction,
        crate::handlers::stock_transactions::record_transaction,
        crate::handlers::stock_transactions::delete_transaction,
        crate::handlers::stock_transactions::export_transactions,
        crate::handlers::stock_transactions::list_material_transactions,

        // Suggestions
        crate::handlers::suggestions::suggest_field,

        // Health
        crate::api_status,
        crate::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::StatusResponse,
            crate::HealthResponse,

            // Inventory core types
            crate::inventory::units::Unit,
            crate::inventory::storage::Aliquot,
            crate::inventory::storage::StorageEntry,
            crate::inventory::reconcile::TransactionKind,

            // Material types
            crate::services::materials::MaterialResponse,
            crate::services::materials::CreateMaterialRequest,
            crate::services::materials::UpdateMaterialRequest,
            crate::services::materials::InventorySummary,

            // Transaction types
            crate::services::stock_transactions::TransactionResponse,
            crate::services::stock_transactions::RecordTransactionRequest,

            // Suggestion types
            crate::services::suggestions::SuggestionRequest,
            crate::services::suggestions::SuggestionResponse,

            // Error types
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
