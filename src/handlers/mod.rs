pub mod materials;
pub mod stock_transactions;
pub mod suggestions;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub materials: Arc<crate::services::materials::MaterialService>,
    pub stock_transactions: Arc<crate::services::stock_transactions::StockTransactionService>,
    pub suggestions: Arc<crate::services::suggestions::SuggestionService>,
}

impl AppServices {
    /// Build the AppServices container shared by every handler.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        suggestions: crate::services::suggestions::SuggestionService,
    ) -> Self {
        let materials = Arc::new(crate::services::materials::MaterialService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let stock_transactions = Arc::new(
            crate::services::stock_transactions::StockTransactionService::new(
                db_pool,
                Some(event_sender),
            ),
        );

        Self {
            materials,
            stock_transactions,
            suggestions: Arc::new(suggestions),
        }
    }
}
