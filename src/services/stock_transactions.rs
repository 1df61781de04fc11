use crate::{
    db::DbPool,
    entities::material::{self, Entity as MaterialEntity},
    entities::stock_transaction::{self, Entity as StockTransactionEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    inventory::reconcile::{apply, reverse, TransactionKind},
    inventory::storage::{aggregate, decode_entries, encode_entries, StorageEntry},
    inventory::units::{lenient_f64, Unit},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordTransactionRequest {
    pub material_id: Uuid,
    pub kind: TransactionKind,
    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(custom = "validate_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Unit,
    pub occurred_on: NaiveDate,
    pub recipient: Option<String>,
    #[serde(default)]
    pub storage_entries: Vec<StorageEntry>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub material_id: Uuid,
    pub material_name: String,
    pub lot_number: String,
    pub kind: TransactionKind,
    pub quantity: f64,
    pub unit: Unit,
    pub occurred_on: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub recipient: Option<String>,
    pub storage_entries: Vec<StorageEntry>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

fn validate_quantity(value: &f64) -> Result<(), ValidationError> {
    if !value.is_finite() || *value < 0.0 {
        let mut err = ValidationError::new("quantity");
        err.message = Some("Must be a finite, non-negative number".into());
        return Err(err);
    }
    Ok(())
}

/// Service for recording stock transactions against materials.
///
/// Every recorded transaction adjusts the parent material's storage layout
/// and running quantity in the same database transaction, so the material
/// row and its transaction log can never drift apart.
#[derive(Clone)]
pub struct StockTransactionService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl StockTransactionService {
    /// Creates a new stock transaction service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send transaction event");
            }
        }
    }

    /// Records a transaction and folds its deltas into the parent material
    #[instrument(skip(self, request), fields(material_id = %request.material_id, kind = %request.kind))]
    pub async fn record_transaction(
        &self,
        request: RecordTransactionRequest,
    ) -> Result<TransactionResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if request.kind == TransactionKind::Consumption
            && request
                .recipient
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err(ServiceError::ValidationError(
                "Recipient is required for consumption transactions".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            ServiceError::DatabaseError(e)
        })?;

        let material = MaterialEntity::find_by_id(request.material_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, material_id = %request.material_id, "Failed to fetch material");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Material with ID {} not found",
                    request.material_id
                ))
            })?;

        let now = Utc::now();
        let transaction_id = Uuid::new_v4();
        let material_unit = Unit::parse_or_default(&material.unit);
        let entries = decode_entries(&material.storage_entries);
        let previous_quantity = material.current_quantity;
        let material_name = material.name.clone();
        let lot_number = material.lot_number.clone();

        let outcome = apply(
            &entries,
            &request.storage_entries,
            request.kind,
            request.quantity,
            material_unit,
        );

        let mut active: material::ActiveModel = material.into();
        active.storage_entries = Set(encode_entries(&outcome.entries));
        active.current_quantity = Set(outcome.current_quantity);
        active.updated_at = Set(Some(now));
        active.update(&txn).await.map_err(|e| {
            error!(error = %e, material_id = %request.material_id, "Failed to update material quantity");
            ServiceError::DatabaseError(e)
        })?;

        // The logged quantity prefers what the aliquot deltas actually add
        // up to; a bare adjustment logs the requested figure verbatim.
        let logged_quantity = match request.kind {
            TransactionKind::Adjustment => request.quantity,
            _ if !request.storage_entries.is_empty() => {
                aggregate(&request.storage_entries, request.unit)
            }
            _ => request.quantity,
        };

        let record = stock_transaction::ActiveModel {
            id: Set(transaction_id),
            material_id: Set(request.material_id),
            material_name: Set(material_name),
            lot_number: Set(lot_number),
            kind: Set(request.kind.to_string()),
            quantity: Set(logged_quantity),
            unit: Set(request.unit.to_string()),
            occurred_on: Set(request.occurred_on),
            recorded_at: Set(now),
            recipient: Set(request.recipient),
            storage_entries: Set(encode_entries(&request.storage_entries)),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let model = record.insert(&txn).await.map_err(|e| {
            error!(error = %e, transaction_id = %transaction_id, "Failed to insert stock transaction");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            transaction_id = %transaction_id,
            material_id = %request.material_id,
            kind = %request.kind,
            new_quantity = outcome.current_quantity,
            "Stock transaction recorded successfully"
        );

        self.emit(Event::TransactionRecorded {
            transaction_id,
            material_id: request.material_id,
            kind: request.kind,
        })
        .await;
        self.emit(Event::MaterialQuantityChanged {
            material_id: request.material_id,
            previous_quantity,
            new_quantity: outcome.current_quantity,
        })
        .await;

        Ok(self.model_to_response(model))
    }

    /// Retrieves a transaction by ID
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn get_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<TransactionResponse, ServiceError> {
        let db = &*self.db_pool;

        let record = StockTransactionEntity::find_by_id(transaction_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, transaction_id = %transaction_id, "Failed to fetch transaction");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Transaction with ID {} not found",
                    transaction_id
                ))
            })?;

        Ok(self.model_to_response(record))
    }

    /// Lists transactions newest-first, optionally scoped to one material
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        page: u64,
        per_page: u64,
        material_id: Option<Uuid>,
    ) -> Result<TransactionListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = StockTransactionEntity::find();
        if let Some(id) = material_id {
            query = query.filter(stock_transaction::Column::MaterialId.eq(id));
        }

        let paginator = query
            .order_by_desc(stock_transaction::Column::RecordedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count transactions");
            ServiceError::DatabaseError(e)
        })?;

        let records = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, per_page = per_page, "Failed to fetch transactions page");
            ServiceError::DatabaseError(e)
        })?;

        let transactions: Vec<TransactionResponse> = records
            .into_iter()
            .map(|model| self.model_to_response(model))
            .collect();

        Ok(TransactionListResponse {
            transactions,
            total,
            page,
            per_page,
        })
    }

    /// Deletes a transaction and backs its effect out of the parent material.
    ///
    /// A missing parent material does not block the delete; the orphaned log
    /// row is simply removed.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            ServiceError::DatabaseError(e)
        })?;

        let record = StockTransactionEntity::find_by_id(transaction_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, transaction_id = %transaction_id, "Failed to fetch transaction");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Transaction with ID {} not found",
                    transaction_id
                ))
            })?;

        let material_id = record.material_id;
        let material = MaterialEntity::find_by_id(material_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, material_id = %material_id, "Failed to fetch material");
                ServiceError::DatabaseError(e)
            })?;

        let mut quantity_change: Option<(f64, f64)> = None;
        if let Some(material) = material {
            let kind = record
                .kind
                .parse()
                .unwrap_or(TransactionKind::Adjustment);
            let material_unit = Unit::parse_or_default(&material.unit);
            let entries = decode_entries(&material.storage_entries);
            let delta = decode_entries(&record.storage_entries);
            let previous_quantity = material.current_quantity;

            let outcome = reverse(&entries, &delta, kind, material_unit);

            let mut active: material::ActiveModel = material.into();
            active.storage_entries = Set(encode_entries(&outcome.entries));
            active.current_quantity = Set(outcome.current_quantity);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await.map_err(|e| {
                error!(error = %e, material_id = %material_id, "Failed to restore material quantity");
                ServiceError::DatabaseError(e)
            })?;

            quantity_change = Some((previous_quantity, outcome.current_quantity));
        } else {
            warn!(
                transaction_id = %transaction_id,
                material_id = %material_id,
                "Deleting transaction whose material no longer exists"
            );
        }

        StockTransactionEntity::delete_by_id(transaction_id)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, transaction_id = %transaction_id, "Failed to delete transaction");
                ServiceError::DatabaseError(e)
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            transaction_id = %transaction_id,
            material_id = %material_id,
            "Stock transaction deleted and reversed"
        );

        self.emit(Event::TransactionReversed {
            transaction_id,
            material_id,
        })
        .await;
        if let Some((previous_quantity, new_quantity)) = quantity_change {
            self.emit(Event::MaterialQuantityChanged {
                material_id,
                previous_quantity,
                new_quantity,
            })
            .await;
        }

        Ok(())
    }

    /// Renders the transaction log as a CSV report, newest entries first
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<String, ServiceError> {
        use crate::services::{csv_field, csv_row};

        let db = &*self.db_pool;

        let records = StockTransactionEntity::find()
            .order_by_desc(stock_transaction::Column::RecordedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch transactions for export");
                ServiceError::DatabaseError(e)
            })?;

        let mut csv = csv_row(&[
            csv_field("Date"),
            csv_field("Material"),
            csv_field("Lot Number"),
            csv_field("Type"),
            csv_field("Quantity"),
            csv_field("Unit"),
            csv_field("Recipient"),
            csv_field("Aliquots"),
            csv_field("Recorded At"),
            csv_field("Notes"),
        ]);

        for record in records {
            let aliquots = decode_entries(&record.storage_entries)
                .iter()
                .flat_map(|entry| {
                    entry.aliquots.iter().map(|aliquot| {
                        format!("{} x {} {}", aliquot.count, aliquot.size, aliquot.unit)
                    })
                })
                .collect::<Vec<_>>()
                .join("; ");

            csv.push_str(&csv_row(&[
                csv_field(&record.occurred_on.to_string()),
                csv_field(&record.material_name),
                csv_field(&record.lot_number),
                csv_field(&record.kind),
                csv_field(&record.quantity.to_string()),
                csv_field(&record.unit),
                csv_field(record.recipient.as_deref().unwrap_or("")),
                csv_field(&aliquots),
                csv_field(&record.recorded_at.to_rfc3339()),
                csv_field(record.notes.as_deref().unwrap_or("")),
            ]));
        }

        Ok(csv)
    }

    fn model_to_response(&self, model: stock_transaction::Model) -> TransactionResponse {
        let storage_entries = decode_entries(&model.storage_entries);
        TransactionResponse {
            id: model.id,
            material_id: model.material_id,
            material_name: model.material_name,
            lot_number: model.lot_number,
            kind: model.kind.parse().unwrap_or(TransactionKind::Adjustment),
            quantity: model.quantity,
            unit: Unit::parse_or_default(&model.unit),
            occurred_on: model.occurred_on,
            recorded_at: model.recorded_at,
            recipient: model.recipient,
            storage_entries,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
