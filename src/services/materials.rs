use crate::{
    db::DbPool,
    entities::material::{self, Entity as MaterialEntity},
    entities::stock_transaction::{self, Entity as StockTransactionEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    inventory::storage::{aggregate, decode_entries, encode_entries, StorageEntry},
    inventory::units::{lenient_f64, Unit},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Request/Response types for the material service
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, message = "Material name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Project is required"))]
    pub project: String,
    #[validate(length(min = 1, message = "Lot number is required"))]
    pub lot_number: String,
    #[serde(default)]
    pub storage_entries: Vec<StorageEntry>,
    pub concentration: Option<String>,
    pub submission_date: NaiveDate,
    #[validate(length(min = 1, message = "Storage condition is required"))]
    pub storage_condition: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(custom = "validate_quantity")]
    pub submitted_volume: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(custom = "validate_quantity")]
    pub retain_amount: f64,
    #[serde(default)]
    pub retain_unit: Unit,
    pub label_info: Option<String>,
    pub notes: Option<String>,
}

/// Full-replace edit payload; carries the same shape as creation.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterialRequest {
    #[validate(length(min = 1, message = "Material name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Project is required"))]
    pub project: String,
    #[validate(length(min = 1, message = "Lot number is required"))]
    pub lot_number: String,
    #[serde(default)]
    pub storage_entries: Vec<StorageEntry>,
    pub concentration: Option<String>,
    pub submission_date: NaiveDate,
    #[validate(length(min = 1, message = "Storage condition is required"))]
    pub storage_condition: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(custom = "validate_quantity")]
    pub submitted_volume: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(custom = "validate_quantity")]
    pub retain_amount: f64,
    #[serde(default)]
    pub retain_unit: Unit,
    pub label_info: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaterialResponse {
    pub id: Uuid,
    pub name: String,
    pub project: String,
    pub lot_number: String,
    pub storage_entries: Vec<StorageEntry>,
    pub concentration: Option<String>,
    pub submission_date: NaiveDate,
    pub storage_condition: String,
    pub submitted_volume: f64,
    pub unit: Unit,
    pub retain_amount: f64,
    pub retain_unit: Unit,
    pub current_quantity: f64,
    pub label_info: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MaterialListResponse {
    pub materials: Vec<MaterialResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Dashboard statistics over the inventory
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventorySummary {
    pub total_materials: u64,
    pub depleted_materials: u64,
    pub submitted_last_week: u64,
    pub transactions_today: u64,
}

fn validate_quantity(value: &f64) -> Result<(), ValidationError> {
    if !value.is_finite() || *value < 0.0 {
        let mut err = ValidationError::new("quantity");
        err.message = Some("Must be a finite, non-negative number".into());
        return Err(err);
    }
    Ok(())
}

/// Service for managing materials and their storage layouts
#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl MaterialService {
    /// Creates a new material service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send material event");
            }
        }
    }

    // The running quantity mirrors the storage layout when one is given;
    // a material registered without a layout starts at its submitted volume.
    fn derive_quantity(entries: &[StorageEntry], submitted_volume: f64, unit: Unit) -> f64 {
        if entries.is_empty() {
            submitted_volume
        } else {
            aggregate(entries, unit)
        }
    }

    /// Registers a new material in the inventory
    #[instrument(skip(self, request), fields(name = %request.name, project = %request.project))]
    pub async fn create_material(
        &self,
        request: CreateMaterialRequest,
    ) -> Result<MaterialResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let material_id = Uuid::new_v4();

        let current_quantity =
            Self::derive_quantity(&request.storage_entries, request.submitted_volume, request.unit);

        let material = material::ActiveModel {
            id: Set(material_id),
            name: Set(request.name.clone()),
            project: Set(request.project.clone()),
            lot_number: Set(request.lot_number.clone()),
            storage_entries: Set(encode_entries(&request.storage_entries)),
            concentration: Set(request.concentration),
            submission_date: Set(request.submission_date),
            storage_condition: Set(request.storage_condition),
            submitted_volume: Set(request.submitted_volume),
            unit: Set(request.unit.to_string()),
            retain_amount: Set(request.retain_amount),
            retain_unit: Set(request.retain_unit.to_string()),
            current_quantity: Set(current_quantity),
            label_info: Set(request.label_info),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let model = material.insert(db).await.map_err(|e| {
            error!(error = %e, material_id = %material_id, "Failed to create material in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(material_id = %material_id, current_quantity, "Material created successfully");

        self.emit(Event::MaterialCreated(material_id)).await;

        Ok(self.model_to_response(model))
    }

    /// Retrieves a material by ID
    #[instrument(skip(self), fields(material_id = %material_id))]
    pub async fn get_material(&self, material_id: Uuid) -> Result<MaterialResponse, ServiceError> {
        let db = &*self.db_pool;

        let material = MaterialEntity::find_by_id(material_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, material_id = %material_id, "Failed to fetch material from database");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Material with ID {} not found", material_id))
            })?;

        Ok(self.model_to_response(material))
    }

    /// Lists materials with pagination and optional search over
    /// name/project/lot number
    #[instrument(skip(self))]
    pub async fn list_materials(
        &self,
        page: u64,
        per_page: u64,
        search: Option<&str>,
    ) -> Result<MaterialListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = MaterialEntity::find();
        if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(material::Column::Name.contains(term))
                    .add(material::Column::Project.contains(term))
                    .add(material::Column::LotNumber.contains(term)),
            );
        }

        let paginator = query
            .order_by_desc(material::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count materials");
            ServiceError::DatabaseError(e)
        })?;

        let materials = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, per_page = per_page, "Failed to fetch materials page");
            ServiceError::DatabaseError(e)
        })?;

        let materials: Vec<MaterialResponse> = materials
            .into_iter()
            .map(|model| self.model_to_response(model))
            .collect();

        info!(
            total = total,
            page = page,
            returned_count = materials.len(),
            "Materials listed successfully"
        );

        Ok(MaterialListResponse {
            materials,
            total,
            page,
            per_page,
        })
    }

    /// Replaces a material's mutable fields and recomputes its quantity
    #[instrument(skip(self, request), fields(material_id = %material_id))]
    pub async fn update_material(
        &self,
        material_id: Uuid,
        request: UpdateMaterialRequest,
    ) -> Result<MaterialResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let existing = MaterialEntity::find_by_id(material_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, material_id = %material_id, "Failed to find material for update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Material with ID {} not found", material_id))
            })?;

        let current_quantity =
            Self::derive_quantity(&request.storage_entries, request.submitted_volume, request.unit);

        let mut active: material::ActiveModel = existing.into();
        active.name = Set(request.name);
        active.project = Set(request.project);
        active.lot_number = Set(request.lot_number);
        active.storage_entries = Set(encode_entries(&request.storage_entries));
        active.concentration = Set(request.concentration);
        active.submission_date = Set(request.submission_date);
        active.storage_condition = Set(request.storage_condition);
        active.submitted_volume = Set(request.submitted_volume);
        active.unit = Set(request.unit.to_string());
        active.retain_amount = Set(request.retain_amount);
        active.retain_unit = Set(request.retain_unit.to_string());
        active.current_quantity = Set(current_quantity);
        active.label_info = Set(request.label_info);
        active.notes = Set(request.notes);
        active.updated_at = Set(Some(now));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, material_id = %material_id, "Failed to update material");
            ServiceError::DatabaseError(e)
        })?;

        info!(material_id = %material_id, current_quantity, "Material updated successfully");

        self.emit(Event::MaterialUpdated(material_id)).await;

        Ok(self.model_to_response(updated))
    }

    /// Deletes a material record. Its transaction history is kept.
    #[instrument(skip(self), fields(material_id = %material_id))]
    pub async fn delete_material(&self, material_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = MaterialEntity::delete_by_id(material_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, material_id = %material_id, "Failed to delete material");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Material with ID {} not found",
                material_id
            )));
        }

        info!(material_id = %material_id, "Material deleted successfully");

        self.emit(Event::MaterialDeleted(material_id)).await;

        Ok(())
    }

    /// Dashboard statistics for the landing page
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<InventorySummary, ServiceError> {
        let db = &*self.db_pool;

        let total_materials = MaterialEntity::find().count(db).await.map_err(|e| {
            error!(error = %e, "Failed to count materials");
            ServiceError::DatabaseError(e)
        })?;

        let depleted_materials = MaterialEntity::find()
            .filter(material::Column::CurrentQuantity.eq(0.0))
            .count(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count depleted materials");
                ServiceError::DatabaseError(e)
            })?;

        let week_ago = Utc::now().date_naive() - Duration::days(7);
        let submitted_last_week = MaterialEntity::find()
            .filter(material::Column::SubmissionDate.gte(week_ago))
            .count(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count recent submissions");
                ServiceError::DatabaseError(e)
            })?;

        let today_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let transactions_today = StockTransactionEntity::find()
            .filter(stock_transaction::Column::RecordedAt.gte(today_start))
            .count(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count today's transactions");
                ServiceError::DatabaseError(e)
            })?;

        Ok(InventorySummary {
            total_materials,
            depleted_materials,
            submitted_last_week,
            transactions_today,
        })
    }

    /// Renders the whole inventory as a CSV report
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<String, ServiceError> {
        use crate::services::{csv_field, csv_row};

        let db = &*self.db_pool;

        let materials = MaterialEntity::find()
            .order_by_asc(material::Column::Name)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch materials for export");
                ServiceError::DatabaseError(e)
            })?;

        let mut csv = csv_row(&[
            csv_field("Name"),
            csv_field("Project"),
            csv_field("Lot Number"),
            csv_field("Storage Condition"),
            csv_field("Submitted Volume"),
            csv_field("Unit"),
            csv_field("Retain Amount"),
            csv_field("Current Quantity"),
            csv_field("Storage Locations"),
            csv_field("Concentration"),
            csv_field("Submission Date"),
            csv_field("Notes"),
        ]);

        for material in materials {
            let entries = decode_entries(&material.storage_entries);
            let locations = entries
                .iter()
                .map(|entry| entry.location.as_str())
                .collect::<Vec<_>>()
                .join("; ");

            csv.push_str(&csv_row(&[
                csv_field(&material.name),
                csv_field(&material.project),
                csv_field(&material.lot_number),
                csv_field(&material.storage_condition),
                csv_field(&material.submitted_volume.to_string()),
                csv_field(&material.unit),
                csv_field(&material.retain_amount.to_string()),
                csv_field(&material.current_quantity.to_string()),
                csv_field(&locations),
                csv_field(material.concentration.as_deref().unwrap_or("")),
                csv_field(&material.submission_date.to_string()),
                csv_field(material.notes.as_deref().unwrap_or("")),
            ]));
        }

        Ok(csv)
    }

    fn model_to_response(&self, model: material::Model) -> MaterialResponse {
        let storage_entries = decode_entries(&model.storage_entries);
        MaterialResponse {
            id: model.id,
            name: model.name,
            project: model.project,
            lot_number: model.lot_number,
            storage_entries,
            concentration: model.concentration,
            submission_date: model.submission_date,
            storage_condition: model.storage_condition,
            submitted_volume: model.submitted_volume,
            unit: Unit::parse_or_default(&model.unit),
            retain_amount: model.retain_amount,
            retain_unit: Unit::parse_or_default(&model.retain_unit),
            current_quantity: model.current_quantity,
            label_info: model.label_info,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
