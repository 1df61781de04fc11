use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_materials_table::Migration),
            Box::new(m20240101_000002_create_stock_transactions_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_materials_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_materials_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create materials table aligned with entities::material Model
            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Materials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::Project).string().not_null())
                        .col(ColumnDef::new(Materials::LotNumber).string().not_null())
                        .col(ColumnDef::new(Materials::StorageEntries).text().not_null())
                        .col(ColumnDef::new(Materials::Concentration).string().null())
                        .col(ColumnDef::new(Materials::SubmissionDate).date().not_null())
                        .col(
                            ColumnDef::new(Materials::StorageCondition)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::SubmittedVolume)
                                .double()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Materials::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Materials::RetainAmount)
                                .double()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Materials::RetainUnit).string().not_null())
                        .col(
                            ColumnDef::new(Materials::CurrentQuantity)
                                .double()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Materials::LabelInfo).string().null())
                        .col(ColumnDef::new(Materials::Notes).string().null())
                        .col(ColumnDef::new(Materials::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Materials::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // Useful indexes
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_materials_name")
                        .table(Materials::Table)
                        .col(Materials::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_materials_lot_number")
                        .table(Materials::Table)
                        .col(Materials::LotNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_materials_submission_date")
                        .table(Materials::Table)
                        .col(Materials::SubmissionDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Drop materials table
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Materials {
        Table,
        Id,
        Name,
        Project,
        LotNumber,
        StorageEntries,
        Concentration,
        SubmissionDate,
        StorageCondition,
        SubmittedVolume,
        Unit,
        RetainAmount,
        RetainUnit,
        CurrentQuantity,
        LabelInfo,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_transactions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to materials: the transaction log must outlive
            // deleted materials, so material_id is a plain column.
            manager
                .create_table(
                    Table::create()
                        .table(StockTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::MaterialId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::MaterialName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::LotNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Kind).string().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::Quantity)
                                .double()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockTransactions::Unit).string().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::OccurredOn)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::RecordedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Recipient)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::StorageEntries)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Notes).string().null())
                        .col(
                            ColumnDef::new(StockTransactions::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_material_id")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::MaterialId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_occurred_on")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::OccurredOn)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_recorded_at")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::RecordedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Drop stock_transactions table
            manager
                .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockTransactions {
        Table,
        Id,
        MaterialId,
        MaterialName,
        LotNumber,
        Kind,
        Quantity,
        Unit,
        OccurredOn,
        RecordedAt,
        Recipient,
        StorageEntries,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}
