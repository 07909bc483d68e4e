use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_production_schedules_table::Migration),
            Box::new(m20250101_000002_create_dip_tables::Migration),
            Box::new(m20250101_000003_create_aoi_records_table::Migration),
            Box::new(m20250101_000004_create_reference_tables::Migration),
            Box::new(m20250101_000005_create_users_table::Migration),
        ]
    }
}

mod m20250101_000001_create_production_schedules_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_production_schedules_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionSchedules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionSchedules::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductionSchedules::ProdYear).integer().not_null())
                        .col(ColumnDef::new(ProductionSchedules::ProdMonth).integer().not_null())
                        .col(ColumnDef::new(ProductionSchedules::ProdWeek).integer().not_null())
                        .col(ColumnDef::new(ProductionSchedules::Line).string_len(50).not_null())
                        .col(ColumnDef::new(ProductionSchedules::Company).string_len(100).null())
                        .col(ColumnDef::new(ProductionSchedules::Model).string_len(100).not_null())
                        .col(ColumnDef::new(ProductionSchedules::OrderYear).integer().null())
                        .col(ColumnDef::new(ProductionSchedules::OrderMonth).integer().null())
                        .col(ColumnDef::new(ProductionSchedules::Tb).string_len(8).null())
                        .col(ColumnDef::new(ProductionSchedules::StartDate).string_len(10).null())
                        .col(ColumnDef::new(ProductionSchedules::EndDate).string_len(10).null())
                        .col(ColumnDef::new(ProductionSchedules::Manager).string_len(50).null())
                        .col(
                            ColumnDef::new(ProductionSchedules::ActualProd)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionSchedules::ActualStartDate)
                                .string_len(10)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionSchedules::ActualEndDate)
                                .string_len(10)
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionSchedules::Notes).text().null())
                        .col(
                            ColumnDef::new(ProductionSchedules::BatchQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionSchedules::TotalQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_schedules_week")
                        .table(ProductionSchedules::Table)
                        .col(ProductionSchedules::ProdYear)
                        .col(ProductionSchedules::ProdMonth)
                        .col(ProductionSchedules::ProdWeek)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_schedules_order_month")
                        .table(ProductionSchedules::Table)
                        .col(ProductionSchedules::OrderYear)
                        .col(ProductionSchedules::OrderMonth)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionSchedules::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductionSchedules {
        Table,
        Id,
        ProdYear,
        ProdMonth,
        ProdWeek,
        Line,
        Company,
        Model,
        OrderYear,
        OrderMonth,
        Tb,
        StartDate,
        EndDate,
        Manager,
        ActualProd,
        ActualStartDate,
        ActualEndDate,
        Notes,
        BatchQuantity,
        TotalQuantity,
    }
}

mod m20250101_000002_create_dip_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_dip_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DipGroups::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DipGroups::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DipGroups::Model).string_len(100).not_null())
                        .col(ColumnDef::new(DipGroups::Lot).string_len(50).not_null())
                        .col(ColumnDef::new(DipGroups::Year).integer().not_null())
                        .col(ColumnDef::new(DipGroups::Month).integer().not_null())
                        .col(
                            ColumnDef::new(DipGroups::Status)
                                .string_len(20)
                                .not_null()
                                .default("ongoing"),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_dip_groups_model_year_month_lot")
                        .table(DipGroups::Table)
                        .col(DipGroups::Model)
                        .col(DipGroups::Year)
                        .col(DipGroups::Month)
                        .col(DipGroups::Lot)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DipHistories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DipHistories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DipHistories::GroupId).integer().not_null())
                        .col(ColumnDef::new(DipHistories::Date).string_len(10).not_null())
                        .col(ColumnDef::new(DipHistories::Type).string_len(10).not_null())
                        .col(
                            ColumnDef::new(DipHistories::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DipHistories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_dip_histories_group_id")
                                .from(DipHistories::Table, DipHistories::GroupId)
                                .to(DipGroups::Table, DipGroups::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dip_histories_group_id")
                        .table(DipHistories::Table)
                        .col(DipHistories::GroupId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DipHistories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DipGroups::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DipGroups {
        Table,
        Id,
        Model,
        Lot,
        Year,
        Month,
        Status,
    }

    #[derive(DeriveIden)]
    enum DipHistories {
        Table,
        Id,
        GroupId,
        Date,
        Type,
        Quantity,
        CreatedAt,
    }
}

mod m20250101_000003_create_aoi_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_aoi_records_table"
        }
    }

    const DEFECT_COLUMNS: [AoiRecords; 14] = [
        AoiRecords::Missing,
        AoiRecords::Wrong,
        AoiRecords::Reverse,
        AoiRecords::Skewed,
        AoiRecords::Flipped,
        AoiRecords::Damaged,
        AoiRecords::Manhattan,
        AoiRecords::Detached,
        AoiRecords::Cold,
        AoiRecords::Unsoldered,
        AoiRecords::Short,
        AoiRecords::Lifted,
        AoiRecords::Material,
        AoiRecords::Dip,
    ];

    const REF_COLUMNS: [AoiRecords; 14] = [
        AoiRecords::MissingRef,
        AoiRecords::WrongRef,
        AoiRecords::ReverseRef,
        AoiRecords::SkewedRef,
        AoiRecords::FlippedRef,
        AoiRecords::DamagedRef,
        AoiRecords::ManhattanRef,
        AoiRecords::DetachedRef,
        AoiRecords::ColdRef,
        AoiRecords::UnsolderedRef,
        AoiRecords::ShortRef,
        AoiRecords::LiftedRef,
        AoiRecords::MaterialRef,
        AoiRecords::DipRef,
    ];

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(AoiRecords::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(AoiRecords::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(AoiRecords::Model).string_len(100).not_null())
                .col(ColumnDef::new(AoiRecords::OrderYear).integer().not_null())
                .col(ColumnDef::new(AoiRecords::OrderMonth).integer().not_null())
                .col(ColumnDef::new(AoiRecords::Lot).string_len(50).not_null())
                .col(ColumnDef::new(AoiRecords::Date).string_len(10).not_null())
                .col(
                    ColumnDef::new(AoiRecords::InspectionPoint)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(AoiRecords::InspectionQty)
                        .integer()
                        .not_null()
                        .default(0),
                );
            for column in DEFECT_COLUMNS {
                table.col(ColumnDef::new(column).integer().not_null().default(0));
            }
            for column in REF_COLUMNS {
                table.col(ColumnDef::new(column).text().not_null().default(""));
            }
            table
                .col(
                    ColumnDef::new(AoiRecords::TotalDefect)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(AoiRecords::GoodQty)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(AoiRecords::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                );

            manager.create_table(table.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_aoi_records_lot_key")
                        .table(AoiRecords::Table)
                        .col(AoiRecords::Model)
                        .col(AoiRecords::OrderYear)
                        .col(AoiRecords::OrderMonth)
                        .col(AoiRecords::Lot)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_aoi_records_date")
                        .table(AoiRecords::Table)
                        .col(AoiRecords::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AoiRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum AoiRecords {
        Table,
        Id,
        Model,
        OrderYear,
        OrderMonth,
        Lot,
        Date,
        InspectionPoint,
        InspectionQty,
        Missing,
        Wrong,
        Reverse,
        Skewed,
        Flipped,
        Damaged,
        Manhattan,
        Detached,
        Cold,
        Unsoldered,
        Short,
        Lifted,
        Material,
        Dip,
        MissingRef,
        WrongRef,
        ReverseRef,
        SkewedRef,
        FlippedRef,
        DamagedRef,
        ManhattanRef,
        DetachedRef,
        ColdRef,
        UnsolderedRef,
        ShortRef,
        LiftedRef,
        MaterialRef,
        DipRef,
        TotalDefect,
        GoodQty,
        CreatedAt,
    }
}

mod m20250101_000004_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Companies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Companies::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Companies::Name)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Managers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Managers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Managers::Name)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ModelFolders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ModelFolders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ModelFolders::CompanyId).integer().not_null())
                        .col(ColumnDef::new(ModelFolders::Name).string_len(100).not_null())
                        .col(
                            ColumnDef::new(ModelFolders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_model_folders_company_id")
                                .from(ModelFolders::Table, ModelFolders::CompanyId)
                                .to(Companies::Table, Companies::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_model_folders_company_name")
                        .table(ModelFolders::Table)
                        .col(ModelFolders::CompanyId)
                        .col(ModelFolders::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductModels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductModels::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductModels::Name).string_len(100).not_null())
                        .col(ColumnDef::new(ProductModels::CompanyId).integer().not_null())
                        .col(ColumnDef::new(ProductModels::FolderId).integer().null())
                        .col(
                            ColumnDef::new(ProductModels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_models_company_id")
                                .from(ProductModels::Table, ProductModels::CompanyId)
                                .to(Companies::Table, Companies::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_models_folder_id")
                                .from(ProductModels::Table, ProductModels::FolderId)
                                .to(ModelFolders::Table, ModelFolders::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ModelFiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ModelFiles::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ModelFiles::ModelId).integer().not_null())
                        .col(ColumnDef::new(ModelFiles::DataType).string_len(50).not_null())
                        .col(ColumnDef::new(ModelFiles::FileName).string_len(255).not_null())
                        .col(ColumnDef::new(ModelFiles::StoredPath).string_len(500).not_null())
                        .col(ColumnDef::new(ModelFiles::ContentType).string_len(100).null())
                        .col(
                            ColumnDef::new(ModelFiles::SizeBytes)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ModelFiles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_model_files_model_id")
                                .from(ModelFiles::Table, ModelFiles::ModelId)
                                .to(ProductModels::Table, ProductModels::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_model_files_model_id")
                        .table(ModelFiles::Table)
                        .col(ModelFiles::ModelId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ModelFiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductModels::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ModelFolders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Managers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Companies::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Companies {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum Managers {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum ModelFolders {
        Table,
        Id,
        CompanyId,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductModels {
        Table,
        Id,
        Name,
        CompanyId,
        FolderId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ModelFiles {
        Table,
        Id,
        ModelId,
        DataType,
        FileName,
        StoredPath,
        ContentType,
        SizeBytes,
        UpdatedAt,
    }
}

mod m20250101_000005_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(16)
                                .not_null()
                                .default("user"),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        PasswordHash,
        Role,
    }
}
