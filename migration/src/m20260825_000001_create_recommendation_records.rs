use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create recommendation_records table
        manager
            .create_table(
                Table::create()
                    .table(RecommendationRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecommendationRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::Symbol)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::Category)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::Recommendation)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::AiScore)
                            .integer()
                            .not_null()
                            .default(50),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::Signal)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(RecommendationRecords::Reason).text())
                    .col(
                        ColumnDef::new(RecommendationRecords::EntryPrice)
                            .decimal_len(16, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::EntryDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::EntryDay)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::CurrentPrice)
                            .decimal_len(16, 6)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::PriceUpdatedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::ClosePrice)
                            .decimal_len(16, 6)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::CloseDate)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::CloseReason)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::ProfitPercent)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::HoldingDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(RecommendationRecords::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Indexes matching the hot query paths: status sweeps, symbol lookups
        // and the per-day (symbol, category) dedup probe. The dedup index is
        // unique so concurrent creates cannot slip in a same-day duplicate.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_recommendation_records_status")
                    .table(RecommendationRecords::Table)
                    .col(RecommendationRecords::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_recommendation_records_symbol_category_entry_day")
                    .table(RecommendationRecords::Table)
                    .col(RecommendationRecords::Symbol)
                    .col(RecommendationRecords::Category)
                    .col(RecommendationRecords::EntryDay)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_recommendation_records_entry_date")
                    .table(RecommendationRecords::Table)
                    .col(RecommendationRecords::EntryDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(RecommendationRecords::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum RecommendationRecords {
    Table,
    Id,
    Symbol,
    Name,
    Category,
    Recommendation,
    AiScore,
    Signal,
    Reason,
    EntryPrice,
    EntryDate,
    EntryDay,
    CurrentPrice,
    PriceUpdatedAt,
    Status,
    ClosePrice,
    CloseDate,
    CloseReason,
    ProfitPercent,
    HoldingDays,
    CreatedAt,
    UpdatedAt,
}
