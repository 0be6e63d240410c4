use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContentItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContentItems::ContentType).string().not_null())
                    .col(ColumnDef::new(ContentItems::Title).string().not_null())
                    .col(ColumnDef::new(ContentItems::Body).text().not_null())
                    .col(ColumnDef::new(ContentItems::Category).string().null())
                    .col(ColumnDef::new(ContentItems::Tags).json().not_null())
                    .col(ColumnDef::new(ContentItems::Attributes).json().not_null())
                    .col(ColumnDef::new(ContentItems::AuthorId).string().not_null())
                    .col(ColumnDef::new(ContentItems::Status).string().not_null())
                    .col(ColumnDef::new(ContentItems::RejectionReason).string().null())
                    .col(ColumnDef::new(ContentItems::History).json().not_null())
                    .col(
                        ColumnDef::new(ContentItems::Version)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ContentItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Listings filter by type and status.
        manager
            .create_index(
                Index::create()
                    .name("idx_content_items_type_status")
                    .table(ContentItems::Table)
                    .col(ContentItems::ContentType)
                    .col(ContentItems::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContentItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ContentItems {
    Table,
    Id,
    ContentType,
    Title,
    Body,
    Category,
    Tags,
    Attributes,
    AuthorId,
    Status,
    RejectionReason,
    History,
    Version,
    CreatedAt,
    UpdatedAt,
}
