use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubmissionRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubmissionRequests::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubmissionRequests::Id)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SubmissionRequests::ContentType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubmissionRequests::Action).string().not_null())
                    .col(ColumnDef::new(SubmissionRequests::TargetId).string().null())
                    .col(ColumnDef::new(SubmissionRequests::Payload).json().not_null())
                    .col(
                        ColumnDef::new(SubmissionRequests::SubmitterId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionRequests::SubmitterName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionRequests::SubmitterEmail)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubmissionRequests::ReviewerId).string().null())
                    .col(ColumnDef::new(SubmissionRequests::ReviewerNote).text().null())
                    .col(ColumnDef::new(SubmissionRequests::Status).string().not_null())
                    .col(
                        ColumnDef::new(SubmissionRequests::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionRequests::DecidedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SubmissionRequests::ApplyError).text().null())
                    .to_owned(),
            )
            .await?;

        // The review queue is read by status, oldest first.
        manager
            .create_index(
                Index::create()
                    .name("idx_submission_requests_status_submitted")
                    .table(SubmissionRequests::Table)
                    .col(SubmissionRequests::Status)
                    .col(SubmissionRequests::SubmittedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubmissionRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SubmissionRequests {
    Table,
    Seq,
    Id,
    ContentType,
    Action,
    TargetId,
    Payload,
    SubmitterId,
    SubmitterName,
    SubmitterEmail,
    ReviewerId,
    ReviewerNote,
    Status,
    SubmittedAt,
    DecidedAt,
    ApplyError,
}
