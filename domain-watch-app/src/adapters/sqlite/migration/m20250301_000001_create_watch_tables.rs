use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // domains
        manager
            .create_table(
                Table::create()
                    .table(Domain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domain::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domain::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Domain::Extension).string().not_null())
                    .col(ColumnDef::new(Domain::Niche).string().null())
                    .col(
                        ColumnDef::new(Domain::Traffic)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Domain::ReferringDomains)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Domain::Status)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(Domain::PreviousStatus)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(Domain::LastChecked).string().null())
                    .col(ColumnDef::new(Domain::LastAvailable).string().null())
                    .col(
                        ColumnDef::new(Domain::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Domain::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Domain::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_domains_active_status")
                    .table(Domain::Table)
                    .col(Domain::IsActive)
                    .col(Domain::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // check_logs
        manager
            .create_table(
                Table::create()
                    .table(CheckLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckLog::DomainId).integer().not_null())
                    .col(ColumnDef::new(CheckLog::Verdict).string().not_null())
                    .col(ColumnDef::new(CheckLog::Path).string().not_null())
                    .col(
                        ColumnDef::new(CheckLog::LatencyMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CheckLog::Error).text().null())
                    .col(
                        ColumnDef::new(CheckLog::NotificationTriggered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(CheckLog::CheckedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_check_logs_domain")
                            .from(CheckLog::Table, CheckLog::DomainId)
                            .to(Domain::Table, Domain::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_check_logs_domain_checked_at")
                    .table(CheckLog::Table)
                    .col(CheckLog::DomainId)
                    .col(CheckLog::CheckedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // notifications
        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notification::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notification::DomainId).integer().not_null())
                    .col(ColumnDef::new(Notification::Kind).string().not_null())
                    .col(ColumnDef::new(Notification::HttpStatus).integer().null())
                    .col(
                        ColumnDef::new(Notification::Success)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Notification::Response).text().null())
                    .col(
                        ColumnDef::new(Notification::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Notification::SentAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_domain")
                            .from(Notification::Table, Notification::DomainId)
                            .to(Domain::Table, Domain::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_sent_at")
                    .table(Notification::Table)
                    .col(Notification::SentAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CheckLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Domain::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Domain {
    #[sea_orm(iden = "domains")]
    Table,
    Id,
    Name,
    Extension,
    Niche,
    Traffic,
    ReferringDomains,
    Status,
    PreviousStatus,
    LastChecked,
    LastAvailable,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CheckLog {
    #[sea_orm(iden = "check_logs")]
    Table,
    Id,
    DomainId,
    Verdict,
    Path,
    LatencyMs,
    Error,
    NotificationTriggered,
    CheckedAt,
}

#[derive(DeriveIden)]
enum Notification {
    #[sea_orm(iden = "notifications")]
    Table,
    Id,
    DomainId,
    Kind,
    HttpStatus,
    Success,
    Response,
    Attempts,
    SentAt,
}
