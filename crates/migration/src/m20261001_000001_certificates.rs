use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Certificates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Certificates::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Certificates::FirstName).text().not_null())
                    .col(ColumnDef::new(Certificates::MiddleName).text().null())
                    .col(
                        ColumnDef::new(Certificates::PaternalLastName)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Certificates::MaternalLastName).text().null())
                    .col(ColumnDef::new(Certificates::Certificate).text().not_null())
                    .col(ColumnDef::new(Certificates::DateIssued).date().not_null())
                    .col(ColumnDef::new(Certificates::TimeIssued).time().not_null())
                    .col(
                        ColumnDef::new(Certificates::ExpiryDate)
                            .string()
                            .not_null()
                            .default("Never"),
                    )
                    .col(
                        ColumnDef::new(Certificates::Status)
                            .string()
                            .not_null()
                            .default("Valid"),
                    )
                    .col(
                        ColumnDef::new(Certificates::HoursQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Certificates::PdfUrl).text().null())
                    .col(
                        ColumnDef::new(Certificates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Certificates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Certificates::HoursQuantity).gte(0))
                    .check(Expr::col(Certificates::Status).is_in(["Valid", "Invalid"]))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Certificates::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Certificates {
    Table,
    Id,
    FirstName,
    MiddleName,
    PaternalLastName,
    MaternalLastName,
    Certificate,
    DateIssued,
    TimeIssued,
    ExpiryDate,
    Status,
    HoursQuantity,
    PdfUrl,
    CreatedAt,
    UpdatedAt,
}
