use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Entries {
    Table,
    Id,
    OccurredOn,
    AmountMinor,
    Description,
    Kind,
    Card,
    Category,
    Fingerprint,
    ImportSource,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Entries::OccurredOn).date().not_null())
                    .col(
                        ColumnDef::new(Entries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entries::Description).string().not_null())
                    .col(ColumnDef::new(Entries::Kind).string().not_null())
                    .col(ColumnDef::new(Entries::Card).string())
                    .col(ColumnDef::new(Entries::Category).string())
                    .col(ColumnDef::new(Entries::Fingerprint).string().not_null())
                    .col(ColumnDef::new(Entries::ImportSource).string())
                    .col(ColumnDef::new(Entries::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // The dedup guarantee under concurrent imports: the second writer of
        // the same fingerprint loses here, not in application code.
        manager
            .create_index(
                Index::create()
                    .name("uidx-entries-fingerprint")
                    .table(Entries::Table)
                    .col(Entries::Fingerprint)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // lookup_near filters by date window and exact amount.
        manager
            .create_index(
                Index::create()
                    .name("idx-entries-occurred_on-amount_minor")
                    .table(Entries::Table)
                    .col(Entries::OccurredOn)
                    .col(Entries::AmountMinor)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await
    }
}
