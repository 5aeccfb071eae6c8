//! SQLite-backed implementation of the pipeline's ledger boundary.
//!
//! The pipeline only ever asks two things of the ledger: a ±window lookup
//! for the dedup pass and an insert-only commit. The `entries` table carries
//! a unique fingerprint index, so a concurrent import racing to the same
//! record loses at the database instead of double-committing.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{ActiveValue, DatabaseConnection, QueryFilter, QueryOrder, entity::prelude::*};
use uuid::Uuid;

use importer::{
    Fingerprint, LedgerError, LedgerStore, LedgerTransaction, MoneyCents, NormalizedTransaction,
    PaymentKind, Provenance,
};

pub mod entries {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "entries")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub occurred_on: Date,
        pub amount_minor: i64,
        pub description: String,
        pub kind: String,
        pub card: Option<String>,
        pub category: Option<String>,
        #[sea_orm(unique)]
        pub fingerprint: String,
        pub import_source: Option<String>,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Clone, Debug)]
pub struct SqlLedger {
    database: DatabaseConnection,
}

impl SqlLedger {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

/// Maps a stored row into the read model the dedup pass compares against.
fn to_ledger_transaction(model: entries::Model) -> Result<LedgerTransaction, LedgerError> {
    Ok(LedgerTransaction {
        id: Uuid::parse_str(&model.id)
            .map_err(|_| LedgerError::Database(format!("invalid entry id: {}", model.id)))?,
        date: model.occurred_on,
        amount: MoneyCents::new(model.amount_minor),
        description: model.description,
        kind: PaymentKind::try_from(model.kind.as_str()).map_err(LedgerError::Database)?,
        card: model.card,
        fingerprint: Fingerprint::from_hex(model.fingerprint),
    })
}

#[async_trait]
impl LedgerStore for SqlLedger {
    async fn lookup_near(
        &self,
        date: NaiveDate,
        amount: MoneyCents,
        window_days: i64,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let window = Days::new(window_days.unsigned_abs());
        let from = date.checked_sub_days(window).unwrap_or(date);
        let to = date.checked_add_days(window).unwrap_or(date);

        let models = entries::Entity::find()
            .filter(entries::Column::OccurredOn.between(from, to))
            .filter(entries::Column::AmountMinor.eq(amount.cents()))
            .order_by_asc(entries::Column::OccurredOn)
            .order_by_asc(entries::Column::Id)
            .all(&self.database)
            .await
            .map_err(|err| LedgerError::Database(err.to_string()))?;

        models.into_iter().map(to_ledger_transaction).collect()
    }

    async fn insert(
        &self,
        tx: &NormalizedTransaction,
        fingerprint: &Fingerprint,
        source: &Provenance,
    ) -> Result<LedgerTransaction, LedgerError> {
        let model = entries::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            occurred_on: ActiveValue::Set(tx.date),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            description: ActiveValue::Set(tx.description.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            card: ActiveValue::Set(tx.card.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            fingerprint: ActiveValue::Set(fingerprint.as_str().to_string()),
            import_source: ActiveValue::Set(Some(format!("{}:{}", source.provider, source.origin))),
            created_at: ActiveValue::Set(Utc::now()),
        };

        match model.insert(&self.database).await {
            Ok(inserted) => {
                tracing::debug!(id = %inserted.id, "ledger entry inserted");
                to_ledger_transaction(inserted)
            }
            Err(err) => {
                let message = err.to_string();
                // A unique-index hit means a concurrent import committed the
                // same fingerprint between our lookup and this insert.
                if message.to_lowercase().contains("unique") {
                    Err(LedgerError::Rejected(format!(
                        "duplicate fingerprint: {fingerprint}"
                    )))
                } else {
                    Err(LedgerError::Database(message))
                }
            }
        }
    }
}
