use chrono::{NaiveDate, Utc};
use sea_orm::Database;

use importer::{
    Fingerprint, LedgerError, LedgerStore, MoneyCents, NormalizedTransaction, PaymentKind,
    Provenance, fingerprint,
};
use ledger::SqlLedger;
use migration::MigratorTrait;

async fn ledger_with_db() -> SqlLedger {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    SqlLedger::new(db)
}

fn tx(description: &str, cents: i64, date: (i32, u32, u32)) -> NormalizedTransaction {
    NormalizedTransaction {
        description: description.to_string(),
        amount: MoneyCents::new(cents),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        kind: PaymentKind::Card,
        card: Some("Visa".to_string()),
        category: Some("Food".to_string()),
    }
}

fn provenance() -> Provenance {
    Provenance {
        origin: "statement.pdf#page=1".to_string(),
        provider: "test".to_string(),
        captured_at: Utc::now(),
    }
}

#[tokio::test]
async fn insert_then_lookup_within_window() {
    let ledger = ledger_with_db().await;
    let record = tx("Coffee Shop", 550, (2025, 1, 10));
    let inserted = ledger
        .insert(&record, &fingerprint(&record), &provenance())
        .await
        .unwrap();
    assert_eq!(inserted.amount, MoneyCents::new(550));
    assert_eq!(inserted.description, "Coffee Shop");

    // One day off, same amount: inside the ±1 window.
    let nearby = ledger
        .lookup_near(
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
            MoneyCents::new(550),
            1,
        )
        .await
        .unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].id, inserted.id);
    assert_eq!(nearby[0].fingerprint, fingerprint(&record));
}

#[tokio::test]
async fn lookup_excludes_amount_and_date_mismatches() {
    let ledger = ledger_with_db().await;
    let record = tx("Coffee Shop", 550, (2025, 1, 10));
    ledger
        .insert(&record, &fingerprint(&record), &provenance())
        .await
        .unwrap();

    let wrong_amount = ledger
        .lookup_near(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            MoneyCents::new(551),
            1,
        )
        .await
        .unwrap();
    assert!(wrong_amount.is_empty());

    let too_far = ledger
        .lookup_near(
            NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
            MoneyCents::new(550),
            1,
        )
        .await
        .unwrap();
    assert!(too_far.is_empty());
}

#[tokio::test]
async fn duplicate_fingerprint_is_rejected_not_double_committed() {
    let ledger = ledger_with_db().await;
    let record = tx("Coffee Shop", 550, (2025, 1, 10));
    let print = fingerprint(&record);

    ledger.insert(&record, &print, &provenance()).await.unwrap();
    let second = ledger.insert(&record, &print, &provenance()).await;
    assert!(matches!(second, Err(LedgerError::Rejected(_))));

    let stored = ledger
        .lookup_near(record.date, record.amount, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn foreign_fingerprints_do_not_collide() {
    let ledger = ledger_with_db().await;
    let coffee = tx("Coffee Shop", 550, (2025, 1, 10));
    let tea = tx("Tea House", 550, (2025, 1, 10));

    ledger
        .insert(&coffee, &fingerprint(&coffee), &provenance())
        .await
        .unwrap();
    ledger
        .insert(&tea, &fingerprint(&tea), &provenance())
        .await
        .unwrap();

    let both = ledger
        .lookup_near(coffee.date, coffee.amount, 0)
        .await
        .unwrap();
    assert_eq!(both.len(), 2);
}

#[tokio::test]
async fn caller_supplied_fingerprint_survives_roundtrip() {
    let ledger = ledger_with_db().await;
    let record = tx("Market", 1999, (2025, 2, 1));
    let inserted = ledger
        .insert(&record, &Fingerprint::from_hex("abc123"), &provenance())
        .await
        .unwrap();
    assert_eq!(inserted.fingerprint, Fingerprint::from_hex("abc123"));
}
