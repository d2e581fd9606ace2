//! End-to-end DML against the SQLite store:
//! 1. Open a store (in memory or on disk)
//! 2. Write records through a unit of work
//! 3. Read them back with SOQL

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sobject_dml::config::StoreConfig;
use sobject_dml::{
    Account, Binds, Case, Contact, Dml, DmlError, DmlResult, Lead, LockingMode, Opportunity,
    RecordId, Store,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn store() -> Store {
    Store::open_in_memory().unwrap().with_today(today())
}

fn count(store: &mut Store, soql: &str, binds: &Binds) -> i64 {
    store.transaction(|uow| uow.count(soql, binds)).unwrap()
}

// ==================== Transactions ====================

#[test]
fn test_commit_persists() {
    let mut store = store();
    store
        .transaction(|uow| uow.insert(&mut [Account::new("Acme")]))
        .unwrap();

    assert_eq!(count(&mut store, "SELECT COUNT() FROM Account", &Binds::new()), 1);
}

#[test]
fn test_error_rolls_back_whole_unit_of_work() {
    let mut store = store();
    let result: DmlResult<()> = store.transaction(|uow| {
        uow.insert(&mut [Account::new("Acme")])?;
        uow.insert(&mut [Lead {
            last_name: Some("NoCompany".into()),
            ..Default::default()
        }])?;
        Ok(())
    });

    assert!(matches!(
        result,
        Err(DmlError::RequiredFieldMissing { ref object, ref fields })
            if object == "Lead" && fields == "Company"
    ));
    assert_eq!(count(&mut store, "SELECT COUNT() FROM Account", &Binds::new()), 0);
}

#[test]
fn test_explicit_rollback() {
    let mut store = store();
    let mut uow = store.begin().unwrap();
    uow.insert(&mut [Account::new("Acme")]).unwrap();
    uow.rollback().unwrap();

    assert_eq!(count(&mut store, "SELECT COUNT() FROM Account", &Binds::new()), 0);
}

#[test]
fn test_rolled_back_ids_are_reissued() {
    let mut store = store();
    let mut uow = store.begin().unwrap();
    uow.insert(&mut [Account::new("Gone")]).unwrap();
    uow.rollback().unwrap();

    let ids = store
        .transaction(|uow| uow.insert(&mut [Account::new("Kept")]))
        .unwrap();
    assert_eq!(ids[0], RecordId::from_sequence("001", 1));
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.db");

    let id = {
        let mut store = Store::open(&path).unwrap().with_today(today());
        store
            .transaction(|uow| uow.insert(&mut [Account::new("Acme")]))
            .unwrap()
            .remove(0)
    };

    let mut store = Store::open(&path).unwrap().with_today(today());
    let found: Vec<Account> = store
        .transaction(|uow| {
            uow.query(
                "SELECT Id, Name FROM Account WHERE Id = :id",
                &Binds::new().with("id", &id),
            )
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name.as_deref(), Some("Acme"));

    // The sequence continues across reopen
    let next = store
        .transaction(|uow| uow.insert(&mut [Account::new("Globex")]))
        .unwrap();
    assert_eq!(next[0], RecordId::from_sequence("001", 2));
}

fn file_config(path: &std::path::Path, locking: LockingMode) -> StoreConfig {
    StoreConfig {
        path: Some(path.to_path_buf()),
        busy_timeout_ms: 50,
        locking,
        ..StoreConfig::default()
    }
}

#[test]
fn test_immediate_unit_of_work_blocks_second_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.db");
    let mut first = Store::from_config(&file_config(&path, LockingMode::Immediate)).unwrap();
    let mut second = Store::from_config(&file_config(&path, LockingMode::Immediate)).unwrap();

    let held = first.begin().unwrap();
    assert!(matches!(second.begin(), Err(DmlError::Sqlite(_))));
    held.rollback().unwrap();

    // The lock is released with the first unit of work
    second.begin().unwrap().rollback().unwrap();
}

#[test]
fn test_deferred_unit_of_work_does_not_lock_at_begin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.db");
    let mut first = Store::from_config(&file_config(&path, LockingMode::Deferred)).unwrap();
    let mut second = Store::from_config(&file_config(&path, LockingMode::Deferred)).unwrap();

    let held = first.begin().unwrap();
    let other = second.begin().unwrap();
    other.rollback().unwrap();
    held.rollback().unwrap();
}

// ==================== Insert / Update / Delete ====================

#[test]
fn test_insert_rejects_records_with_ids() {
    let mut store = store();
    let result = store.transaction(|uow| {
        let mut accounts = [Account::new("Acme")];
        uow.insert(&mut accounts)?;
        uow.insert(&mut accounts)
    });
    assert!(matches!(result, Err(DmlError::IdAlreadySet(_))));
}

#[test]
fn test_update_missing_record() {
    let mut store = store();
    let ghost = RecordId::from_sequence("003", 99);
    let result = store.transaction(|uow| {
        uow.update(&[Contact {
            id: Some(ghost.clone()),
            last_name: Some("Smith".into()),
            ..Default::default()
        }])
    });
    assert!(matches!(result, Err(DmlError::NotFound(id)) if id == ghost));
}

#[test]
fn test_update_without_id() {
    let mut store = store();
    let result = store.transaction(|uow| uow.update(&[Account::new("NoId")]));
    assert!(matches!(
        result,
        Err(DmlError::MissingId {
            object: "Account",
            operation: "update"
        })
    ));
}

#[test]
fn test_delete_batch_is_atomic() {
    let mut store = store();
    let ids = store
        .transaction(|uow| uow.insert(&mut [Lead::new("X", "Co"), Lead::new("Y", "Co")]))
        .unwrap();

    let ghost = RecordId::from_sequence("00Q", 50);
    let result = store.transaction(|uow| uow.delete_ids::<Lead>(&[ids[0].clone(), ghost.clone()]));
    assert!(matches!(result, Err(DmlError::NotFound(id)) if id == ghost));

    assert_eq!(count(&mut store, "SELECT COUNT() FROM Lead", &Binds::new()), 2);
}

#[test]
fn test_deleting_account_cascades_to_children() {
    let mut store = store();
    store
        .transaction(|uow| {
            let account = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            uow.insert(&mut [Contact::with_last_name("Doe").with_account(account.clone())])?;
            uow.insert(&mut [
                Case::for_account(account.clone()).with_subject("Login issue"),
                Case::for_account(account.clone()),
            ])?;
            uow.insert(&mut [Opportunity::new("Deal")
                .with_stage("Prospecting")
                .with_close_date(today())
                .with_account(account.clone())])?;
            uow.delete_ids::<Account>(&[account])
        })
        .unwrap();

    for soql in [
        "SELECT COUNT() FROM Contact",
        "SELECT COUNT() FROM Case",
        "SELECT COUNT() FROM Opportunity",
    ] {
        assert_eq!(count(&mut store, soql, &Binds::new()), 0, "{}", soql);
    }
}

#[test]
fn test_child_with_unknown_parent_is_rejected() {
    let mut store = store();
    let result = store.transaction(|uow| {
        uow.insert(&mut [Case::for_account(RecordId::from_sequence("001", 7))])
    });
    assert!(matches!(result, Err(DmlError::Sqlite(_))));
}

// ==================== Upsert ====================

#[test]
fn test_upsert_splits_on_id() {
    let mut store = store();
    let outcomes = store
        .transaction(|uow| {
            let existing = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            let mut batch = [
                Account {
                    id: Some(existing),
                    industry: Some("Energy".into()),
                    ..Default::default()
                },
                Account::new("Globex"),
            ];
            uow.upsert(&mut batch)
        })
        .unwrap();

    assert!(!outcomes[0].created);
    assert!(outcomes[1].created);
    assert_eq!(outcomes[1].id, RecordId::from_sequence("001", 2));
}

#[test]
fn test_upsert_by_name_key() {
    let mut store = store();
    let (first, second) = store
        .transaction(|uow| {
            let first = uow.upsert_by_key("Name", &mut [Account::new("Acme").with_industry("Retail")])?;
            let second =
                uow.upsert_by_key("Name", &mut [Account::new("Acme").with_industry("Energy")])?;
            Ok((first, second))
        })
        .unwrap();

    assert!(first[0].created);
    assert!(!second[0].created);
    assert_eq!(first[0].id, second[0].id);

    let accounts: Vec<Account> = store
        .transaction(|uow| uow.query("SELECT Name, Industry FROM Account", &Binds::new()))
        .unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].industry.as_deref(), Some("Energy"));
}

#[test]
fn test_upsert_by_key_repeated_in_batch() {
    let mut store = store();
    let outcomes = store
        .transaction(|uow| {
            uow.upsert_by_key("Name", &mut [Account::new("Acme"), Account::new("Acme")])
        })
        .unwrap();
    assert!(outcomes[0].created);
    assert!(!outcomes[1].created);
    assert_eq!(outcomes[0].id, outcomes[1].id);
}

#[test]
fn test_upsert_by_key_ambiguous_match() {
    let mut store = store();
    let result = store.transaction(|uow| {
        uow.insert(&mut [Account::new("Twin"), Account::new("Twin")])?;
        uow.upsert_by_key("Name", &mut [Account::new("Twin")])
    });
    assert!(matches!(
        result,
        Err(DmlError::DuplicateKey { object: "Account", count: 2, .. })
    ));
}

#[test]
fn test_upsert_by_key_needs_the_key() {
    let mut store = store();
    let result = store.transaction(|uow| {
        uow.upsert_by_key(
            "Name",
            &mut [Account {
                industry: Some("Energy".into()),
                ..Default::default()
            }],
        )
    });
    assert!(matches!(result, Err(DmlError::RequiredFieldMissing { .. })));
}

// ==================== Queries ====================

#[test]
fn test_typed_query_fills_only_selected_fields() {
    let mut store = store();
    let contacts: Vec<Contact> = store
        .transaction(|uow| {
            let account = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            uow.insert(&mut [Contact::new("John", "Doe").with_account(account)])?;
            uow.query("SELECT LastName FROM Contact", &Binds::new())
        })
        .unwrap();

    assert_eq!(contacts.len(), 1);
    assert!(contacts[0].id.is_some());
    assert_eq!(contacts[0].last_name.as_deref(), Some("Doe"));
    assert_eq!(contacts[0].first_name, None);
    assert_eq!(contacts[0].account_id, None);
}

#[test]
fn test_dates_round_trip() {
    let mut store = store();
    let close = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let found: Vec<Opportunity> = store
        .transaction(|uow| {
            uow.insert(&mut [Opportunity::new("Deal")
                .with_stage("Prospecting")
                .with_close_date(close)
                .with_amount(1200.5)])?;
            uow.query(
                "SELECT Name, CloseDate, Amount FROM Opportunity WHERE CloseDate = NEXT_N_DAYS:30",
                &Binds::new(),
            )
        })
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].close_date, Some(close));
    assert_eq!(found[0].amount, Some(1200.5));
}

#[test]
fn test_fifteen_character_id_binds_like_eighteen() {
    let mut store = store();
    let id = store
        .transaction(|uow| uow.insert(&mut [Account::new("Acme")]))
        .unwrap()
        .remove(0);

    let widened = RecordId::parse(id.to_15()).unwrap();
    assert_eq!(widened, id);

    let found: Vec<Account> = store
        .transaction(|uow| {
            uow.query(
                "SELECT Name FROM Account WHERE Id = :id",
                &Binds::new().with("id", &widened),
            )
        })
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_lowercase_suffix_id_finds_and_updates_record() {
    let mut store = store();
    let id = store
        .transaction(|uow| uow.insert(&mut [Account::new("Acme")]))
        .unwrap()
        .remove(0);

    let lowered = format!("{}{}", id.to_15(), id.as_str()[15..].to_ascii_lowercase());
    let parsed = RecordId::parse(&lowered).unwrap();
    assert_eq!(parsed, id);

    let found: Vec<Account> = store
        .transaction(|uow| {
            uow.update(&[Account {
                id: Some(parsed.clone()),
                industry: Some("Energy".into()),
                ..Default::default()
            }])?;
            uow.query(
                "SELECT Industry FROM Account WHERE Id = :id",
                &Binds::new().with("id", &parsed),
            )
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].industry.as_deref(), Some("Energy"));
}

#[test]
fn test_count_rejects_plain_select() {
    let mut store = store();
    let result = store.transaction(|uow| uow.count("SELECT Id FROM Account", &Binds::new()));
    assert!(matches!(result, Err(DmlError::Conversion(_))));
}

#[test]
fn test_query_records_with_count_alias() {
    let mut store = store();
    let rows = store
        .transaction(|uow| {
            let account = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            uow.insert(&mut [Case::for_account(account.clone()), Case::for_account(account)])?;
            uow.query_records("SELECT COUNT(Id) total FROM Case", &Binds::new())
        })
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["total"].as_integer(), Some(2));
}

#[test]
fn test_query_records_parent_path() {
    let mut store = store();
    let rows = store
        .transaction(|uow| {
            let account = uow.insert(&mut [Account::new("Acme").with_type("Customer")])?.remove(0);
            uow.insert(&mut [Contact::with_last_name("Doe").with_account(account)])?;
            uow.query_records(
                "SELECT LastName, Account.Type FROM Contact WHERE Account.Name LIKE 'Ac%'",
                &Binds::new(),
            )
        })
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["LastName"].as_text(), Some("Doe"));
    assert_eq!(rows[0]["Account.Type"].as_text(), Some("Customer"));
}
