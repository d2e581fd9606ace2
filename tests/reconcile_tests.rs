//! Name-keyed reconciliation against a real store

use std::collections::BTreeSet;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sobject_dml::reconcile::{find_or_create_by_name, reconcile_children};
use sobject_dml::{
    Account, Binds, Dml, DmlResult, DuplicateNamePolicy, Opportunity, Operations, RecordId, Store,
    UnitOfWork,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

fn store() -> Store {
    Store::open_in_memory().unwrap().with_today(today())
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn opportunity(uow: &mut UnitOfWork<'_>, name: &str, account: &RecordId) -> DmlResult<RecordId> {
    let mut records = [Opportunity::new(name)
        .with_stage("Closed Won")
        .with_close_date(today())
        .with_amount(10.0)
        .with_account(account.clone())];
    Ok(uow.insert(&mut records)?.remove(0))
}

fn all_opportunities(uow: &UnitOfWork<'_>) -> DmlResult<Vec<Opportunity>> {
    uow.query(
        "SELECT Id, Name, StageName, CloseDate, Amount, AccountId FROM Opportunity ORDER BY Id",
        &Binds::new(),
    )
}

// ==================== Find or Create ====================

#[test]
fn test_find_or_create_is_idempotent() {
    let mut store = store();
    let (first, second, total) = store
        .transaction(|uow| {
            let first = find_or_create_by_name(uow, "Acme", |name| Account::new(name))?;
            let second = find_or_create_by_name(uow, "Acme", |name| Account::new(name))?;
            let total = uow.count("SELECT COUNT() FROM Account", &Binds::new())?;
            Ok((first, second, total))
        })
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(total, 1);
}

#[test]
fn test_find_or_create_picks_oldest_duplicate() {
    let mut store = store();
    let (ids, found) = store
        .transaction(|uow| {
            let ids = uow.insert(&mut [Account::new("Twin"), Account::new("Twin")])?;
            let found = find_or_create_by_name(uow, "Twin", |name| Account::new(name))?;
            Ok((ids, found))
        })
        .unwrap();

    assert_eq!(found, ids[0]);
}

// ==================== Upsert Opportunities ====================

#[test]
fn test_new_opportunities_under_existing_account() {
    let mut store = store();
    let (acme, report, stored) = store
        .transaction(|uow| {
            let acme = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            let report = Operations::default().upsert_opportunities(uow, "Acme", &names(&["OppA", "OppB"]))?;
            Ok((acme, report, all_opportunities(uow)?))
        })
        .unwrap();

    assert_eq!(report.parent_id, acme);
    assert!(report.relinked.is_empty());
    assert_eq!(report.created.len(), 2);

    let close = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    assert_eq!(stored.len(), 2);
    for opportunity in &stored {
        assert_eq!(opportunity.account_id.as_ref(), Some(&acme));
        assert_eq!(opportunity.stage_name.as_deref(), Some("Prospecting"));
        assert_eq!(opportunity.close_date, Some(close));
        assert_eq!(opportunity.amount, Some(0.0));
    }
    assert_eq!(stored[0].name.as_deref(), Some("OppA"));
    assert_eq!(stored[1].name.as_deref(), Some("OppB"));
}

#[test]
fn test_existing_opportunity_is_relinked() {
    let mut store = store();
    let (acme, opp_a, report, stored) = store
        .transaction(|uow| {
            let acme = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            let other = uow.insert(&mut [Account::new("Other")])?.remove(0);
            let opp_a = opportunity(uow, "OppA", &other)?;
            let report = Operations::default().upsert_opportunities(uow, "Acme", &names(&["OppA", "OppB"]))?;
            Ok((acme, opp_a, report, all_opportunities(uow)?))
        })
        .unwrap();

    assert_eq!(report.relinked, vec![opp_a.clone()]);
    assert_eq!(report.created.len(), 1);
    assert_eq!(stored.len(), 2);

    let relinked = &stored[0];
    assert_eq!(relinked.id.as_ref(), Some(&opp_a));
    assert_eq!(relinked.account_id.as_ref(), Some(&acme));
    // Relinking only moves the parent link
    assert_eq!(relinked.stage_name.as_deref(), Some("Closed Won"));

    assert_eq!(stored[1].name.as_deref(), Some("OppB"));
    assert_eq!(stored[1].account_id.as_ref(), Some(&acme));
}

#[test]
fn test_missing_account_is_created() {
    let mut store = store();
    let (report, accounts) = store
        .transaction(|uow| {
            let report = Operations::default().upsert_opportunities(uow, "Fresh Co", &names(&["Deal"]))?;
            let accounts: Vec<Account> =
                uow.query("SELECT Id, Name FROM Account", &Binds::new())?;
            Ok((report, accounts))
        })
        .unwrap();

    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id.as_ref(), Some(&report.parent_id));
    assert_eq!(accounts[0].name.as_deref(), Some("Fresh Co"));
}

#[test]
fn test_second_run_only_relinks() {
    let mut store = store();
    let (first, second, total) = store
        .transaction(|uow| {
            let ops = Operations::default();
            let desired = names(&["OppA", "OppB"]);
            let first = ops.upsert_opportunities(uow, "Acme", &desired)?;
            let second = ops.upsert_opportunities(uow, "Acme", &desired)?;
            let total = uow.count("SELECT COUNT() FROM Opportunity", &Binds::new())?;
            Ok((first, second, total))
        })
        .unwrap();

    assert_eq!(first.parent_id, second.parent_id);
    assert!(second.created.is_empty());
    assert_eq!(second.relinked, first.created);
    assert_eq!(total, 2);
}

#[test]
fn test_result_covers_desired_and_previous_names() {
    let mut store = store();
    let (acme, stored) = store
        .transaction(|uow| {
            let other = uow.insert(&mut [Account::new("Other")])?.remove(0);
            opportunity(uow, "Kept", &other)?;
            opportunity(uow, "OppA", &other)?;
            let report = Operations::default().upsert_opportunities(
                uow,
                "Acme",
                &names(&["OppA", "OppB", "OppC"]),
            )?;
            Ok((report.parent_id, all_opportunities(uow)?))
        })
        .unwrap();

    let all: BTreeSet<&str> = stored.iter().filter_map(|o| o.name.as_deref()).collect();
    assert_eq!(all, BTreeSet::from(["Kept", "OppA", "OppB", "OppC"]));

    for opportunity in &stored {
        let under_acme = opportunity.account_id.as_ref() == Some(&acme);
        let desired = opportunity.name.as_deref() != Some("Kept");
        assert_eq!(under_acme, desired, "{:?}", opportunity.name);
    }
}

#[test]
fn test_empty_desired_names_create_nothing() {
    let mut store = store();
    let (report, total) = store
        .transaction(|uow| {
            let report = Operations::default().upsert_opportunities(uow, "Acme", &[])?;
            let total = uow.count("SELECT COUNT() FROM Opportunity", &Binds::new())?;
            Ok((report, total))
        })
        .unwrap();

    assert!(report.relinked.is_empty());
    assert!(report.created.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn test_duplicate_names_collapse() {
    let mut store = store();
    let report = store
        .transaction(|uow| {
            Operations::default().upsert_opportunities(uow, "Acme", &names(&["OppA", "OppA"]))
        })
        .unwrap();
    assert_eq!(report.created.len(), 1);
}

#[test]
fn test_matching_is_case_sensitive() {
    let mut store = store();
    let (report, total) = store
        .transaction(|uow| {
            let other = uow.insert(&mut [Account::new("Other")])?.remove(0);
            opportunity(uow, "oppa", &other)?;
            let report = Operations::default().upsert_opportunities(uow, "Acme", &names(&["OppA"]))?;
            let total = uow.count("SELECT COUNT() FROM Opportunity", &Binds::new())?;
            Ok((report, total))
        })
        .unwrap();

    assert!(report.relinked.is_empty());
    assert_eq!(report.created.len(), 1);
    assert_eq!(total, 2);
}

// ==================== Children Only ====================

#[test]
fn test_reconcile_children_relinks_every_namesake() {
    let mut store = store();
    let (relinked, created) = store
        .transaction(|uow| {
            let acme = uow.insert(&mut [Account::new("Acme")])?.remove(0);
            let other = uow.insert(&mut [Account::new("Other")])?.remove(0);
            opportunity(uow, "OppA", &other)?;
            opportunity(uow, "OppA", &other)?;
            reconcile_children(
                uow,
                &acme,
                &names(&["OppA"]),
                DuplicateNamePolicy::Collapse,
                |name| {
                    Opportunity::new(name)
                        .with_stage("Prospecting")
                        .with_close_date(today())
                },
            )
        })
        .unwrap();

    assert_eq!(relinked.len(), 2);
    assert!(created.is_empty());
}
