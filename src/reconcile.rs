//! Name-keyed upsert reconciliation.
//!
//! Given a parent (found or created by name) and a list of desired child
//! names, existing children with those names are relinked to the parent in
//! one update and the names nobody has yet become new children in one
//! insert. Matching is exact, case-sensitive name equality.

use std::collections::{HashMap, HashSet};

use log::{info, warn};
use serde::Serialize;

use crate::binds::Binds;
use crate::config::DuplicateNamePolicy;
use crate::dml::Dml;
use crate::error::{DmlError, DmlResult};
use crate::id::RecordId;
use crate::sobject::{NameKeyed, ParentLinked};

/// What a reconciliation wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub parent_id: RecordId,
    pub relinked: Vec<RecordId>,
    pub created: Vec<RecordId>,
}

/// Partition of existing records and desired names, before any write
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<T> {
    /// Existing records whose name is desired
    pub relink: Vec<T>,
    /// Desired names no existing record carries, in first-seen order
    pub create: Vec<String>,
}

/// Apply the duplicate policy, keeping first-seen order
pub fn dedup_names(desired: &[String], policy: DuplicateNamePolicy) -> DmlResult<Vec<String>> {
    let mut seen = HashSet::with_capacity(desired.len());
    let mut unique = Vec::with_capacity(desired.len());

    for name in desired {
        if seen.insert(name.as_str()) {
            unique.push(name.clone());
            continue;
        }
        match policy {
            DuplicateNamePolicy::Reject => return Err(DmlError::DuplicateName(name.clone())),
            DuplicateNamePolicy::Collapse => {
                warn!("event=reconcile_dedup module=reconcile name={:?}", name)
            }
        }
    }
    Ok(unique)
}

/// Split `existing` and `desired` into records to relink and names to create
pub fn plan_by_name<T: NameKeyed>(
    existing: Vec<T>,
    desired: &[String],
    policy: DuplicateNamePolicy,
) -> DmlResult<ReconcilePlan<T>> {
    let desired = dedup_names(desired, policy)?;
    let wanted: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let relink: Vec<T> = existing
        .into_iter()
        .filter(|record| record.natural_key().is_some_and(|name| wanted.contains(name)))
        .collect();

    let covered: HashSet<&str> = relink.iter().filter_map(|r| r.natural_key()).collect();
    let create = desired
        .iter()
        .filter(|name| !covered.contains(name.as_str()))
        .cloned()
        .collect();

    Ok(ReconcilePlan { relink, create })
}

/// Id of the first record named `name`, inserting `build(name)` when there is none
pub fn find_or_create_by_name<P, D, F>(dml: &mut D, name: &str, build: F) -> DmlResult<RecordId>
where
    P: NameKeyed,
    D: Dml,
    F: FnOnce(&str) -> P,
{
    let soql = format!(
        "SELECT Id, {field} FROM {object} WHERE {field} = :name ORDER BY Id LIMIT 1",
        field = P::NAME_FIELD,
        object = P::API_NAME
    );
    let found: Vec<P> = dml.query(&soql, &Binds::new().with("name", name))?;

    if let Some(id) = found.first().and_then(|record| record.id()) {
        return Ok(id.clone());
    }

    let mut created = [build(name)];
    let ids = dml.insert(&mut created)?;
    ids.into_iter()
        .next()
        .ok_or_else(|| DmlError::InvalidData(format!("insert of {} returned no id", P::API_NAME)))
}

/// Relink or create the children named in `desired` under `parent_id`.
///
/// Returns the ids relinked and the ids created. An empty `desired` list
/// does nothing.
pub fn reconcile_children<C, D, F>(
    dml: &mut D,
    parent_id: &RecordId,
    desired: &[String],
    policy: DuplicateNamePolicy,
    build: F,
) -> DmlResult<(Vec<RecordId>, Vec<RecordId>)>
where
    C: NameKeyed + ParentLinked,
    D: Dml,
    F: Fn(&str) -> C,
{
    let desired = dedup_names(desired, policy)?;
    reconcile_unique_children(dml, parent_id, &desired, build)
}

/// `desired` must already be free of duplicates
fn reconcile_unique_children<C, D, F>(
    dml: &mut D,
    parent_id: &RecordId,
    desired: &[String],
    build: F,
) -> DmlResult<(Vec<RecordId>, Vec<RecordId>)>
where
    C: NameKeyed + ParentLinked,
    D: Dml,
    F: Fn(&str) -> C,
{
    if desired.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let soql = format!(
        "SELECT Id, {name}, {parent} FROM {object} WHERE {name} IN :names ORDER BY Id",
        name = C::NAME_FIELD,
        parent = C::PARENT_FIELD,
        object = C::API_NAME
    );
    let existing: Vec<C> = dml.query(&soql, &Binds::new().with_list("names", desired))?;

    let ReconcilePlan { mut relink, create } =
        plan_by_name(existing, desired, DuplicateNamePolicy::Collapse)?;

    let mut relinked = Vec::with_capacity(relink.len());
    if !relink.is_empty() {
        for record in relink.iter_mut() {
            record.set_parent(parent_id.clone());
        }
        dml.update(&relink)?;
        relinked.extend(relink.iter().filter_map(|r| r.id().cloned()));
    }

    let mut created = Vec::with_capacity(create.len());
    if !create.is_empty() {
        let mut fresh: Vec<C> = create
            .iter()
            .map(|name| {
                let mut record = build(name);
                record.set_parent(parent_id.clone());
                record
            })
            .collect();
        created = dml.insert(&mut fresh)?;
    }

    info!(
        "event=reconcile module=reconcile status=ok object={} parent={} relinked={} created={}",
        C::API_NAME,
        parent_id,
        relinked.len(),
        created.len()
    );
    Ok((relinked, created))
}

/// Find or create the parent named `parent_name`, then reconcile its children
pub fn reconcile_by_name<P, C, D, FP, FC>(
    dml: &mut D,
    parent_name: &str,
    desired: &[String],
    policy: DuplicateNamePolicy,
    build_parent: FP,
    build_child: FC,
) -> DmlResult<ReconcileReport>
where
    P: NameKeyed,
    C: NameKeyed + ParentLinked,
    D: Dml,
    FP: FnOnce(&str) -> P,
    FC: Fn(&str) -> C,
{
    // Before the parent insert so Reject writes nothing
    let desired = dedup_names(desired, policy)?;

    let parent_id = find_or_create_by_name(dml, parent_name, build_parent)?;
    let (relinked, created) = reconcile_unique_children(dml, &parent_id, &desired, build_child)?;

    Ok(ReconcileReport {
        parent_id,
        relinked,
        created,
    })
}

/// Resolve every name to a record id, inserting the missing ones in one call
pub fn resolve_by_name<P, D, F>(
    dml: &mut D,
    names: &[String],
    build: F,
) -> DmlResult<HashMap<String, RecordId>>
where
    P: NameKeyed,
    D: Dml,
    F: Fn(&str) -> P,
{
    let names = dedup_names(names, DuplicateNamePolicy::Collapse)?;
    if names.is_empty() {
        return Ok(HashMap::new());
    }

    let soql = format!(
        "SELECT Id, {name} FROM {object} WHERE {name} IN :names ORDER BY Id",
        name = P::NAME_FIELD,
        object = P::API_NAME
    );
    let existing: Vec<P> = dml.query(&soql, &Binds::new().with_list("names", &names))?;

    let mut resolved = HashMap::with_capacity(names.len());
    for record in &existing {
        if let (Some(name), Some(id)) = (record.natural_key(), record.id()) {
            // Oldest record wins when several share a name
            resolved
                .entry(name.to_string())
                .or_insert_with(|| id.clone());
        }
    }

    let missing: Vec<&String> = names.iter().filter(|n| !resolved.contains_key(*n)).collect();
    if !missing.is_empty() {
        let mut fresh: Vec<P> = missing.iter().map(|name| build(name)).collect();
        let ids = dml.insert(&mut fresh)?;
        resolved.extend(missing.into_iter().cloned().zip(ids));
    }

    Ok(resolved)
}
