use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use sobject_dml::sql::{create_crm_schema, DdlGenerator, SalesforceSchema};
use sobject_dml::{
    BindValue, Binds, Config, Contact, Dml, FieldValue, Opportunity, Operations, RecordId, Store,
};

#[derive(Parser)]
#[command(name = "sobject-dml")]
#[command(about = "CRM record operations over an embedded SOQL store")]
struct Cli {
    /// Database file (overrides the config; in-memory when neither is set)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every operation once in a single unit of work
    Demo,
    /// Run a SOQL query and print the rows as JSON
    Query {
        soql: String,
        /// name=value; a value with commas binds a list
        #[arg(long = "bind")]
        binds: Vec<String>,
    },
    /// Print the DDL for the CRM schema
    Schema,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(db) = cli.db {
        config.store.path = Some(db);
    }

    match cli.command {
        Command::Demo => run_demo(&config),
        Command::Query { soql, binds } => run_query(&config, &soql, &binds),
        Command::Schema => {
            print!("{}", DdlGenerator::new().generate_schema(&create_crm_schema()));
            Ok(())
        }
    }
}

fn run_demo(config: &Config) -> Result<()> {
    let mut store = Store::from_config(&config.store)?;
    let ops = Operations::from_config(config);

    let summary = store.transaction(|uow| {
        let account_id = ops.insert_new_account(uow)?;
        let globex_id = ops.create_account(uow, "Globex", "Manufacturing")?;
        let contact_id = ops.insert_new_contact(uow, &account_id)?;
        let contact = ops.update_contact_last_name(uow, &contact_id, "Smith")?;
        let account = ops.update_account_fields(uow, &globex_id, "Globex Corporation", "Energy")?;

        let mut batch = vec![Opportunity::new("Renewal").with_account(account_id.clone())];
        let batch_outcomes = ops.upsert_opportunity_list(uow, &mut batch)?;
        let staged = match batch[0].id.clone() {
            Some(id) => Some(ops.update_opportunity_stage(uow, &id, "Negotiation")?),
            None => None,
        };

        let reconciled = ops.upsert_opportunities(
            uow,
            "Acme Corporation",
            &["Renewal".to_string(), "Expansion".to_string()],
        )?;
        let upserted_account = ops.upsert_account(uow, "Initech")?;

        let mut contacts = vec![
            Contact::with_last_name("Doe"),
            Contact::with_last_name("Jane"),
        ];
        let contact_outcomes = ops.upsert_accounts_with_contacts(uow, &mut contacts)?;
        let leads = ops.insert_and_delete_leads(uow, &["X".to_string(), "Y".to_string()])?;
        let cases = ops.create_and_delete_cases(uow, &account_id, 3)?;

        Ok(json!({
            "insert_new_account": account_id,
            "create_account": globex_id,
            "insert_new_contact": contact_id,
            "update_contact_last_name": contact,
            "update_account_fields": account,
            "upsert_opportunity_list": batch_outcomes,
            "update_opportunity_stage": staged,
            "upsert_opportunities": reconciled,
            "upsert_account": upserted_account,
            "upsert_accounts_with_contacts": contact_outcomes,
            "insert_and_delete_leads": leads,
            "create_and_delete_cases": cases,
        }))
    })?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_query(config: &Config, soql: &str, raw_binds: &[String]) -> Result<()> {
    let schema = create_crm_schema();
    let mut binds = Binds::new();
    for raw in raw_binds {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("bind '{}' is not name=value", raw))?;
        binds.insert(name, parse_bind_value(&schema, value));
    }

    let mut store = Store::from_config(&config.store)?;
    let rows = store
        .transaction(|uow| uow.query_records(soql, &binds))
        .with_context(|| format!("query failed: {}", soql))?;

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn parse_bind_value(schema: &SalesforceSchema, value: &str) -> BindValue {
    if value.contains(',') {
        BindValue::List(value.split(',').map(|v| scalar(schema, v.trim())).collect())
    } else {
        BindValue::Scalar(scalar(schema, value))
    }
}

/// Record ids with a known key prefix bind in their 18-character form,
/// integers without a leading zero as numbers, everything else as text
fn scalar(schema: &SalesforceSchema, value: &str) -> FieldValue {
    if let Ok(id) = RecordId::parse(value) {
        if schema.object_for_key_prefix(id.key_prefix()).is_some() {
            return FieldValue::from(id);
        }
    }
    match value.parse::<i64>() {
        Ok(n) if !value.starts_with('0') || value == "0" => FieldValue::Integer(n),
        _ => FieldValue::Text(value.to_string()),
    }
}
