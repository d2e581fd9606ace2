//! Standard CRM object schema definitions
//!
//! The five objects the DML operations work with: Account and its children
//! (Contact, Opportunity, Case) plus the standalone Lead.

use super::schema::{FieldDescribe, SObjectDescribe, SalesforceFieldType, SalesforceSchema};

/// Create a schema with the standard CRM objects
pub fn create_crm_schema() -> SalesforceSchema {
    let mut schema = SalesforceSchema::new();

    schema.add_object(create_account());
    schema.add_object(create_contact());
    schema.add_object(create_opportunity());
    schema.add_object(create_lead());
    schema.add_object(create_case());

    schema
}

fn id_field() -> FieldDescribe {
    FieldDescribe::new("Id", SalesforceFieldType::Id).with_nillable(false)
}

/// AccountId lookup shared by the Account children
fn account_lookup() -> FieldDescribe {
    FieldDescribe::new("AccountId", SalesforceFieldType::Lookup)
        .with_reference("Account")
        .with_relationship_name("Account")
        .with_cascade_delete()
}

/// Account object - companies and organizations
fn create_account() -> SObjectDescribe {
    let mut obj = SObjectDescribe::new("Account", "001");
    obj.add_field(id_field());
    obj.add_field(FieldDescribe::new("Name", SalesforceFieldType::String).with_nillable(false));
    obj.add_field(FieldDescribe::new("Industry", SalesforceFieldType::Picklist));
    obj.add_field(FieldDescribe::new("Type", SalesforceFieldType::Picklist));
    obj.add_field(FieldDescribe::new(
        "Description",
        SalesforceFieldType::TextArea,
    ));
    obj
}

/// Contact object - people at accounts
fn create_contact() -> SObjectDescribe {
    let mut obj = SObjectDescribe::new("Contact", "003");
    obj.add_field(id_field());
    obj.add_field(FieldDescribe::new("FirstName", SalesforceFieldType::String));
    obj.add_field(
        FieldDescribe::new("LastName", SalesforceFieldType::String).with_nillable(false),
    );
    obj.add_field(account_lookup());
    obj
}

/// Opportunity object - deals in the pipeline
fn create_opportunity() -> SObjectDescribe {
    let mut obj = SObjectDescribe::new("Opportunity", "006");
    obj.add_field(id_field());
    obj.add_field(FieldDescribe::new("Name", SalesforceFieldType::String).with_nillable(false));
    obj.add_field(
        FieldDescribe::new("StageName", SalesforceFieldType::Picklist).with_nillable(false),
    );
    obj.add_field(FieldDescribe::new("CloseDate", SalesforceFieldType::Date).with_nillable(false));
    obj.add_field(FieldDescribe::new("Amount", SalesforceFieldType::Currency));
    obj.add_field(account_lookup());
    obj
}

/// Lead object - unqualified prospects
fn create_lead() -> SObjectDescribe {
    let mut obj = SObjectDescribe::new("Lead", "00Q");
    obj.add_field(id_field());
    obj.add_field(FieldDescribe::new("FirstName", SalesforceFieldType::String));
    obj.add_field(
        FieldDescribe::new("LastName", SalesforceFieldType::String).with_nillable(false),
    );
    obj.add_field(FieldDescribe::new("Company", SalesforceFieldType::String).with_nillable(false));
    obj
}

/// Case object - customer issues
fn create_case() -> SObjectDescribe {
    let mut obj = SObjectDescribe::new("Case", "500");
    obj.add_field(id_field());
    obj.add_field(account_lookup());
    obj.add_field(FieldDescribe::new("Subject", SalesforceFieldType::String));
    obj.add_field(FieldDescribe::new("Status", SalesforceFieldType::Picklist));
    obj
}
