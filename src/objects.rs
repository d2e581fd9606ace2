//! Typed records for the standard CRM objects

use chrono::NaiveDate;
use rusqlite::Row;
use serde::Serialize;

use crate::id::RecordId;
use crate::sobject::{column, push_field, FieldValue, NameKeyed, ParentLinked, SObject};

/// Account - companies and organizations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "Type")]
    pub account_type: Option<String>,
    pub description: Option<String>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = Some(account_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl SObject for Account {
    const API_NAME: &'static str = "Account";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = Vec::new();
        push_field(&mut fields, "Name", &self.name);
        push_field(&mut fields, "Industry", &self.industry);
        push_field(&mut fields, "Type", &self.account_type);
        push_field(&mut fields, "Description", &self.description);
        fields
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: column(row, "Id")?,
            name: column(row, "Name")?,
            industry: column(row, "Industry")?,
            account_type: column(row, "Type")?,
            description: column(row, "Description")?,
        })
    }
}

impl NameKeyed for Account {
    fn natural_key(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Contact - people, usually linked to an Account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    pub id: Option<RecordId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub account_id: Option<RecordId>,
}

impl Contact {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..Default::default()
        }
    }

    pub fn with_last_name(last_name: impl Into<String>) -> Self {
        Self {
            last_name: Some(last_name.into()),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account_id: RecordId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

impl SObject for Contact {
    const API_NAME: &'static str = "Contact";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = Vec::new();
        push_field(&mut fields, "FirstName", &self.first_name);
        push_field(&mut fields, "LastName", &self.last_name);
        push_field(&mut fields, "AccountId", &self.account_id);
        fields
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: column(row, "Id")?,
            first_name: column(row, "FirstName")?,
            last_name: column(row, "LastName")?,
            account_id: column(row, "AccountId")?,
        })
    }
}

impl ParentLinked for Contact {
    const PARENT_FIELD: &'static str = "AccountId";

    fn set_parent(&mut self, parent: RecordId) {
        self.account_id = Some(parent);
    }

    fn parent(&self) -> Option<&RecordId> {
        self.account_id.as_ref()
    }
}

/// Opportunity - a pending deal against an Account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Opportunity {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub stage_name: Option<String>,
    pub close_date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub account_id: Option<RecordId>,
}

impl Opportunity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage_name = Some(stage.into());
        self
    }

    pub fn with_close_date(mut self, close_date: NaiveDate) -> Self {
        self.close_date = Some(close_date);
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_account(mut self, account_id: RecordId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

impl SObject for Opportunity {
    const API_NAME: &'static str = "Opportunity";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = Vec::new();
        push_field(&mut fields, "Name", &self.name);
        push_field(&mut fields, "StageName", &self.stage_name);
        push_field(&mut fields, "CloseDate", &self.close_date);
        push_field(&mut fields, "Amount", &self.amount);
        push_field(&mut fields, "AccountId", &self.account_id);
        fields
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: column(row, "Id")?,
            name: column(row, "Name")?,
            stage_name: column(row, "StageName")?,
            close_date: column(row, "CloseDate")?,
            amount: column(row, "Amount")?,
            account_id: column(row, "AccountId")?,
        })
    }
}

impl NameKeyed for Opportunity {
    fn natural_key(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl ParentLinked for Opportunity {
    const PARENT_FIELD: &'static str = "AccountId";

    fn set_parent(&mut self, parent: RecordId) {
        self.account_id = Some(parent);
    }

    fn parent(&self) -> Option<&RecordId> {
        self.account_id.as_ref()
    }
}

/// Lead - an unqualified prospect
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Lead {
    pub id: Option<RecordId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

impl Lead {
    pub fn new(last_name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            last_name: Some(last_name.into()),
            company: Some(company.into()),
            ..Default::default()
        }
    }
}

impl SObject for Lead {
    const API_NAME: &'static str = "Lead";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = Vec::new();
        push_field(&mut fields, "FirstName", &self.first_name);
        push_field(&mut fields, "LastName", &self.last_name);
        push_field(&mut fields, "Company", &self.company);
        fields
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: column(row, "Id")?,
            first_name: column(row, "FirstName")?,
            last_name: column(row, "LastName")?,
            company: column(row, "Company")?,
        })
    }
}

/// Case - a customer issue, optionally tied to an Account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Case {
    pub id: Option<RecordId>,
    pub account_id: Option<RecordId>,
    pub subject: Option<String>,
    pub status: Option<String>,
}

impl Case {
    pub fn for_account(account_id: RecordId) -> Self {
        Self {
            account_id: Some(account_id),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl SObject for Case {
    const API_NAME: &'static str = "Case";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = Vec::new();
        push_field(&mut fields, "AccountId", &self.account_id);
        push_field(&mut fields, "Subject", &self.subject);
        push_field(&mut fields, "Status", &self.status);
        fields
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: column(row, "Id")?,
            account_id: column(row, "AccountId")?,
            subject: column(row, "Subject")?,
            status: column(row, "Status")?,
        })
    }
}

impl ParentLinked for Case {
    const PARENT_FIELD: &'static str = "AccountId";

    fn set_parent(&mut self, parent: RecordId) {
        self.account_id = Some(parent);
    }

    fn parent(&self) -> Option<&RecordId> {
        self.account_id.as_ref()
    }
}
