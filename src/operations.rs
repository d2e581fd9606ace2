//! The twelve CRM record operations.
//!
//! Each one is a few lines of record construction plus DML calls against
//! whatever [`Dml`] it is handed, normally a [`crate::store::UnitOfWork`].
//! Nothing here commits; the caller owns the transaction.

use chrono::{Days, Months, NaiveDate};

use crate::binds::Binds;
use crate::config::{Config, DuplicateNamePolicy, RecordDefaults};
use crate::dml::{Dml, UpsertOutcome};
use crate::error::{DmlError, DmlResult};
use crate::id::RecordId;
use crate::objects::{Account, Case, Contact, Lead, Opportunity};
use crate::reconcile::{reconcile_by_name, resolve_by_name, ReconcileReport};
use crate::sobject::SObject;

#[derive(Debug, Clone, Default)]
pub struct Operations {
    defaults: RecordDefaults,
    duplicate_names: DuplicateNamePolicy,
}

impl Operations {
    pub fn new(defaults: RecordDefaults, duplicate_names: DuplicateNamePolicy) -> Self {
        Self {
            defaults,
            duplicate_names,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.defaults.clone(), config.reconcile.duplicate_names)
    }

    pub fn defaults(&self) -> &RecordDefaults {
        &self.defaults
    }

    /// Q1: insert the sample account
    pub fn insert_new_account<D: Dml>(&self, dml: &mut D) -> DmlResult<RecordId> {
        self.create_account(dml, "Acme Corporation", "Technology")
    }

    /// Q2
    pub fn create_account<D: Dml>(
        &self,
        dml: &mut D,
        name: &str,
        industry: &str,
    ) -> DmlResult<RecordId> {
        insert_single(dml, Account::new(name).with_industry(industry))
    }

    /// Q3: insert John Doe under `account_id`
    pub fn insert_new_contact<D: Dml>(
        &self,
        dml: &mut D,
        account_id: &RecordId,
    ) -> DmlResult<RecordId> {
        insert_single(dml, Contact::new("John", "Doe").with_account(account_id.clone()))
    }

    /// Q4
    pub fn update_contact_last_name<D: Dml>(
        &self,
        dml: &mut D,
        contact_id: &RecordId,
        last_name: &str,
    ) -> DmlResult<Contact> {
        let mut contact: Contact =
            fetch_by_id(dml, "SELECT Id, LastName FROM Contact WHERE Id = :id", contact_id)?;
        contact.last_name = Some(last_name.to_string());
        dml.update(std::slice::from_ref(&contact))?;
        Ok(contact)
    }

    /// Q5
    pub fn update_opportunity_stage<D: Dml>(
        &self,
        dml: &mut D,
        opportunity_id: &RecordId,
        stage: &str,
    ) -> DmlResult<Opportunity> {
        let mut opportunity: Opportunity = fetch_by_id(
            dml,
            "SELECT Id, StageName FROM Opportunity WHERE Id = :id",
            opportunity_id,
        )?;
        opportunity.stage_name = Some(stage.to_string());
        dml.update(std::slice::from_ref(&opportunity))?;
        Ok(opportunity)
    }

    /// Q6
    pub fn update_account_fields<D: Dml>(
        &self,
        dml: &mut D,
        account_id: &RecordId,
        name: &str,
        industry: &str,
    ) -> DmlResult<Account> {
        let mut account: Account = fetch_by_id(
            dml,
            "SELECT Id, Name, Industry FROM Account WHERE Id = :id",
            account_id,
        )?;
        account.name = Some(name.to_string());
        account.industry = Some(industry.to_string());
        dml.update(std::slice::from_ref(&account))?;
        Ok(account)
    }

    /// Q7: stamp the batch defaults on every opportunity, then upsert
    pub fn upsert_opportunity_list<D: Dml>(
        &self,
        dml: &mut D,
        opportunities: &mut [Opportunity],
    ) -> DmlResult<Vec<UpsertOutcome>> {
        let close_date = add_months(dml.today(), self.defaults.batch_opportunity_close_months)?;
        for opportunity in opportunities.iter_mut() {
            opportunity.stage_name = Some(self.defaults.batch_opportunity_stage.clone());
            opportunity.close_date = Some(close_date);
            opportunity.amount = Some(self.defaults.batch_opportunity_amount);
        }
        dml.upsert(opportunities)
    }

    /// Q8: find or create the account, then reconcile its opportunities by name
    pub fn upsert_opportunities<D: Dml>(
        &self,
        dml: &mut D,
        account_name: &str,
        opportunity_names: &[String],
    ) -> DmlResult<ReconcileReport> {
        let close_date = add_days(dml.today(), self.defaults.reconciled_opportunity_close_days)?;
        let defaults = &self.defaults;

        reconcile_by_name(
            dml,
            account_name,
            opportunity_names,
            self.duplicate_names,
            |name| Account::new(name),
            |name| {
                Opportunity::new(name)
                    .with_stage(defaults.reconciled_opportunity_stage.clone())
                    .with_close_date(close_date)
                    .with_amount(defaults.reconciled_opportunity_amount)
            },
        )
    }

    /// Q9: describe the account as new or updated, creating it if needed
    pub fn upsert_account<D: Dml>(&self, dml: &mut D, account_name: &str) -> DmlResult<Account> {
        let found: Vec<Account> = dml.query(
            "SELECT Id, Name, Description FROM Account WHERE Name = :name ORDER BY Id LIMIT 1",
            &Binds::new().with("name", account_name),
        )?;

        let mut account = match found.into_iter().next() {
            Some(existing) => Account {
                description: Some(self.defaults.updated_account_description.clone()),
                ..existing
            },
            None => Account::new(account_name)
                .with_description(self.defaults.new_account_description.clone()),
        };

        dml.upsert(std::slice::from_mut(&mut account))?;
        Ok(account)
    }

    /// Q10: each contact's last name names its account; create missing
    /// accounts, link, then upsert the contacts
    pub fn upsert_accounts_with_contacts<D: Dml>(
        &self,
        dml: &mut D,
        contacts: &mut [Contact],
    ) -> DmlResult<Vec<UpsertOutcome>> {
        let names = contacts
            .iter()
            .map(|contact| {
                contact
                    .last_name
                    .clone()
                    .ok_or_else(|| DmlError::RequiredFieldMissing {
                        object: Contact::API_NAME.to_string(),
                        fields: "LastName".to_string(),
                    })
            })
            .collect::<DmlResult<Vec<_>>>()?;

        let accounts = resolve_by_name(dml, &names, |name| Account::new(name))?;

        for (contact, name) in contacts.iter_mut().zip(&names) {
            let account_id = accounts
                .get(name)
                .ok_or_else(|| DmlError::InvalidData(format!("no account resolved for {name}")))?;
            contact.account_id = Some(account_id.clone());
        }

        dml.upsert(contacts)
    }

    /// Q11: insert a lead per name, then delete them again
    pub fn insert_and_delete_leads<D: Dml>(
        &self,
        dml: &mut D,
        names: &[String],
    ) -> DmlResult<Vec<RecordId>> {
        let mut leads: Vec<Lead> = names
            .iter()
            .map(|name| Lead::new(name.clone(), self.defaults.lead_company.clone()))
            .collect();
        let ids = dml.insert(&mut leads)?;
        dml.delete(&leads)?;
        Ok(ids)
    }

    /// Q12: insert `count` cases under the account, then delete them again
    pub fn create_and_delete_cases<D: Dml>(
        &self,
        dml: &mut D,
        account_id: &RecordId,
        count: usize,
    ) -> DmlResult<Vec<RecordId>> {
        let mut cases: Vec<Case> = (0..count)
            .map(|_| Case::for_account(account_id.clone()))
            .collect();
        let ids = dml.insert(&mut cases)?;
        dml.delete(&cases)?;
        Ok(ids)
    }
}

fn insert_single<D: Dml, T: SObject>(dml: &mut D, record: T) -> DmlResult<RecordId> {
    let mut records = [record];
    let ids = dml.insert(&mut records)?;
    ids.into_iter()
        .next()
        .ok_or_else(|| DmlError::InvalidData(format!("insert of {} returned no id", T::API_NAME)))
}

fn fetch_by_id<D: Dml, T: SObject>(dml: &D, soql: &str, id: &RecordId) -> DmlResult<T> {
    dml.query::<T>(soql, &Binds::new().with("id", id))?
        .into_iter()
        .next()
        .ok_or_else(|| DmlError::NotFound(id.clone()))
}

fn add_months(date: NaiveDate, months: u32) -> DmlResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| DmlError::InvalidData(format!("{date} + {months} months is out of range")))
}

fn add_days(date: NaiveDate, days: u32) -> DmlResult<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| DmlError::InvalidData(format!("{date} + {days} days is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_arithmetic_clamps_to_month_end() {
        let date = NaiveDate::from_ymd_opt(2026, 11, 30).unwrap();
        assert_eq!(
            add_months(date, 3).unwrap(),
            NaiveDate::from_ymd_opt(2027, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_day_arithmetic() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap();
        assert_eq!(
            add_days(date, 30).unwrap(),
            NaiveDate::from_ymd_opt(2027, 1, 14).unwrap()
        );
    }
}
