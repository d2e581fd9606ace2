//! Values for `:name` bind variables in SOQL

use std::collections::HashMap;

use crate::sobject::FieldValue;

#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Scalar(FieldValue),
    List(Vec<FieldValue>),
}

impl BindValue {
    pub fn scalar(value: impl Into<FieldValue>) -> Self {
        BindValue::Scalar(value.into())
    }

    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldValue>,
    {
        BindValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Bind variables by name. Lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct Binds {
    values: HashMap<String, BindValue>,
}

impl Binds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a single value
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, BindValue::scalar(value));
        self
    }

    /// Bind a collection, for use with `IN :name`
    pub fn with_list<I, T>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldValue>,
    {
        self.insert(name, BindValue::list(values));
        self
    }

    pub fn insert(&mut self, name: &str, value: BindValue) {
        self.values.insert(name.to_lowercase(), value);
    }

    pub fn get(&self, name: &str) -> Option<&BindValue> {
        self.values.get(&name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let binds = Binds::new().with("accountName", "Acme");
        assert_eq!(
            binds.get("ACCOUNTNAME"),
            Some(&BindValue::Scalar(FieldValue::Text("Acme".to_string())))
        );
    }

    #[test]
    fn test_list_binding() {
        let names = vec!["A".to_string(), "B".to_string()];
        let binds = Binds::new().with_list("names", &names);
        match binds.get("names") {
            Some(BindValue::List(values)) => assert_eq!(values.len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }
}
