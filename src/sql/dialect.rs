//! SQLite rendering rules used by the converter and DDL generator

use super::schema::SalesforceFieldType;

/// SQLite dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Quote an identifier (table/column name)
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Positional placeholder for the `index`-th parameter (1-based)
    pub fn parameter_placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    pub fn nulls_first(&self) -> &'static str {
        "NULLS FIRST"
    }

    pub fn nulls_last(&self) -> &'static str {
        "NULLS LAST"
    }

    /// LIMIT/OFFSET syntax. SQLite needs a LIMIT before OFFSET.
    pub fn limit_offset(&self, limit: Option<&str>, offset: Option<&str>) -> String {
        match (limit, offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("LIMIT -1 OFFSET {}", o),
            (None, None) => String::new(),
        }
    }

    /// Column type for a field
    pub fn column_type(&self, field_type: SalesforceFieldType) -> &'static str {
        match field_type {
            SalesforceFieldType::Boolean | SalesforceFieldType::Integer => "INTEGER",
            SalesforceFieldType::Double
            | SalesforceFieldType::Currency
            | SalesforceFieldType::Percent => "REAL",
            // Dates are ISO-8601 text so they compare lexically
            _ => "TEXT",
        }
    }
}
