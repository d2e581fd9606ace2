//! SOQL to SQL conversion module
//!
//! Converts parsed SOQL queries into SQLite SQL against a schema of the
//! standard CRM objects, and generates the DDL that backs that schema.
//!
//! # Overview
//!
//! The conversion process involves:
//! 1. Describing the schema (objects, fields, lookups, key prefixes)
//! 2. Parsing SOQL with [`crate::parse`]
//! 3. Converting the AST to SQL, resolving `:binds` and date literals
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sobject_dml::binds::Binds;
//! use sobject_dml::parse;
//! use sobject_dml::sql::{create_crm_schema, ConversionConfig, DdlGenerator, SoqlToSqlConverter};
//!
//! let schema = create_crm_schema();
//! let ddl = DdlGenerator::new().generate_schema(&schema);
//! assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"account\""));
//!
//! let query = parse("SELECT Name FROM Contact WHERE Account.Name = :name").unwrap();
//! let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let mut converter = SoqlToSqlConverter::new(&schema, ConversionConfig::new(today));
//! let result = converter.convert(&query, &Binds::new().with("name", "Acme")).unwrap();
//! assert!(result.sql.contains("LEFT JOIN \"account\" t1"));
//! ```
//!
//! # Supported SOQL
//!
//! - SELECT with field lists and parent paths (`Account.Name`)
//! - `COUNT()` / `COUNT(field)` with optional alias
//! - WHERE with =, !=, <>, <, >, <=, >=, LIKE, IN, NOT IN, AND, OR, NOT
//! - Bind variables, including list binds for IN
//! - Date literals (TODAY, LAST_N_DAYS:n, THIS_MONTH, ...)
//! - ORDER BY with ASC/DESC and NULLS FIRST/LAST
//! - LIMIT and OFFSET

pub mod converter;
pub mod date_literals;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod schema;
pub mod standard_objects;

// Re-export main types
pub use converter::{convert_soql, ConversionConfig, SoqlToSqlConverter, SqlConversion};
pub use ddl::DdlGenerator;
pub use dialect::SqliteDialect;
pub use error::{ConversionError, ConversionResult};
pub use schema::{FieldDescribe, SObjectDescribe, SalesforceFieldType, SalesforceSchema};
pub use standard_objects::create_crm_schema;
