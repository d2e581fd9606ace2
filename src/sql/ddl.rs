//! DDL generation for the object schema

use super::dialect::SqliteDialect;
use super::schema::{FieldDescribe, SObjectDescribe, SalesforceFieldType, SalesforceSchema};

/// Generator for SQL DDL (CREATE TABLE, etc.)
#[derive(Debug, Default)]
pub struct DdlGenerator {
    dialect: SqliteDialect,
}

impl DdlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate CREATE TABLE statement for an SObject
    pub fn generate_table(&self, object: &SObjectDescribe) -> String {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n",
            self.dialect.quote_identifier(&object.table_name)
        );

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        for field in ordered_fields(object) {
            columns.push(format!("    {}", self.generate_column(field)));

            if let Some(ref parent) = field.reference_to {
                let on_delete = if field.cascade_delete {
                    "CASCADE"
                } else {
                    "SET NULL"
                };
                constraints.push(format!(
                    "    FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {}",
                    self.dialect.quote_identifier(&field.column_name),
                    self.dialect.quote_identifier(&super::schema::to_snake_case(parent)),
                    self.dialect.quote_identifier("id"),
                    on_delete
                ));
            }
        }

        columns.extend(constraints);
        sql.push_str(&columns.join(",\n"));
        sql.push_str("\n)");
        sql
    }

    /// Generate column definition
    fn generate_column(&self, field: &FieldDescribe) -> String {
        let mut col = format!(
            "{} {}",
            self.dialect.quote_identifier(&field.column_name),
            self.dialect.column_type(field.field_type)
        );

        if field.field_type == SalesforceFieldType::Id {
            col.push_str(" PRIMARY KEY");
        } else if !field.nillable {
            col.push_str(" NOT NULL");
        }

        col
    }

    /// Generate CREATE INDEX statements for an SObject
    pub fn generate_indexes(&self, object: &SObjectDescribe) -> Vec<String> {
        let table = &object.table_name;

        object
            .fields()
            .filter(|f| f.is_relationship() || f.name == "Name")
            .map(|field| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    self.dialect
                        .quote_identifier(&format!("idx_{}_{}", table, field.column_name)),
                    self.dialect.quote_identifier(table),
                    self.dialect.quote_identifier(&field.column_name)
                )
            })
            .collect()
    }

    /// Generate complete DDL for a schema, parents before children
    pub fn generate_schema(&self, schema: &SalesforceSchema) -> String {
        let mut sql = String::new();
        let objects = creation_order(schema);

        for object in &objects {
            sql.push_str(&self.generate_table(object));
            sql.push_str(";\n\n");
        }

        for object in &objects {
            for index in self.generate_indexes(object) {
                sql.push_str(&index);
                sql.push_str(";\n");
            }
        }

        sql
    }
}

/// Id first, then Name, then the rest alphabetically
fn ordered_fields(object: &SObjectDescribe) -> Vec<&FieldDescribe> {
    let mut fields: Vec<_> = object.fields().collect();
    fields.sort_by_key(|f| {
        let rank = match f.name.as_str() {
            "Id" => 0,
            "Name" => 1,
            _ => 2,
        };
        (rank, f.name.clone())
    });
    fields
}

/// Objects with no lookups first so every REFERENCES target already exists
fn creation_order(schema: &SalesforceSchema) -> Vec<&SObjectDescribe> {
    let mut objects: Vec<_> = schema.objects().collect();
    objects.sort_by_key(|o| (o.fields().any(|f| f.is_relationship()), o.name.clone()));
    objects
}
