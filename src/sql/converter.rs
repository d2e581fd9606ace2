//! SOQL to SQL converter

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::ast::{
    ComparisonOp, Condition, InValues, Operand, OrderByField, SelectField, SoqlQuery,
};
use crate::binds::{BindValue, Binds};
use crate::sobject::FieldValue;

use super::date_literals::expand_date_comparison;
use super::dialect::SqliteDialect;
use super::error::{ConversionError, ConversionResult};
use super::schema::{SObjectDescribe, SalesforceSchema};

/// Result of SOQL to SQL conversion
#[derive(Debug, Clone)]
pub struct SqlConversion {
    /// The generated SQL query
    pub sql: String,
    /// Values for the `?N` placeholders, in order
    pub parameters: Vec<FieldValue>,
    /// Column aliases mapping SOQL field paths to result columns
    pub column_map: HashMap<String, String>,
    /// Canonical API name of the FROM object
    pub object: String,
    /// True for `SELECT COUNT() ...` style queries
    pub aggregate: bool,
}

/// Configuration for SOQL to SQL conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Maximum number of parent hops in a field path
    pub max_relationship_depth: u8,
    /// Day that date literals are resolved against
    pub today: NaiveDate,
}

impl ConversionConfig {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            max_relationship_depth: 5,
            today,
        }
    }

    pub fn with_max_relationship_depth(mut self, depth: u8) -> Self {
        self.max_relationship_depth = depth;
        self
    }
}

/// Main SOQL to SQL converter
pub struct SoqlToSqlConverter<'a> {
    schema: &'a SalesforceSchema,
    dialect: SqliteDialect,
    config: ConversionConfig,
    /// Alias counter for joins
    alias_counter: u32,
    /// Collected parameters
    parameters: Vec<FieldValue>,
    /// Collected JOINs for relationship traversal
    joins: Vec<JoinClause>,
    /// Column aliases for SELECT
    column_map: HashMap<String, String>,
    /// Join aliases keyed by "<from alias>.<fk column>"
    table_aliases: HashMap<String, String>,
}

/// A JOIN clause to be added to the query
#[derive(Debug, Clone)]
struct JoinClause {
    table: String,
    alias: String,
    condition: String,
}

/// A field path resolved against the schema
struct ResolvedField {
    /// Qualified column expression (e.g. `t1."name"`)
    sql: String,
    /// Path with canonical API casing (e.g. `Account.Name`)
    api_path: String,
}

const ROOT_ALIAS: &str = "t0";

impl<'a> SoqlToSqlConverter<'a> {
    /// Create a new converter with schema
    pub fn new(schema: &'a SalesforceSchema, config: ConversionConfig) -> Self {
        Self {
            schema,
            dialect: SqliteDialect,
            config,
            alias_counter: 0,
            parameters: Vec::new(),
            joins: Vec::new(),
            column_map: HashMap::new(),
            table_aliases: HashMap::new(),
        }
    }

    /// Convert a SOQL query to SQL, resolving bind variables from `binds`
    pub fn convert(&mut self, query: &SoqlQuery, binds: &Binds) -> ConversionResult<SqlConversion> {
        // Reset state
        self.parameters.clear();
        self.joins.clear();
        self.column_map.clear();
        self.table_aliases.clear();
        self.alias_counter = 0;

        let schema = self.schema;
        let root = schema
            .get_object(&query.from_clause)
            .ok_or_else(|| ConversionError::UnknownObject(query.from_clause.clone()))?;

        let from_sql = format!(
            "{} {}",
            self.dialect.quote_identifier(&root.table_name),
            self.next_alias()
        );
        let select_sql = self.convert_select_clause(root, &query.select_clause)?;

        let where_sql = match query.where_clause {
            Some(ref condition) => Some(self.convert_condition(root, condition, binds)?),
            None => None,
        };

        let order_by_sql = if !query.order_by_clause.is_empty() {
            Some(self.convert_order_by(root, &query.order_by_clause)?)
        } else {
            None
        };

        let limit_sql = match query.limit_clause {
            Some(ref operand) => Some(self.convert_row_count(operand, binds)?),
            None => None,
        };
        let offset_sql = match query.offset_clause {
            Some(ref operand) => Some(self.convert_row_count(operand, binds)?),
            None => None,
        };

        // Build final SQL
        let mut sql = format!("SELECT {}\nFROM {}", select_sql, from_sql);

        for join in &self.joins {
            sql.push_str(&format!(
                "\nLEFT JOIN {} {} ON {}",
                join.table, join.alias, join.condition
            ));
        }

        if let Some(w) = where_sql {
            sql.push_str(&format!("\nWHERE {}", w));
        }
        if let Some(o) = order_by_sql {
            sql.push_str(&format!("\nORDER BY {}", o));
        }
        let lo = self
            .dialect
            .limit_offset(limit_sql.as_deref(), offset_sql.as_deref());
        if !lo.is_empty() {
            sql.push_str(&format!("\n{}", lo));
        }

        Ok(SqlConversion {
            sql,
            parameters: std::mem::take(&mut self.parameters),
            column_map: std::mem::take(&mut self.column_map),
            object: root.name.clone(),
            aggregate: query.is_aggregate(),
        })
    }

    /// Convert SELECT clause
    fn convert_select_clause(
        &mut self,
        root: &'a SObjectDescribe,
        fields: &[SelectField],
    ) -> ConversionResult<String> {
        let aggregate = fields.iter().any(|f| matches!(f, SelectField::Count { .. }));
        let mut columns = Vec::new();
        let mut expr_counter = 0;

        if aggregate {
            for field in fields {
                let SelectField::Count { field, alias } = field else {
                    return Err(ConversionError::InvalidExpression(
                        "plain fields cannot be mixed with COUNT without GROUP BY".to_string(),
                    ));
                };
                let count_sql = match field {
                    Some(path) => format!("COUNT({})", self.convert_field_path(root, path)?.sql),
                    None => "COUNT(*)".to_string(),
                };
                let alias = alias.clone().unwrap_or_else(|| {
                    let a = format!("expr{}", expr_counter);
                    expr_counter += 1;
                    a
                });
                columns.push(format!(
                    "{} AS {}",
                    count_sql,
                    self.dialect.quote_identifier(&alias)
                ));
                self.column_map.insert(alias.clone(), alias);
            }
            return Ok(columns.join(", "));
        }

        let selects_id = fields
            .iter()
            .any(|f| matches!(f, SelectField::Field(path) if path.eq_ignore_ascii_case("Id")));
        if !selects_id {
            let resolved = self.convert_field_path(root, "Id")?;
            columns.push(self.aliased(&resolved));
            self.column_map.insert("Id".to_string(), resolved.api_path);
        }

        for field in fields {
            if let SelectField::Field(path) = field {
                let resolved = self.convert_field_path(root, path)?;
                if self.column_map.values().any(|a| a == &resolved.api_path) {
                    continue;
                }
                columns.push(self.aliased(&resolved));
                self.column_map.insert(path.clone(), resolved.api_path);
            }
        }

        Ok(columns.join(", "))
    }

    fn aliased(&self, field: &ResolvedField) -> String {
        format!(
            "{} AS {}",
            field.sql,
            self.dialect.quote_identifier(&field.api_path)
        )
    }

    /// Convert a field path (e.g., "Id", "Account.Name")
    fn convert_field_path(
        &mut self,
        root: &'a SObjectDescribe,
        path: &str,
    ) -> ConversionResult<ResolvedField> {
        let parts: Vec<&str> = path.split('.').collect();
        let hops = parts.len() - 1;

        if hops > usize::from(self.config.max_relationship_depth) {
            return Err(ConversionError::RelationshipDepthExceeded {
                max: self.config.max_relationship_depth,
                actual: u8::try_from(hops).unwrap_or(u8::MAX),
            });
        }

        let schema = self.schema;
        let mut current_obj = root;
        let mut current_alias = ROOT_ALIAS.to_string();
        let mut api_path = Vec::with_capacity(parts.len());

        for part in &parts[..hops] {
            let lookup = current_obj
                .get_relationship(part)
                .ok_or_else(|| ConversionError::NotARelationship(part.to_string()))?;
            let parent_name = lookup
                .reference_to
                .as_deref()
                .ok_or_else(|| ConversionError::NotARelationship(part.to_string()))?;
            let parent = schema
                .get_object(parent_name)
                .ok_or_else(|| ConversionError::UnknownObject(parent_name.to_string()))?;

            current_alias = self.get_or_create_join(&current_alias, parent, &lookup.column_name);
            api_path.push(
                lookup
                    .relationship_name
                    .clone()
                    .unwrap_or_else(|| part.to_string()),
            );
            current_obj = parent;
        }

        let final_name = parts[hops];
        let field = current_obj
            .get_field(final_name)
            .ok_or_else(|| ConversionError::UnknownField {
                object: current_obj.name.clone(),
                field: final_name.to_string(),
            })?;
        api_path.push(field.name.clone());

        Ok(ResolvedField {
            sql: format!(
                "{}.{}",
                current_alias,
                self.dialect.quote_identifier(&field.column_name)
            ),
            api_path: api_path.join("."),
        })
    }

    /// Get or create a JOIN for a relationship
    /// from_alias: the alias of the current table (e.g., "t0" for contact)
    /// join_column: the FK column on the from table (e.g., "account_id")
    fn get_or_create_join(
        &mut self,
        from_alias: &str,
        to_obj: &SObjectDescribe,
        join_column: &str,
    ) -> String {
        let join_key = format!("{}.{}", from_alias, join_column);
        if let Some(alias) = self.table_aliases.get(&join_key) {
            return alias.clone();
        }

        let alias = self.next_alias();
        self.joins.push(JoinClause {
            table: self.dialect.quote_identifier(&to_obj.table_name),
            alias: alias.clone(),
            condition: format!(
                "{}.{} = {}.{}",
                from_alias,
                self.dialect.quote_identifier(join_column),
                alias,
                self.dialect.quote_identifier("id")
            ),
        });

        self.table_aliases.insert(join_key, alias.clone());
        alias
    }

    /// Convert a WHERE condition
    fn convert_condition(
        &mut self,
        root: &'a SObjectDescribe,
        condition: &Condition,
        binds: &Binds,
    ) -> ConversionResult<String> {
        match condition {
            Condition::And(left, right) => Ok(format!(
                "({} AND {})",
                self.convert_condition(root, left, binds)?,
                self.convert_condition(root, right, binds)?
            )),
            Condition::Or(left, right) => Ok(format!(
                "({} OR {})",
                self.convert_condition(root, left, binds)?,
                self.convert_condition(root, right, binds)?
            )),
            Condition::Not(inner) => Ok(format!(
                "NOT ({})",
                self.convert_condition(root, inner, binds)?
            )),
            Condition::Comparison {
                field,
                operator,
                value,
            } => {
                let column = self.convert_field_path(root, field)?.sql;
                self.convert_comparison(&column, *operator, value, binds)
            }
            Condition::In {
                field,
                negated,
                values,
            } => {
                let column = self.convert_field_path(root, field)?.sql;
                self.convert_in(&column, *negated, values, binds)
            }
        }
    }

    fn convert_comparison(
        &mut self,
        column: &str,
        op: ComparisonOp,
        value: &Operand,
        binds: &Binds,
    ) -> ConversionResult<String> {
        if let Operand::Date(literal) = value {
            let today = self.config.today;
            return expand_date_comparison(column, op, *literal, today, |d| {
                self.add_parameter(FieldValue::Date(d))
            });
        }

        let value = match value {
            Operand::Bind(name) => match lookup_bind(binds, name)? {
                BindValue::Scalar(v) => v.clone(),
                BindValue::List(_) => return Err(ConversionError::ListBindOutsideIn(name.clone())),
            },
            other => literal_value(other)?,
        };

        if value.is_null() {
            return match op {
                ComparisonOp::Equal => Ok(format!("{} IS NULL", column)),
                ComparisonOp::NotEqual => Ok(format!("{} IS NOT NULL", column)),
                _ => Err(ConversionError::InvalidExpression(format!(
                    "NULL cannot be compared with {}",
                    op.as_sql()
                ))),
            };
        }

        let placeholder = self.add_parameter(value);
        Ok(format!("{} {} {}", column, op.as_sql(), placeholder))
    }

    fn convert_in(
        &mut self,
        column: &str,
        negated: bool,
        values: &InValues,
        binds: &Binds,
    ) -> ConversionResult<String> {
        let values: Vec<FieldValue> = match values {
            InValues::List(operands) => operands
                .iter()
                .map(literal_value)
                .collect::<ConversionResult<_>>()?,
            InValues::Bind(name) => match lookup_bind(binds, name)? {
                BindValue::List(values) => values.clone(),
                BindValue::Scalar(value) => vec![value.clone()],
            },
        };

        // Empty IN matches nothing; empty NOT IN matches everything
        if values.is_empty() {
            return Ok(if negated { "1 = 1" } else { "1 = 0" }.to_string());
        }

        let placeholders: Vec<String> = values
            .into_iter()
            .map(|v| self.add_parameter(v))
            .collect();
        Ok(format!(
            "{} {} ({})",
            column,
            if negated { "NOT IN" } else { "IN" },
            placeholders.join(", ")
        ))
    }

    /// Convert ORDER BY clause
    fn convert_order_by(
        &mut self,
        root: &'a SObjectDescribe,
        fields: &[OrderByField],
    ) -> ConversionResult<String> {
        let converted: Result<Vec<_>, _> = fields
            .iter()
            .map(|f| {
                let mut sql = self.convert_field_path(root, &f.field)?.sql;
                if !f.ascending {
                    sql.push_str(" DESC");
                }
                if let Some(nulls_first) = f.nulls_first {
                    sql.push(' ');
                    sql.push_str(if nulls_first {
                        self.dialect.nulls_first()
                    } else {
                        self.dialect.nulls_last()
                    });
                }
                Ok(sql)
            })
            .collect();
        Ok(converted?.join(", "))
    }

    /// LIMIT / OFFSET value
    fn convert_row_count(&mut self, operand: &Operand, binds: &Binds) -> ConversionResult<String> {
        match operand {
            Operand::Integer(n) if *n >= 0 => Ok(n.to_string()),
            Operand::Bind(name) => match lookup_bind(binds, name)? {
                BindValue::Scalar(FieldValue::Integer(n)) if *n >= 0 => {
                    Ok(self.add_parameter(FieldValue::Integer(*n)))
                }
                _ => Err(ConversionError::InvalidExpression(format!(
                    "bind variable '{}' must hold a non-negative integer",
                    name
                ))),
            },
            other => Err(ConversionError::InvalidExpression(format!(
                "invalid row count: {:?}",
                other
            ))),
        }
    }

    /// Add a bind parameter and return its placeholder
    fn add_parameter(&mut self, value: FieldValue) -> String {
        self.parameters.push(value);
        self.dialect.parameter_placeholder(self.parameters.len())
    }

    /// Generate next table alias
    fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.alias_counter);
        self.alias_counter += 1;
        alias
    }
}

fn lookup_bind<'b>(binds: &'b Binds, name: &str) -> ConversionResult<&'b BindValue> {
    binds
        .get(name)
        .ok_or_else(|| ConversionError::UnboundVariable(name.to_string()))
}

/// Value of a literal operand
fn literal_value(operand: &Operand) -> ConversionResult<FieldValue> {
    Ok(match operand {
        Operand::Null => FieldValue::Null,
        Operand::Boolean(b) => FieldValue::Boolean(*b),
        Operand::Integer(n) => FieldValue::Integer(*n),
        Operand::Double(d) => FieldValue::Double(*d),
        Operand::String(s) => FieldValue::Text(s.clone()),
        Operand::Bind(name) => {
            return Err(ConversionError::InvalidExpression(format!(
                "bind variable ':{}' is not allowed inside a value list",
                name
            )))
        }
        Operand::Date(_) => {
            return Err(ConversionError::InvalidExpression(
                "date literals are only allowed in comparisons".to_string(),
            ))
        }
    })
}

/// Parse and convert a SOQL string in one step
pub fn convert_soql(
    soql: &str,
    schema: &SalesforceSchema,
    binds: &Binds,
    config: ConversionConfig,
) -> crate::DmlResult<SqlConversion> {
    let query = crate::parser::parse(soql)?;
    let mut converter = SoqlToSqlConverter::new(schema, config);
    Ok(converter.convert(&query, binds)?)
}
