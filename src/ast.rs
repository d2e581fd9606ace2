//! Syntax tree for SOQL queries

use crate::lexer::Span;

/// SOQL Query
#[derive(Debug, Clone, PartialEq)]
pub struct SoqlQuery {
    pub select_clause: Vec<SelectField>,
    pub from_clause: String,
    pub where_clause: Option<Condition>,
    pub order_by_clause: Vec<OrderByField>,
    pub limit_clause: Option<Operand>,
    pub offset_clause: Option<Operand>,
    pub span: Span,
}

impl SoqlQuery {
    /// True when the query selects an aggregate (`COUNT()` / `COUNT(field)`)
    pub fn is_aggregate(&self) -> bool {
        self.select_clause
            .iter()
            .any(|f| matches!(f, SelectField::Count { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectField {
    /// Field path like `Name` or `Account.Name`
    Field(String),
    /// `COUNT()` when `field` is `None`
    Count {
        field: Option<String>,
        alias: Option<String>,
    },
}

/// Boolean condition of a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Comparison {
        field: String,
        operator: ComparisonOp,
        value: Operand,
    },
    In {
        field: String,
        negated: bool,
        values: InValues,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Like,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::GreaterOrEqual => ">=",
            ComparisonOp::Like => "LIKE",
        }
    }
}

/// Right-hand side of an IN / NOT IN
#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    List(Vec<Operand>),
    Bind(String),
}

/// A literal, bind variable or date literal
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Bind(String),
    Date(DateLiteral),
}

/// Relative date literals (TODAY, LAST_N_DAYS:n, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLiteral {
    Today,
    Yesterday,
    Tomorrow,
    LastNDays(u32),
    NextNDays(u32),
    ThisMonth,
    ThisYear,
}

impl DateLiteral {
    /// Look up a literal that takes no `:n` argument
    pub fn simple(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "today" => Some(DateLiteral::Today),
            "yesterday" => Some(DateLiteral::Yesterday),
            "tomorrow" => Some(DateLiteral::Tomorrow),
            "this_month" => Some(DateLiteral::ThisMonth),
            "this_year" => Some(DateLiteral::ThisYear),
            _ => None,
        }
    }

    /// Look up a literal of the form `NAME:n`
    pub fn with_count(name: &str, n: u32) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "last_n_days" => Some(DateLiteral::LastNDays(n)),
            "next_n_days" => Some(DateLiteral::NextNDays(n)),
            _ => None,
        }
    }

    /// True for names that must be followed by `:n`
    pub fn takes_count(name: &str) -> bool {
        matches!(
            name.to_ascii_lowercase().as_str(),
            "last_n_days" | "next_n_days"
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByField {
    pub field: String,
    pub ascending: bool,
    pub nulls_first: Option<bool>,
}
