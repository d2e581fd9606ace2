pub mod ast;
pub mod binds;
pub mod config;
pub mod dml;
pub mod error;
pub mod id;
pub mod lexer;
pub mod objects;
pub mod operations;
pub mod parser;
pub mod reconcile;
pub mod sobject;
pub mod sql;
pub mod store;

pub use ast::*;
pub use binds::{BindValue, Binds};
pub use config::{Config, ConfigError, DuplicateNamePolicy, LockingMode, RecordDefaults};
pub use dml::{Dml, UpsertOutcome};
pub use error::{DmlError, DmlResult};
pub use id::{InvalidRecordId, RecordId};
pub use lexer::{tokenize, Lexer, Span, Token, TokenKind};
pub use objects::{Account, Case, Contact, Lead, Opportunity};
pub use operations::Operations;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use reconcile::{ReconcilePlan, ReconcileReport};
pub use sobject::{FieldValue, NameKeyed, ParentLinked, Record, SObject};
pub use store::{Store, UnitOfWork};
