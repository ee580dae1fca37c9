//! Fluent SQL builders.
//!
//! Every builder borrows the [`Connection`] it renders for, so literal
//! quoting always goes through the connection's dialect. Builder methods
//! take `&mut self` and return it for chaining:
//!
//! ```no_run
//! use dblayer::prelude::*;
//!
//! # fn main() -> dblayer::Result<()> {
//! let con = Connection::open_memory()?;
//! let mut sql = con.select_statement();
//! sql.columns(["post_id", "post_title"])
//!     .from("post")
//!     .where_(format!("blog_id = {}", con.quote("default")))
//!     .order("post_dt DESC")
//!     .limit(10u64);
//! let rs = sql.select()?;
//! # Ok(())
//! # }
//! ```

mod delete;
mod insert;
mod join;
mod select;
mod update;

pub use delete::DeleteStatement;
pub use insert::InsertStatement;
pub use join::{JoinKind, JoinStatement};
pub use select::SelectStatement;
pub use update::UpdateStatement;

use crate::connection::Connection;
use crate::order::OrderSpec;
use crate::value::FieldValue;

/// Row window: a bare count, or an `(offset, count)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Range { offset: u64, count: u64 },
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Limit::Count(count)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Range { offset, count }
    }
}

impl From<[u64; 2]> for Limit {
    fn from([offset, count]: [u64; 2]) -> Self {
        Limit::Range { offset, count }
    }
}

/// Clause fragments shared by every statement kind.
#[derive(Debug, Clone, Default)]
pub struct Clauses {
    pub(crate) columns: Vec<String>,
    pub(crate) from: Vec<String>,
    pub(crate) where_: Vec<String>,
    pub(crate) cond: Vec<String>,
    pub(crate) sql: Vec<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) having: Vec<String>,
    pub(crate) order: Vec<String>,
    pub(crate) group: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) distinct: bool,
}

impl Clauses {
    /// `WHERE ...`; never empty so further conditions always compose.
    pub(crate) fn predicate(&self) -> String {
        let mut sql = String::from("WHERE ");
        if self.where_.is_empty() {
            sql.push_str("NULL IS NULL");
        } else {
            sql.push_str(&self.where_.join(" AND "));
        }
        for cond in &self.cond {
            sql.push(' ');
            sql.push_str(cond);
        }
        for fragment in &self.sql {
            sql.push(' ');
            sql.push_str(fragment);
        }
        sql
    }
}

/// Builder methods shared by the select, update and delete statements.
pub trait Statement<'a>: Sized {
    fn connection(&self) -> &'a Connection;

    #[doc(hidden)]
    fn clauses(&self) -> &Clauses;

    #[doc(hidden)]
    fn clauses_mut(&mut self) -> &mut Clauses;

    fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses_mut()
            .columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    fn column(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses_mut().columns.push(expr.into());
        self
    }

    fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.clauses_mut().from.push(table.into());
        self
    }

    fn from_as(&mut self, table: &str, alias: &str) -> &mut Self {
        self.clauses_mut().from.push(format!("{table} {alias}"));
        self
    }

    /// Source with an index hint; only MySQL renders the hint.
    fn from_indexed(&mut self, table: &str, alias: Option<&str>, force_index: &str) -> &mut Self {
        let mut source = match alias {
            Some(alias) => format!("{table} {alias}"),
            None => table.to_string(),
        };
        if self.connection().driver().is_mysql() {
            source.push_str(&format!(" FORCE INDEX ({force_index})"));
        } else {
            log::debug!("Index hint {force_index} ignored on {}", self.connection().driver());
        }
        self.clauses_mut().from.push(source);
        self
    }

    /// Predicate term; several terms are joined with `AND`.
    fn where_(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses_mut().where_.push(expr.into());
        self
    }

    fn and(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses_mut().cond.push(format!("AND {}", expr.into()));
        self
    }

    fn or(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses_mut().cond.push(format!("OR {}", expr.into()));
        self
    }

    /// `(a AND b)`; an empty group is always true.
    fn and_group<I, S>(&self, exprs: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exprs: Vec<String> = exprs.into_iter().map(Into::into).collect();
        if exprs.is_empty() {
            "(NULL IS NULL)".to_string()
        } else {
            format!("({})", exprs.join(" AND "))
        }
    }

    /// `(a OR b)`; an empty group matches nothing.
    fn or_group<I, S>(&self, exprs: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exprs: Vec<String> = exprs.into_iter().map(Into::into).collect();
        if exprs.is_empty() {
            "(NULL IS NOT NULL)".to_string()
        } else {
            format!("({})", exprs.join(" OR "))
        }
    }

    /// Raw clause appended after the predicate.
    fn sql(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.clauses_mut().sql.push(fragment.into());
        self
    }

    fn join(&mut self, join: &JoinStatement) -> &mut Self {
        self.clauses_mut().joins.push(join.statement());
        self
    }

    fn order(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses_mut().order.push(expr.into());
        self
    }

    fn order_by(&mut self, specs: &[OrderSpec]) -> &mut Self {
        if !specs.is_empty() {
            let rendered = self.connection().order_by(specs);
            self.clauses_mut().order.push(rendered);
        }
        self
    }

    fn group<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses_mut()
            .group
            .extend(columns.into_iter().map(Into::into));
        self
    }

    fn having(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses_mut().having.push(expr.into());
        self
    }

    fn limit(&mut self, limit: impl Into<Limit>) -> &mut Self {
        let clauses = self.clauses_mut();
        match limit.into() {
            Limit::Count(count) => {
                clauses.limit = Some(count);
                clauses.offset = None;
            }
            Limit::Range { offset, count } => {
                clauses.limit = Some(count);
                clauses.offset = Some(offset);
            }
        }
        self
    }

    fn offset(&mut self, offset: u64) -> &mut Self {
        self.clauses_mut().offset = Some(offset);
        self
    }

    fn distinct(&mut self) -> &mut Self {
        self.clauses_mut().distinct = true;
        self
    }

    fn quote(&self, value: impl Into<FieldValue>) -> String {
        self.connection().quote(value)
    }

    fn escape(&self, s: &str) -> String {
        self.connection().escape(s)
    }

    fn in_list<I>(&self, values: I) -> String
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.connection().in_list(values)
    }

    fn like(&self, field: &str, pattern: &str) -> String {
        self.connection().like(field, pattern)
    }

    fn is_null(&self, field: &str) -> String {
        format!("{field} IS NULL")
    }

    fn date_format(&self, field: &str, pattern: &str) -> String {
        self.connection().date_format(field, pattern)
    }
}
