//! Typed write cursors.
//!
//! A [`Cursor`] is bound to one [`TableDef`]. Values are coerced to the
//! column's declared type when they are set, so `get_field` returns exactly
//! what will be written. Columns the table does not declare are ignored.

use crate::connection::Connection;
use crate::error::{DbError, Result};
use crate::schema::{ColumnDef, FieldKind, TableDef};
use crate::value::{is_numeric, FieldValue, Value};
use chrono::DateTime;
use std::collections::HashSet;

pub struct Cursor<'a> {
    con: &'a Connection,
    table: &'a TableDef,
    live: Option<HashSet<String>>,
    fields: Vec<(&'static str, FieldValue)>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(con: &'a Connection, table: &'a TableDef) -> Self {
        Cursor {
            con,
            table,
            live: None,
            fields: Vec::new(),
        }
    }

    /// Only accept columns also present in `live`.
    pub(crate) fn restrict(mut self, live: HashSet<String>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn table(&self) -> &TableDef {
        self.table
    }

    fn accepts(&self, column: &ColumnDef) -> bool {
        self.live
            .as_ref()
            .map_or(true, |live| live.contains(column.name))
    }

    /// Assign a field, coercing it to the column type.
    ///
    /// Unknown columns are a no-op. A value that cannot be coerced, or `NULL`
    /// on a non-nullable column, is a `Validation` error.
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<&mut Self> {
        let Some(column) = self.table.column(name).filter(|c| self.accepts(c)) else {
            log::debug!("Ignoring unknown column {name} on {}", self.table.name);
            return Ok(self);
        };
        let name = column.name;
        let value = coerce(self.table.name, column, value.into())?;
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        Ok(self)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    pub fn unset_field(&mut self, name: &str) {
        self.fields.retain(|(n, _)| *n != name);
    }

    /// Drop every pending field so the cursor can be reused.
    pub fn clean(&mut self) {
        self.fields.clear();
    }

    /// Pending `(column, value)` pairs in assignment order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    fn table_name(&self) -> String {
        self.con.escape_system(&self.con.table(self.table.name))
    }

    pub(crate) fn assignments(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "{} = {}",
                    self.con.escape_system(name),
                    self.con.driver().literal(value)
                )
            })
            .collect()
    }

    /// Render the `INSERT` for the pending fields.
    pub fn insert_statement(&self) -> Result<String> {
        if let Some(missing) = self
            .table
            .columns
            .iter()
            .find(|c| c.is_required() && self.accepts(c) && !self.is_field(c.name))
        {
            return Err(DbError::Validation(format!(
                "Column {} of {} is required",
                missing.name, self.table.name
            )));
        }
        if self.fields.is_empty() {
            return Err(DbError::Validation(format!(
                "Nothing to insert into {}",
                self.table.name
            )));
        }
        let names: Vec<String> = self
            .fields
            .iter()
            .map(|(name, _)| self.con.escape_system(name))
            .collect();
        let values: Vec<String> = self
            .fields
            .iter()
            .map(|(_, value)| self.con.driver().literal(value))
            .collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name(),
            names.join(", "),
            values.join(", ")
        ))
    }

    /// Render the `UPDATE` for the pending fields. A leading `WHERE` in
    /// `predicate` is optional; a blank predicate is refused.
    pub fn update_statement(&self, predicate: &str) -> Result<String> {
        if self.fields.is_empty() {
            return Err(DbError::Validation(format!(
                "Nothing to update in {}",
                self.table.name
            )));
        }
        let predicate = predicate.trim();
        let predicate = match predicate.get(..6) {
            Some(head) if head.eq_ignore_ascii_case("where ") => predicate[6..].trim_start(),
            _ if predicate.eq_ignore_ascii_case("where") => "",
            _ => predicate,
        };
        if predicate.is_empty() {
            return Err(DbError::Validation(format!(
                "Update of {} needs a predicate",
                self.table.name
            )));
        }
        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            self.table_name(),
            self.assignments().join(", "),
            predicate
        ))
    }

    /// Insert the pending row and clear the cursor.
    ///
    /// Returns the row identity: the integer primary key when it was set
    /// explicitly, otherwise whatever the engine generated (if anything).
    pub fn insert(&mut self) -> Result<Option<i64>> {
        let sql = self.insert_statement()?;
        let explicit = self
            .table
            .integer_key()
            .and_then(|key| match self.get_field(key.name) {
                Some(FieldValue::Integer(n)) => Some(*n),
                _ => None,
            });
        self.con.execute(&sql)?;
        let id = match explicit {
            Some(id) => Some(id),
            None => self.con.last_insert_id()?,
        };
        self.clean();
        Ok(id)
    }

    /// Update rows matching `predicate` and clear the cursor.
    pub fn update(&mut self, predicate: &str) -> Result<u64> {
        let sql = self.update_statement(predicate)?;
        let affected = self.con.execute(&sql)?;
        self.clean();
        Ok(affected)
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("table", &self.table.name)
            .field("fields", &self.fields)
            .finish()
    }
}

fn invalid(table: &str, column: &ColumnDef, what: &str) -> DbError {
    DbError::Validation(format!(
        "Column {} of {table} cannot hold {what}",
        column.name
    ))
}

/// Coerce `value` into the representation of `column`'s type.
fn coerce(table: &str, column: &ColumnDef, value: FieldValue) -> Result<FieldValue> {
    use FieldValue as F;

    let value = match value {
        F::Expr(sql) => return Ok(F::Expr(sql)),
        F::Null if column.nullable => return Ok(F::Null),
        F::Null => return Err(invalid(table, column, "NULL")),
        other => other,
    };

    match column.kind.field_kind() {
        FieldKind::String => Ok(match value {
            F::Integer(n) => F::String(n.to_string()),
            F::Real(f) => F::String(f.to_string()),
            F::Boolean(b) => F::String((if b { "1" } else { "0" }).to_string()),
            F::Date(d) => F::String(F::format_date(&d)),
            other => other,
        }),
        FieldKind::Integer => match value {
            F::Integer(n) => Ok(F::Integer(n)),
            F::Boolean(b) => Ok(F::Integer(i64::from(b))),
            F::Real(f) if f.is_finite() => Ok(F::Integer(f.trunc() as i64)),
            F::String(s) => {
                let trimmed = s.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    Ok(F::Integer(n))
                } else if is_numeric(trimmed) {
                    Ok(F::Integer(Value::Text(trimmed.to_string()).to_integer()))
                } else {
                    Err(invalid(table, column, &format!("'{s}' as an integer")))
                }
            }
            _ => Err(invalid(table, column, "this value as an integer")),
        },
        FieldKind::Real => match value {
            F::Real(f) if f.is_finite() => Ok(F::Real(f)),
            F::Real(f) => Err(invalid(table, column, &format!("{f} as a number"))),
            F::Integer(n) => Ok(F::Real(n as f64)),
            F::Boolean(b) => Ok(F::Real(if b { 1.0 } else { 0.0 })),
            F::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(F::Real)
                .ok_or_else(|| invalid(table, column, &format!("'{s}' as a number"))),
            _ => Err(invalid(table, column, "this value as a number")),
        },
        FieldKind::Boolean => match value {
            F::Boolean(b) => Ok(F::Boolean(b)),
            F::Integer(n) => Ok(F::Boolean(n != 0)),
            F::Real(f) if !f.is_nan() => Ok(F::Boolean(f != 0.0)),
            F::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(F::Boolean(true)),
                "0" | "false" | "no" | "off" | "" => Ok(F::Boolean(false)),
                _ => Err(invalid(table, column, &format!("'{s}' as a boolean"))),
            },
            _ => Err(invalid(table, column, "this value as a boolean")),
        },
        FieldKind::Date => match value {
            F::Date(d) => Ok(F::Date(d)),
            F::String(s) => Value::Text(s.clone())
                .to_datetime()
                .map(F::Date)
                .ok_or_else(|| invalid(table, column, &format!("'{s}' as a date"))),
            F::Integer(ts) => DateTime::from_timestamp(ts, 0)
                .map(|d| F::Date(d.naive_utc()))
                .ok_or_else(|| invalid(table, column, "this timestamp")),
            _ => Err(invalid(table, column, "this value as a date")),
        },
    }
}
