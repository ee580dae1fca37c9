//! Result sets.
//!
//! [`Record`] is the forward-only view handed back by `Connection::select`.
//! [`StaticRecord`] is a detached copy that can be rewound and sorted. Both
//! expose the same read accessors through [`RowView`] and accept
//! [`RecordExtension`]s through [`MetaRecord`].

mod extension;
mod static_record;

pub use extension::{ExtensionFn, Extensions, RecordExtension};
pub use static_record::StaticRecord;

use crate::driver::{Column, ResultSet};
use crate::error::{DbError, Result};
use crate::value::Value;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Row pointer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Before the first `fetch()`. Accessors read the first row.
    Unfetched,
    At(usize),
    Exhausted,
}

/// Read access to the current row. This is all an extension function sees.
pub trait RowView {
    fn columns(&self) -> &[Column];

    /// Cells of the current row, `None` once exhausted or when empty.
    fn current(&self) -> Option<&[Value]>;

    fn position(&self) -> Position;

    /// Number of rows the record holds.
    fn count(&self) -> usize;

    fn index(&self) -> usize {
        match self.position() {
            Position::Unfetched => 0,
            Position::At(i) => i,
            Position::Exhausted => self.count(),
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Raw cell.
    fn field(&self, name: &str) -> Option<&Value> {
        let i = self.column_index(name)?;
        self.current()?.get(i)
    }

    /// Short form of [`RowView::field`].
    fn f(&self, name: &str) -> Option<&Value> {
        self.field(name)
    }

    fn is_null(&self, name: &str) -> bool {
        self.field(name).map(Value::is_null).unwrap_or(true)
    }

    fn string(&self, name: &str) -> String {
        self.field(name).map(Value::to_text).unwrap_or_default()
    }

    fn integer(&self, name: &str) -> i64 {
        self.field(name).map(Value::to_integer).unwrap_or(0)
    }

    fn real(&self, name: &str) -> f64 {
        self.field(name).map(Value::to_real).unwrap_or(0.0)
    }

    fn boolean(&self, name: &str) -> bool {
        self.field(name).map(Value::to_bool).unwrap_or(false)
    }

    fn datetime(&self, name: &str) -> Option<NaiveDateTime> {
        self.field(name).and_then(Value::to_datetime)
    }

    /// Current row as a column map.
    fn row(&self) -> BTreeMap<String, Value> {
        let Some(cells) = self.current() else {
            return BTreeMap::new();
        };
        self.columns()
            .iter()
            .zip(cells)
            .map(|(c, v)| (c.name.clone(), v.clone()))
            .collect()
    }
}

/// A record that can be iterated and extended with computed accessors.
pub trait MetaRecord: RowView {
    /// Advance to the next row; false once there is none.
    fn fetch(&mut self) -> bool;

    fn extensions(&self) -> &Extensions;

    fn extensions_mut(&mut self) -> &mut Extensions;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn is_start(&self) -> bool {
        matches!(self.position(), Position::Unfetched | Position::At(0))
    }

    fn is_end(&self) -> bool {
        let count = self.count();
        count > 0 && self.position() != Position::Exhausted && self.index() == count - 1
    }

    fn extend(&mut self, extension: impl Into<Rc<RecordExtension>>)
    where
        Self: Sized,
    {
        self.extensions_mut().attach(extension.into());
    }

    /// Call an extension function on the current row.
    fn call(&self, function: &str) -> Result<Value>
    where
        Self: Sized,
    {
        self.call_with(function, &[])
    }

    fn call_with(&self, function: &str, args: &[Value]) -> Result<Value>
    where
        Self: Sized,
    {
        let f = self
            .extensions()
            .lookup(function)
            .ok_or_else(|| DbError::UnknownMethod(function.to_string()))?;
        Ok(f(self, args))
    }
}

/// Forward-only result of one select.
pub struct Record {
    columns: Vec<Column>,
    pending: std::vec::IntoIter<Vec<Value>>,
    current: Option<Vec<Value>>,
    position: Position,
    count: usize,
    extensions: Extensions,
}

impl Record {
    pub fn new(set: ResultSet) -> Self {
        let count = set.rows.len();
        let mut pending = set.rows.into_iter();
        let current = pending.next();
        Record {
            columns: set.columns,
            pending,
            current,
            position: Position::Unfetched,
            count,
            extensions: Extensions::default(),
        }
    }

    /// Materialize the current row and every row after it.
    pub fn to_static(self) -> StaticRecord {
        let mut rows = Vec::with_capacity(self.pending.len() + 1);
        if self.position != Position::Exhausted {
            rows.extend(self.current);
        }
        rows.extend(self.pending);
        StaticRecord::from_parts(self.columns, rows, self.extensions)
    }
}

impl RowView for Record {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn current(&self) -> Option<&[Value]> {
        self.current.as_deref()
    }

    fn position(&self) -> Position {
        self.position
    }

    fn count(&self) -> usize {
        self.count
    }
}

impl MetaRecord for Record {
    fn fetch(&mut self) -> bool {
        match self.position {
            Position::Unfetched if self.current.is_some() => {
                self.position = Position::At(0);
                true
            }
            Position::At(i) => match self.pending.next() {
                Some(row) => {
                    self.current = Some(row);
                    self.position = Position::At(i + 1);
                    true
                }
                None => {
                    self.current = None;
                    self.position = Position::Exhausted;
                    false
                }
            },
            Position::Unfetched | Position::Exhausted => {
                self.position = Position::Exhausted;
                false
            }
        }
    }

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("columns", &self.columns)
            .field("position", &self.position)
            .field("count", &self.count)
            .field("extensions", &self.extensions)
            .finish()
    }
}
