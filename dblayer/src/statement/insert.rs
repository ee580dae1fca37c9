use crate::connection::Connection;
use crate::error::{DbError, Result};
use crate::value::FieldValue;

/// `INSERT INTO t (cols) VALUES (...), (...)` from explicit values.
#[derive(Debug, Clone)]
pub struct InsertStatement<'a> {
    con: &'a Connection,
    table: Option<String>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl<'a> InsertStatement<'a> {
    pub fn new(con: &'a Connection) -> Self {
        InsertStatement {
            con,
            table: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Target table.
    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add one row tuple; every value is quoted by the connection.
    pub fn values<I>(&mut self, row: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        let row = row.into_iter().map(|v| self.con.quote(v)).collect();
        self.rows.push(row);
        self
    }

    pub fn statement(&self) -> Result<String> {
        let Some(table) = &self.table else {
            return Err(DbError::Validation(
                "INSERT statement has no target table".to_string(),
            ));
        };
        if self.rows.is_empty() {
            return Err(DbError::Validation(format!(
                "INSERT into {table} has no values"
            )));
        }
        let width = if self.columns.is_empty() {
            self.rows[0].len()
        } else {
            self.columns.len()
        };
        if let Some(bad) = self.rows.iter().find(|row| row.len() != width) {
            return Err(DbError::Validation(format!(
                "INSERT into {table}: row of {} values for {width} columns",
                bad.len()
            )));
        }

        let mut sql = format!("INSERT INTO {table} ");
        if !self.columns.is_empty() {
            sql.push_str(&format!("({}) ", self.columns.join(", ")));
        }
        sql.push_str("VALUES ");
        let tuples: Vec<String> = self
            .rows
            .iter()
            .map(|row| format!("({})", row.join(", ")))
            .collect();
        sql.push_str(&tuples.join(", "));
        Ok(sql)
    }

    /// Execute; returns the number of inserted rows.
    pub fn insert(&self) -> Result<u64> {
        self.con.execute(&self.statement()?)
    }
}
