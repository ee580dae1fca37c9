use super::{Clauses, Statement};
use crate::connection::Connection;
use crate::cursor::Cursor;
use crate::error::{DbError, Result};
use crate::value::FieldValue;

/// `UPDATE t SET ... WHERE ...`
#[derive(Debug, Clone)]
pub struct UpdateStatement<'a> {
    con: &'a Connection,
    clauses: Clauses,
    sets: Vec<String>,
}

impl<'a> Statement<'a> for UpdateStatement<'a> {
    fn connection(&self) -> &'a Connection {
        self.con
    }

    fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    fn clauses_mut(&mut self) -> &mut Clauses {
        &mut self.clauses
    }
}

impl<'a> UpdateStatement<'a> {
    pub fn new(con: &'a Connection) -> Self {
        UpdateStatement {
            con,
            clauses: Clauses::default(),
            sets: Vec::new(),
        }
    }

    /// Raw assignment such as `post_words = ''`.
    pub fn set(&mut self, assignment: impl Into<String>) -> &mut Self {
        self.sets.push(assignment.into());
        self
    }

    /// `column = <quoted value>`.
    pub fn set_value(&mut self, column: &str, value: impl Into<FieldValue>) -> &mut Self {
        let assignment = format!("{column} = {}", self.con.quote(value));
        self.sets.push(assignment);
        self
    }

    fn render(&self, sets: &[String]) -> Result<String> {
        let Some(table) = self.clauses.from.first() else {
            return Err(DbError::Validation(
                "UPDATE statement has no target table".to_string(),
            ));
        };
        if sets.is_empty() {
            return Err(DbError::Validation(format!(
                "UPDATE of {table} assigns nothing"
            )));
        }
        Ok(format!(
            "UPDATE {table} SET {} {}",
            sets.join(", "),
            self.clauses.predicate()
        ))
    }

    pub fn statement(&self) -> Result<String> {
        self.render(&self.sets)
    }

    /// Execute; returns the affected row count.
    pub fn update(&self) -> Result<u64> {
        self.con.execute(&self.statement()?)
    }

    /// Execute with the pending fields of `cursor` (plus any explicit `set`).
    pub fn update_cursor(&self, cursor: &Cursor<'_>) -> Result<u64> {
        let mut sets = self.sets.clone();
        sets.extend(cursor.assignments());
        self.con.execute(&self.render(&sets)?)
    }
}
