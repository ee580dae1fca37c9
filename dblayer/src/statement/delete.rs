use super::{Clauses, Statement};
use crate::connection::Connection;
use crate::error::{DbError, Result};

/// `DELETE FROM t WHERE ...`
#[derive(Debug, Clone)]
pub struct DeleteStatement<'a> {
    con: &'a Connection,
    clauses: Clauses,
}

impl<'a> Statement<'a> for DeleteStatement<'a> {
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

impl<'a> DeleteStatement<'a> {
    pub fn new(con: &'a Connection) -> Self {
        DeleteStatement {
            con,
            clauses: Clauses::default(),
        }
    }

    pub fn statement(&self) -> Result<String> {
        let Some(table) = self.clauses.from.first() else {
            return Err(DbError::Validation(
                "DELETE statement has no source table".to_string(),
            ));
        };
        Ok(format!("DELETE FROM {table} {}", self.clauses.predicate()))
    }

    /// Execute; returns the number of deleted rows.
    pub fn delete(&self) -> Result<u64> {
        self.con.execute(&self.statement()?)
    }
}
