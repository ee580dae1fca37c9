//! The bound handle to one database.
//!
//! A [`Connection`] owns its [`Link`] exclusively and is threaded explicitly
//! through every statement, cursor and schema call that needs it. Everything
//! that turns caller data into SQL text (`quote`, `escape`, `in_list`,
//! `like`) lives here so dialect rules stay in one place.

use crate::config::ConnectionConfig;
use crate::cursor::Cursor;
use crate::driver::{self, Driver, Link, ResultSet, ServerVersion};
use crate::error::{DbError, Result};
use crate::order::OrderSpec;
use crate::record::Record;
use crate::schema::{Schema, TableDef};
use crate::statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};
use crate::value::FieldValue;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;

/// Outcome of [`Connection::write_lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum LockState {
    Held,
    /// No privilege and weak locks allowed: nothing is locked.
    Skipped,
}

pub struct Connection {
    driver: Driver,
    link: RefCell<Box<dyn Link>>,
    version: String,
    prefix: String,
    weak_locks: bool,
    lock_held: Cell<bool>,
}

impl Connection {
    /// Open the link named by `config` and negotiate the session charset.
    pub fn connect(config: &ConnectionConfig) -> Result<Connection> {
        let driver = Driver::from_name(&config.driver)?;
        let link = driver::open_link(driver, config)?;
        Self::with_link(config, link)
    }

    /// In-memory SQLite connection without prefix.
    pub fn open_memory() -> Result<Connection> {
        Self::connect(&ConnectionConfig::sqlite_memory())
    }

    /// Wrap an already opened link.
    pub fn with_link(config: &ConnectionConfig, mut link: Box<dyn Link>) -> Result<Connection> {
        let driver = Driver::from_name(&config.driver)?;
        let version = link.server_version()?;
        let parsed = ServerVersion::parse(&version)?;
        for sql in driver.charset_statements(&parsed)? {
            log::debug!("{sql}");
            link.execute(&sql)
                .map_err(|e| DbError::Connection(format!("Charset negotiation failed: {e}")))?;
        }
        log::info!("Connected to {driver} server {version}");
        Ok(Connection {
            driver,
            link: RefCell::new(link),
            version,
            prefix: config.prefix.clone(),
            weak_locks: config.weak_locks,
            lock_held: Cell::new(false),
        })
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Server version as reported on connect.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixed table name.
    pub fn table(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    pub fn weak_locks(&self) -> bool {
        self.weak_locks
    }

    pub fn escape(&self, s: &str) -> String {
        self.driver.escape(s)
    }

    pub fn escape_system(&self, name: &str) -> String {
        self.driver.escape_system(name)
    }

    /// Render a value as a SQL literal.
    pub fn quote(&self, value: impl Into<FieldValue>) -> String {
        self.driver.literal(&value.into())
    }

    /// ` IN (a,b,c) `; an empty set renders ` IN (NULL) `, which matches nothing.
    pub fn in_list<I>(&self, values: I) -> String
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        let items: Vec<String> = values.into_iter().map(|v| self.quote(v)).collect();
        if items.is_empty() {
            " IN (NULL) ".to_string()
        } else {
            format!(" IN ({}) ", items.join(","))
        }
    }

    pub fn like(&self, field: &str, pattern: &str) -> String {
        format!("{field} LIKE {}", self.quote(pattern))
    }

    pub fn date_format(&self, field: &str, pattern: &str) -> String {
        self.driver.date_format(field, pattern)
    }

    pub fn concat(&self, parts: &[&str]) -> String {
        self.driver.concat(parts)
    }

    pub fn lex_fields(&self, fields: &[&str]) -> String {
        self.driver.lex_fields(fields)
    }

    pub fn order_by(&self, specs: &[OrderSpec]) -> String {
        self.driver.order_by(specs)
    }

    pub(crate) fn query_set(&self, sql: &str) -> Result<ResultSet> {
        log::debug!("{sql}");
        self.link.borrow_mut().query(sql)
    }

    pub fn select(&self, sql: &str) -> Result<Record> {
        self.query_set(sql).map(Record::new)
    }

    /// Run a statement, returning the affected row count.
    pub fn execute(&self, sql: &str) -> Result<u64> {
        log::debug!("{sql}");
        self.link.borrow_mut().execute(sql)
    }

    pub fn last_insert_id(&self) -> Result<Option<i64>> {
        self.link.borrow_mut().last_insert_id()
    }

    /// Cursor bound to `table` as declared at build time.
    pub fn open_cursor<'a>(&'a self, table: &'a TableDef) -> Cursor<'a> {
        Cursor::new(self, table)
    }

    /// Cursor that also ignores columns missing from the live table.
    pub fn open_cursor_live<'a>(&'a self, table: &'a TableDef) -> Result<Cursor<'a>> {
        let live: HashSet<String> = self
            .schema()
            .columns(&self.table(table.name))?
            .into_iter()
            .map(|c| c.name)
            .collect();
        Ok(Cursor::new(self, table).restrict(live))
    }

    pub fn schema(&self) -> Schema<'_> {
        Schema::new(self)
    }

    pub fn select_statement(&self) -> SelectStatement<'_> {
        SelectStatement::new(self)
    }

    pub fn insert_statement(&self) -> InsertStatement<'_> {
        InsertStatement::new(self)
    }

    pub fn update_statement(&self) -> UpdateStatement<'_> {
        UpdateStatement::new(self)
    }

    pub fn delete_statement(&self) -> DeleteStatement<'_> {
        DeleteStatement::new(self)
    }

    /// Whether the current credential may lock `table` (prefixed name).
    pub fn supports_locking(&self, table: &str) -> Result<bool> {
        match self.driver.lock_probe(table) {
            None => Ok(true),
            Some(sql) => {
                let probe = self.query_set(&sql)?;
                Ok(self.driver.lock_granted(&probe))
            }
        }
    }

    /// Take an exclusive write lock on `table` (prefixed name).
    ///
    /// Without lock privilege this fails with `LockUnavailable`, unless the
    /// connection was configured with `weak_locks`, in which case nothing is
    /// locked and [`LockState::Skipped`] is returned.
    pub fn write_lock(&self, table: &str) -> Result<LockState> {
        if self.lock_held.get() {
            return Err(DbError::LockUnavailable {
                table: table.to_string(),
                reason: "this connection already holds a lock".to_string(),
            });
        }
        if !self.supports_locking(table)? {
            if self.weak_locks {
                log::warn!("No lock privilege on {table}, continuing without lock");
                return Ok(LockState::Skipped);
            }
            return Err(DbError::LockUnavailable {
                table: table.to_string(),
                reason: "credential lacks lock privilege".to_string(),
            });
        }
        for sql in self.driver.lock_statements(table) {
            self.execute(&sql)?;
        }
        self.lock_held.set(true);
        Ok(LockState::Held)
    }

    /// Release the lock taken by [`Connection::write_lock`]; no-op when none is held.
    pub fn unlock(&self) -> Result<()> {
        if self.lock_held.replace(false) {
            self.execute(self.driver.unlock_statement())?;
        }
        Ok(())
    }

    /// Run `f` under a write lock on `table`, releasing it whatever `f` returns.
    pub fn with_write_lock<T>(
        &self,
        table: &str,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let _state = self.write_lock(table)?;
        let result = f(self);
        let released = self.unlock();
        let value = result?;
        released?;
        Ok(value)
    }

    /// `MAX(column) + 1` over `table` (prefixed name); 1 on an empty table.
    pub fn next_id(&self, table: &str, column: &str) -> Result<i64> {
        let sql = format!(
            "SELECT MAX({}) FROM {}",
            self.escape_system(column),
            self.escape_system(table)
        );
        let set = self.query_set(&sql)?;
        Ok(set.scalar().map(|v| v.to_integer()).unwrap_or(0) + 1)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.lock_held.get() {
            if let Err(e) = self.unlock() {
                log::warn!("Failed to release lock on close: {e}");
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver)
            .field("version", &self.version)
            .field("prefix", &self.prefix)
            .field("weak_locks", &self.weak_locks)
            .finish()
    }
}
