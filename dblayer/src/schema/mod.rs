//! Engine-neutral table descriptions, DDL rendering and introspection.

pub mod ddl;
mod parser;
mod types;

pub use parser::{parse_tables, parse_tables_str, validate_tables};
pub use types::{
    ColumnDef, ColumnDescriptor, ColumnSpec, ColumnType, FieldKind, ReferenceSpec, TableDef,
    TableFile, TableSpec,
};

use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::{DbError, Result};
use crate::record::{MetaRecord, RowView};

/// Schema operations on one connection. Table names given here are used as is;
/// only [`Schema::create`] and [`Schema::file_statements`] apply the prefix.
pub struct Schema<'a> {
    con: &'a Connection,
}

impl<'a> Schema<'a> {
    pub(crate) fn new(con: &'a Connection) -> Self {
        Schema { con }
    }

    fn driver(&self) -> Driver {
        self.con.driver()
    }

    pub fn tables(&self) -> Result<Vec<String>> {
        let sql = match self.driver() {
            Driver::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table' \
                               AND name NOT LIKE 'sqlite_%' ORDER BY name"
                .to_string(),
            Driver::Mysql | Driver::MysqlMb4 => "SHOW TABLES".to_string(),
            Driver::Pgsql => "SELECT table_name FROM information_schema.tables \
                              WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                              ORDER BY table_name"
                .to_string(),
        };
        let set = self.con.query_set(&sql)?;
        Ok(set
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(|v| v.to_text())
            .collect())
    }

    /// Columns of `table` as the engine reports them, in declaration order.
    pub fn columns(&self, table: &str) -> Result<Vec<ColumnSpec>> {
        let driver = self.driver();
        let mut out = Vec::new();
        match driver {
            Driver::Sqlite => {
                let mut rs = self
                    .con
                    .select(&format!("PRAGMA table_info({})", driver.escape_system(table)))?;
                while rs.fetch() {
                    let (kind, len) = driver.column_type_from_sql(&rs.string("type"));
                    out.push(ColumnSpec {
                        name: rs.string("name"),
                        kind,
                        len,
                        nullable: rs.integer("notnull") == 0 && rs.integer("pk") == 0,
                        default: (!rs.is_null("dflt_value")).then(|| rs.string("dflt_value")),
                    });
                }
            }
            Driver::Mysql | Driver::MysqlMb4 => {
                let mut rs = self
                    .con
                    .select(&format!("SHOW COLUMNS FROM {}", driver.escape_system(table)))?;
                while rs.fetch() {
                    let (kind, len) = driver.column_type_from_sql(&rs.string("Type"));
                    out.push(ColumnSpec {
                        name: rs.string("Field"),
                        kind,
                        len,
                        nullable: rs.string("Null").eq_ignore_ascii_case("yes"),
                        default: (!rs.is_null("Default")).then(|| rs.string("Default")),
                    });
                }
            }
            Driver::Pgsql => {
                let mut rs = self.con.select(&format!(
                    "SELECT column_name, data_type, character_maximum_length, is_nullable, \
                     column_default FROM information_schema.columns \
                     WHERE table_schema = current_schema() AND table_name = {} \
                     ORDER BY ordinal_position",
                    self.con.quote(table)
                ))?;
                while rs.fetch() {
                    let (kind, _) = driver.column_type_from_sql(&rs.string("data_type"));
                    let len = match kind {
                        ColumnType::Char | ColumnType::Varchar => {
                            u32::try_from(rs.integer("character_maximum_length")).unwrap_or(0)
                        }
                        _ => 0,
                    };
                    out.push(ColumnSpec {
                        name: rs.string("column_name"),
                        kind,
                        len,
                        nullable: rs.string("is_nullable").eq_ignore_ascii_case("yes"),
                        default: (!rs.is_null("column_default"))
                            .then(|| rs.string("column_default")),
                    });
                }
            }
        }
        if out.is_empty() {
            return Err(DbError::Validation(format!("Table '{table}' does not exist")));
        }
        Ok(out)
    }

    pub fn create_table<C: ColumnDescriptor>(&self, name: &str, columns: &[C]) -> Result<()> {
        let sql = ddl::create_table(self.driver(), name, columns, &[])?;
        self.con.execute(&sql).map(|_| ())
    }

    /// Create a build-time table under the connection prefix, with its primary key.
    pub fn create(&self, table: &TableDef) -> Result<()> {
        let sql = ddl::create_table(
            self.driver(),
            &self.con.table(table.name),
            table.columns,
            table.primary,
        )?;
        self.con.execute(&sql).map(|_| ())
    }

    pub fn create_field(&self, table: &str, column: &impl ColumnDescriptor) -> Result<()> {
        let sql = ddl::create_field(self.driver(), table, column);
        self.con.execute(&sql).map(|_| ())
    }

    pub fn alter_field(&self, table: &str, column: &impl ColumnDescriptor) -> Result<()> {
        let sql = ddl::alter_field(self.driver(), table, column)?;
        self.con.execute(&sql).map(|_| ())
    }

    pub fn create_primary(&self, table: &str, name: &str, columns: &[&str]) -> Result<()> {
        let sql = ddl::create_primary(self.driver(), table, name, columns);
        self.con.execute(&sql).map(|_| ())
    }

    pub fn create_unique(&self, table: &str, name: &str, columns: &[&str]) -> Result<()> {
        let sql = ddl::create_unique(self.driver(), table, name, columns);
        self.con.execute(&sql).map(|_| ())
    }

    pub fn create_index(&self, table: &str, name: &str, columns: &[&str]) -> Result<()> {
        let sql = ddl::create_index(self.driver(), table, name, columns);
        self.con.execute(&sql).map(|_| ())
    }

    pub fn create_reference(
        &self,
        table: &str,
        name: &str,
        reference: &ReferenceSpec,
        foreign_table: &str,
    ) -> Result<()> {
        let sql = ddl::create_reference(self.driver(), table, name, reference, foreign_table)?;
        self.con.execute(&sql).map(|_| ())
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.con
            .execute(&ddl::drop_table(self.driver(), table))
            .map(|_| ())
    }

    /// Every statement needed to create the tables of `file` under the prefix.
    ///
    /// Foreign keys come last so referenced tables exist; SQLite skips them.
    pub fn file_statements(&self, file: &TableFile) -> Result<Vec<String>> {
        let driver = self.driver();
        let mut statements = Vec::new();
        let mut references = Vec::new();
        for (name, spec) in &file.tables {
            let table = self.con.table(name);
            let primary: Vec<&str> = spec.primary.iter().map(String::as_str).collect();
            statements.push(ddl::create_table(driver, &table, &spec.columns, &primary)?);
            for (index, columns) in &spec.unique {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                statements.push(ddl::create_unique(
                    driver,
                    &table,
                    &self.con.table(index),
                    &columns,
                ));
            }
            for (index, columns) in &spec.indexes {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                statements.push(ddl::create_index(
                    driver,
                    &table,
                    &self.con.table(index),
                    &columns,
                ));
            }
            for (key, reference) in &spec.references {
                if driver == Driver::Sqlite {
                    log::warn!("Skipping foreign key {key} on {table}: not supported by sqlite");
                    continue;
                }
                references.push(ddl::create_reference(
                    driver,
                    &table,
                    &self.con.table(key),
                    reference,
                    &self.con.table(&reference.table),
                )?);
            }
        }
        statements.extend(references);
        Ok(statements)
    }

    /// Create every table of `file`; returns the statements that were run.
    pub fn create_from_file(&self, file: &TableFile) -> Result<Vec<String>> {
        let statements = self.file_statements(file)?;
        for sql in &statements {
            self.con.execute(sql)?;
        }
        Ok(statements)
    }
}
