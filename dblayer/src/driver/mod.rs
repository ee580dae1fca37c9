//! Engine drivers.
//!
//! A [`Link`] is the physical handle to one engine: it sends SQL text and
//! returns native values. [`Driver`] holds every dialect decision made on top
//! of that link: literal escaping, identifier quoting, SQL fragment functions,
//! lock statements, charset negotiation and DDL type mapping.

mod mysql;
mod pgsql;
mod sqlite;
#[cfg(test)]
pub(crate) mod scripted;

pub use sqlite::SqliteLink;

#[cfg(feature = "mysql")]
pub use mysql::MysqlLink;

#[cfg(feature = "pgsql")]
pub use pgsql::PgsqlLink;

use crate::config::ConnectionConfig;
use crate::error::{DbError, Result};
use crate::order::OrderSpec;
use crate::schema::ColumnType;
use crate::value::{FieldValue, SemanticType, Value};
use serde::Serialize;
use std::fmt;

/// Result column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: SemanticType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: SemanticType) -> Self {
        Column {
            name: name.into(),
            kind,
        }
    }
}

/// Fully buffered output of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// First cell of the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Physical handle to one database instance.
pub trait Link {
    /// Server version string as reported by the engine.
    fn server_version(&mut self) -> Result<String>;

    fn query(&mut self, sql: &str) -> Result<ResultSet>;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Identity generated by the last insert, when the engine reports one.
    fn last_insert_id(&mut self) -> Result<Option<i64>>;
}

/// Dotted numeric server version, suffixes ignored (`5.7.7-log` is 5.7.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion(pub u32, pub u32, pub u32);

impl ServerVersion {
    pub fn parse(version: &str) -> Result<ServerVersion> {
        let numeric: String = version
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = numeric
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>());
        let major = match parts.next() {
            Some(Ok(n)) => n,
            _ => {
                return Err(DbError::Connection(format!(
                    "Cannot read server version '{version}'"
                )))
            }
        };
        let minor = parts.next().and_then(|p| p.ok()).unwrap_or(0);
        let patch = parts.next().and_then(|p| p.ok()).unwrap_or(0);
        Ok(ServerVersion(major, minor, patch))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Supported engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Sqlite,
    /// MySQL with 3-byte `utf8`.
    Mysql,
    /// MySQL with 4-byte `utf8mb4`.
    MysqlMb4,
    Pgsql,
}

impl Driver {
    pub fn from_name(name: &str) -> Result<Driver> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "mysql" | "mysqli" => Ok(Driver::Mysql),
            "mysqlmb4" | "mysqlimb4" => Ok(Driver::MysqlMb4),
            "pgsql" | "postgres" | "postgresql" => Ok(Driver::Pgsql),
            other => Err(DbError::UnknownDriver(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::Mysql => "mysqli",
            Driver::MysqlMb4 => "mysqlimb4",
            Driver::Pgsql => "pgsql",
        }
    }

    pub fn is_mysql(&self) -> bool {
        matches!(self, Driver::Mysql | Driver::MysqlMb4)
    }

    /// Escape string content for use between single quotes.
    pub fn escape(&self, s: &str) -> String {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => mysql::escape(s),
            Driver::Sqlite | Driver::Pgsql => s.replace('\'', "''"),
        }
    }

    /// Quote an identifier.
    pub fn escape_system(&self, name: &str) -> String {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => format!("`{}`", name.replace('`', "``")),
            Driver::Sqlite | Driver::Pgsql => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Render a value as a SQL literal.
    pub fn literal(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => "NULL".to_string(),
            FieldValue::String(s) => format!("'{}'", self.escape(s)),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Real(f) if f.is_finite() => {
                let text = f.to_string();
                if text.contains(['.', 'e', 'E']) {
                    text
                } else {
                    format!("{text}.0")
                }
            }
            FieldValue::Real(_) => "NULL".to_string(),
            // PostgreSQL coerces an untyped '1' into boolean and integer columns alike.
            FieldValue::Boolean(b) => match self {
                Driver::Pgsql => (if *b { "'1'" } else { "'0'" }).to_string(),
                _ => (if *b { "1" } else { "0" }).to_string(),
            },
            FieldValue::Date(d) => format!("'{}'", FieldValue::format_date(d)),
            FieldValue::Expr(sql) => sql.clone(),
        }
    }

    /// Format a date column with a strftime-style pattern.
    pub fn date_format(&self, field: &str, pattern: &str) -> String {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => {
                let pattern = pattern.replace("%M", "%i");
                format!("DATE_FORMAT({field},'{}')", self.escape(&pattern))
            }
            Driver::Pgsql => {
                let pattern = pgsql::translate_date_pattern(pattern);
                format!("TO_CHAR({field},'{}')", self.escape(&pattern))
            }
            Driver::Sqlite => format!("strftime('{}',{field})", self.escape(pattern)),
        }
    }

    pub fn concat(&self, parts: &[&str]) -> String {
        if self.is_mysql() {
            format!("CONCAT({})", parts.join(","))
        } else {
            parts.join(" || ")
        }
    }

    /// Wrap each field in the dialect's case-insensitive comparison form.
    pub fn lex_fields(&self, fields: &[&str]) -> String {
        fields
            .iter()
            .map(|f| self.lex_field(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn lex_field(&self, field: &str) -> String {
        match self {
            Driver::Mysql => format!("{field} COLLATE utf8_unicode_ci"),
            Driver::MysqlMb4 => format!("{field} COLLATE utf8mb4_unicode_ci"),
            Driver::Pgsql => format!("LOWER({field})"),
            Driver::Sqlite => format!("{field} COLLATE NOCASE"),
        }
    }

    /// Body of an `ORDER BY` clause.
    pub fn order_by(&self, specs: &[OrderSpec]) -> String {
        specs
            .iter()
            .map(|spec| {
                let field = if spec.lexical {
                    self.lex_field(&spec.field)
                } else {
                    spec.field.clone()
                };
                format!("{field} {}", spec.direction.as_sql())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `LIMIT`/`OFFSET` clause, `None` when neither bounds the result.
    pub fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        let offset = offset.filter(|o| *o > 0);
        match (limit, offset) {
            (None, None) => None,
            (Some(n), None) => Some(format!("LIMIT {n}")),
            (Some(n), Some(o)) => Some(format!("LIMIT {n} OFFSET {o}")),
            (None, Some(o)) => Some(match self {
                Driver::Sqlite => format!("LIMIT -1 OFFSET {o}"),
                Driver::Mysql | Driver::MysqlMb4 => format!("LIMIT {} OFFSET {o}", u64::MAX),
                Driver::Pgsql => format!("LIMIT ALL OFFSET {o}"),
            }),
        }
    }

    /// Map a native type code onto the semantic type set.
    pub fn semantic_type(&self, code: u32) -> SemanticType {
        match self {
            Driver::Sqlite => sqlite::semantic_type(code),
            Driver::Mysql | Driver::MysqlMb4 => mysql::semantic_type(code),
            Driver::Pgsql => pgsql::semantic_type(code),
        }
    }

    /// Statements taking an exclusive write lock on `table` (already prefixed).
    pub fn lock_statements(&self, table: &str) -> Vec<String> {
        let name = self.escape_system(table);
        match self {
            Driver::Mysql | Driver::MysqlMb4 => vec![format!("LOCK TABLES {name} WRITE")],
            Driver::Pgsql => vec![
                "BEGIN".to_string(),
                format!("LOCK TABLE {name} IN EXCLUSIVE MODE"),
            ],
            Driver::Sqlite => vec!["BEGIN EXCLUSIVE TRANSACTION".to_string()],
        }
    }

    pub fn unlock_statement(&self) -> &'static str {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => "UNLOCK TABLES",
            Driver::Pgsql | Driver::Sqlite => "COMMIT",
        }
    }

    /// Query telling whether the current credential may lock `table`.
    /// `None` means locking is always available.
    pub fn lock_probe(&self, table: &str) -> Option<String> {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => Some("SHOW GRANTS FOR CURRENT_USER()".to_string()),
            Driver::Pgsql => Some(format!(
                "SELECT has_table_privilege('{}', 'UPDATE')",
                self.escape(table)
            )),
            Driver::Sqlite => None,
        }
    }

    /// Interpret the answer to [`Driver::lock_probe`].
    pub fn lock_granted(&self, probe: &ResultSet) -> bool {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => mysql::grants_allow_locking(probe),
            Driver::Pgsql => probe.scalar().map(pgsql::is_true).unwrap_or(false),
            Driver::Sqlite => true,
        }
    }

    /// Session setup issued once right after connecting.
    pub fn charset_statements(&self, version: &ServerVersion) -> Result<Vec<String>> {
        match self {
            Driver::Mysql => mysql::charset_statements(
                version,
                ServerVersion(4, 1, 0),
                "utf8",
                "utf8_unicode_ci",
            ),
            Driver::MysqlMb4 => mysql::charset_statements(
                version,
                ServerVersion(5, 7, 7),
                "utf8mb4",
                "utf8mb4_unicode_ci",
            ),
            Driver::Pgsql => Ok(vec!["SET client_encoding TO 'UTF8'".to_string()]),
            Driver::Sqlite => Ok(Vec::new()),
        }
    }

    /// Engine column type for an engine-neutral one.
    pub fn column_type_sql(&self, kind: ColumnType, len: u32) -> String {
        match self {
            Driver::Mysql | Driver::MysqlMb4 => mysql::column_type_sql(kind, len),
            Driver::Pgsql => pgsql::column_type_sql(kind, len),
            Driver::Sqlite => sqlite::column_type_sql(kind, len),
        }
    }

    /// Engine-neutral type (and length) for an engine type as reported by introspection.
    pub fn column_type_from_sql(&self, sql_type: &str) -> (ColumnType, u32) {
        let (base, len) = split_sql_type(sql_type);
        let kind = match self {
            Driver::Mysql | Driver::MysqlMb4 => mysql::column_type_from_sql(&base, len),
            Driver::Pgsql => pgsql::column_type_from_sql(&base),
            Driver::Sqlite => sqlite::column_type_from_sql(&base),
        };
        let len = match kind {
            ColumnType::Char | ColumnType::Varchar => len,
            _ => 0,
        };
        (kind, len)
    }

    /// Clause appended to every `CREATE TABLE`.
    pub fn table_options(&self) -> &'static str {
        match self {
            Driver::Mysql => " ENGINE=InnoDB DEFAULT CHARSET=utf8 COLLATE utf8_unicode_ci",
            Driver::MysqlMb4 => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE utf8mb4_unicode_ci",
            Driver::Pgsql | Driver::Sqlite => "",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split `varchar(255)` into (`varchar`, 255); `numeric(10,2)` keeps 10.
pub(crate) fn split_sql_type(sql_type: &str) -> (String, u32) {
    let lowered = sql_type.trim().to_ascii_lowercase();
    match lowered.find('(') {
        Some(open) => {
            let base = lowered[..open].trim().to_string();
            let len = lowered[open + 1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0);
            (base, len)
        }
        None => {
            // "int unsigned" and friends
            let base = lowered
                .split_whitespace()
                .filter(|w| *w != "unsigned" && *w != "zerofill")
                .collect::<Vec<_>>()
                .join(" ");
            (base, 0)
        }
    }
}

/// Open the physical link named by `config.driver`.
pub fn open_link(driver: Driver, config: &ConnectionConfig) -> Result<Box<dyn Link>> {
    match driver {
        Driver::Sqlite => Ok(Box::new(SqliteLink::open(&config.database)?)),
        Driver::Mysql | Driver::MysqlMb4 => open_mysql(config),
        Driver::Pgsql => open_pgsql(config),
    }
}

#[cfg(feature = "mysql")]
fn open_mysql(config: &ConnectionConfig) -> Result<Box<dyn Link>> {
    Ok(Box::new(MysqlLink::connect(config)?))
}

#[cfg(not(feature = "mysql"))]
fn open_mysql(_config: &ConnectionConfig) -> Result<Box<dyn Link>> {
    Err(DbError::Connection(
        "MySQL support was not compiled in (enable the `mysql` feature)".to_string(),
    ))
}

#[cfg(feature = "pgsql")]
fn open_pgsql(config: &ConnectionConfig) -> Result<Box<dyn Link>> {
    Ok(Box::new(PgsqlLink::connect(config)?))
}

#[cfg(not(feature = "pgsql"))]
fn open_pgsql(_config: &ConnectionConfig) -> Result<Box<dyn Link>> {
    Err(DbError::Connection(
        "PostgreSQL support was not compiled in (enable the `pgsql` feature)".to_string(),
    ))
}
