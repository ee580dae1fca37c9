use crate::schema::ColumnType;
use crate::value::{SemanticType, Value};

/// Rewrite strftime-style tokens into `TO_CHAR` tokens.
pub(super) fn translate_date_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let token = match chars.peek() {
            Some('d') => "DD",
            Some('H') => "HH24",
            Some('M') => "MI",
            Some('m') => "MM",
            Some('S') => "SS",
            Some('Y') => "YYYY",
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();
        out.push_str(token);
    }
    out
}

/// OID of the `boolean` type.
pub(super) const BOOL_OID: u32 = 16;

/// PostgreSQL type OIDs.
pub(super) fn semantic_type(oid: u32) -> SemanticType {
    match oid {
        BOOL_OID | 20 | 21 | 23 | 26 => SemanticType::Int,
        700 | 701 | 1700 => SemanticType::Real,
        18 | 19 | 25 | 1042 | 1043 => SemanticType::String,
        1082 => SemanticType::Date,
        1083 | 1266 => SemanticType::Time,
        1114 => SemanticType::Datetime,
        1184 => SemanticType::Timestamp,
        17 => SemanticType::Blob,
        _ => SemanticType::Unknown,
    }
}

/// Boolean cell as returned by the text protocol (`t`/`f`).
pub(super) fn is_true(value: &Value) -> bool {
    match value {
        Value::Text(s) => matches!(s.as_str(), "t" | "true" | "1"),
        other => other.to_bool(),
    }
}

/// Decode a text-protocol cell of type `oid`.
///
/// Booleans arrive as `t`/`f` and are read as `1`/`0` like on the other engines.
#[cfg_attr(not(feature = "pgsql"), allow(dead_code))]
pub(super) fn convert(text: Option<&str>, oid: u32) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };
    if oid == BOOL_OID {
        return match text {
            "t" | "true" => Value::Integer(1),
            "f" | "false" => Value::Integer(0),
            other => Value::Text(other.to_string()),
        };
    }
    match semantic_type(oid) {
        SemanticType::Int => text
            .parse()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(text.to_string())),
        SemanticType::Real => text
            .parse()
            .map(Value::Real)
            .unwrap_or_else(|_| Value::Text(text.to_string())),
        _ => Value::Text(text.to_string()),
    }
}

pub(super) fn column_type_sql(kind: ColumnType, len: u32) -> String {
    match kind {
        ColumnType::Float => "double precision".to_string(),
        ColumnType::Char | ColumnType::Varchar if len > 0 => format!("{}({len})", kind.as_str()),
        _ => kind.as_str().to_string(),
    }
}

pub(super) fn column_type_from_sql(base: &str) -> ColumnType {
    match base {
        "int2" | "smallint" => ColumnType::Smallint,
        "int4" | "integer" | "int" => ColumnType::Integer,
        "int8" | "bigint" => ColumnType::Bigint,
        "float4" | "real" => ColumnType::Real,
        "float8" | "double precision" => ColumnType::Float,
        "numeric" | "decimal" => ColumnType::Numeric,
        "date" => ColumnType::Date,
        "time" | "timetz" | "time without time zone" => ColumnType::Time,
        "timestamp" | "timestamptz" | "timestamp without time zone" => ColumnType::Timestamp,
        "bpchar" | "char" | "character" => ColumnType::Char,
        "varchar" | "character varying" => ColumnType::Varchar,
        "bool" | "boolean" => ColumnType::Boolean,
        _ => ColumnType::Text,
    }
}

#[cfg(feature = "pgsql")]
pub use link::PgsqlLink;

#[cfg(feature = "pgsql")]
mod link {
    use super::super::{Column, Driver, Link, ResultSet};
    use super::convert;
    use crate::config::{ConnectionConfig, HostSpec};
    use crate::error::{DbError, Result};
    use postgres::SimpleQueryMessage;

    fn classify(sql: &str, err: postgres::Error) -> DbError {
        let integrity = err
            .code()
            .map(|state| state.code().starts_with("23"))
            .unwrap_or(false);
        if integrity {
            DbError::constraint(sql, err.to_string())
        } else {
            DbError::query(sql, err.to_string())
        }
    }

    /// Link to a PostgreSQL server.
    pub struct PgsqlLink {
        client: postgres::Client,
    }

    impl PgsqlLink {
        pub fn connect(config: &ConnectionConfig) -> Result<Self> {
            let mut pg = postgres::Config::new();
            pg.user(&config.user)
                .password(&config.password)
                .dbname(&config.database);
            match config.host_spec()? {
                // a leading '/' makes the host a socket directory
                HostSpec::Socket(path) => {
                    pg.host(&path);
                }
                HostSpec::Tcp { host, port } => {
                    pg.host(&host);
                    if let Some(port) = port {
                        pg.port(port);
                    }
                }
            }
            let client = pg
                .connect(postgres::NoTls)
                .map_err(|e| DbError::Connection(format!("Cannot connect to PostgreSQL: {e}")))?;
            Ok(PgsqlLink { client })
        }
    }

    impl Link for PgsqlLink {
        fn server_version(&mut self) -> Result<String> {
            let sql = "SHOW server_version";
            let messages = self.client.simple_query(sql).map_err(|e| classify(sql, e))?;
            messages
                .iter()
                .find_map(|m| match m {
                    SimpleQueryMessage::Row(row) => row.get(0).map(str::to_string),
                    _ => None,
                })
                .ok_or_else(|| DbError::Connection("Server did not report a version".to_string()))
        }

        fn query(&mut self, sql: &str) -> Result<ResultSet> {
            // Preparing exposes column type OIDs; the text protocol returns the rows.
            let statement = self.client.prepare(sql).map_err(|e| classify(sql, e))?;
            let oids: Vec<u32> = statement.columns().iter().map(|c| c.type_().oid()).collect();
            let columns: Vec<Column> = statement
                .columns()
                .iter()
                .zip(&oids)
                .map(|(c, oid)| Column::new(c.name(), Driver::Pgsql.semantic_type(*oid)))
                .collect();

            let messages = self.client.simple_query(sql).map_err(|e| classify(sql, e))?;
            let mut rows = Vec::new();
            for message in messages {
                if let SimpleQueryMessage::Row(row) = message {
                    let cells = oids
                        .iter()
                        .enumerate()
                        .map(|(i, oid)| convert(row.get(i), *oid))
                        .collect();
                    rows.push(cells);
                }
            }
            Ok(ResultSet { columns, rows })
        }

        fn execute(&mut self, sql: &str) -> Result<u64> {
            let messages = self.client.simple_query(sql).map_err(|e| classify(sql, e))?;
            Ok(messages
                .iter()
                .filter_map(|m| match m {
                    SimpleQueryMessage::CommandComplete(n) => Some(*n),
                    _ => None,
                })
                .last()
                .unwrap_or(0))
        }

        fn last_insert_id(&mut self) -> Result<Option<i64>> {
            // no portable equivalent without RETURNING
            Ok(None)
        }
    }
}
