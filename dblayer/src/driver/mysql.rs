use super::{ResultSet, ServerVersion};
use crate::error::{DbError, Result};
use crate::schema::ColumnType;
use crate::value::SemanticType;

/// Backslash escaping as done by `mysql_real_escape_string`.
pub(super) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out
}

/// MySQL protocol column type codes.
pub(super) fn semantic_type(code: u32) -> SemanticType {
    match code {
        1 | 2 | 3 | 8 | 9 | 13 | 16 => SemanticType::Int,
        0 | 4 | 5 | 246 => SemanticType::Real,
        7 => SemanticType::Timestamp,
        10 | 14 => SemanticType::Date,
        11 => SemanticType::Time,
        12 => SemanticType::Datetime,
        15 | 247 | 248 | 253 | 254 => SemanticType::String,
        249..=252 => SemanticType::Blob,
        _ => SemanticType::Unknown,
    }
}

pub(super) fn charset_statements(
    version: &ServerVersion,
    minimum: ServerVersion,
    charset: &str,
    collation: &str,
) -> Result<Vec<String>> {
    if *version < minimum {
        return Err(DbError::Connection(format!(
            "MySQL server {version} does not support the {charset} charset (requires {minimum} or later)"
        )));
    }
    let mut statements = vec![
        format!("SET NAMES '{charset}'"),
        format!("SET CHARACTER SET '{charset}'"),
        format!("SET COLLATION_CONNECTION = '{collation}'"),
        format!("SET COLLATION_SERVER = '{collation}'"),
        format!("SET CHARACTER_SET_SERVER = '{charset}'"),
    ];
    // read-only from 8.0 on
    if *version < ServerVersion(8, 0, 0) {
        statements.push(format!("SET CHARACTER_SET_DATABASE = '{charset}'"));
    }
    Ok(statements)
}

/// `SHOW GRANTS` output allows `LOCK TABLES`.
pub(super) fn grants_allow_locking(grants: &ResultSet) -> bool {
    grants.rows.iter().flatten().any(|cell| {
        let grant = cell.to_text().to_ascii_uppercase();
        grant.contains("ALL PRIVILEGES") || grant.contains("LOCK TABLES")
    })
}

pub(super) fn column_type_sql(kind: ColumnType, len: u32) -> String {
    match kind {
        ColumnType::Smallint => "smallint".to_string(),
        ColumnType::Integer => "int".to_string(),
        ColumnType::Bigint => "bigint".to_string(),
        ColumnType::Real => "float".to_string(),
        ColumnType::Float => "double".to_string(),
        ColumnType::Numeric => "numeric".to_string(),
        ColumnType::Date => "date".to_string(),
        ColumnType::Time => "time".to_string(),
        ColumnType::Timestamp => "datetime".to_string(),
        ColumnType::Char if len > 0 => format!("char({len})"),
        ColumnType::Char => "char(1)".to_string(),
        ColumnType::Varchar => format!("varchar({})", if len > 0 { len } else { 255 }),
        ColumnType::Text => "longtext".to_string(),
        ColumnType::Boolean => "tinyint(1)".to_string(),
    }
}

pub(super) fn column_type_from_sql(base: &str, len: u32) -> ColumnType {
    match base {
        "bool" | "boolean" => ColumnType::Boolean,
        "tinyint" if len == 1 => ColumnType::Boolean,
        "tinyint" | "smallint" => ColumnType::Smallint,
        "int" | "integer" | "mediumint" => ColumnType::Integer,
        "bigint" => ColumnType::Bigint,
        "float" => ColumnType::Real,
        "double" | "double precision" | "real" => ColumnType::Float,
        "decimal" | "numeric" => ColumnType::Numeric,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "datetime" | "timestamp" => ColumnType::Timestamp,
        "char" => ColumnType::Char,
        "varchar" => ColumnType::Varchar,
        _ => ColumnType::Text,
    }
}

#[cfg(feature = "mysql")]
pub use link::MysqlLink;

#[cfg(feature = "mysql")]
mod link {
    use super::super::{Column, Driver, Link, ResultSet};
    use crate::config::{ConnectionConfig, HostSpec};
    use crate::error::{DbError, Result};
    use crate::value::{SemanticType, Value};
    use mysql::prelude::Queryable;

    // Error codes reported for integrity violations.
    const CONSTRAINT_CODES: [u16; 7] = [1048, 1062, 1216, 1217, 1364, 1451, 1452];

    fn classify(sql: &str, err: mysql::Error) -> DbError {
        match &err {
            mysql::Error::MySqlError(server) if CONSTRAINT_CODES.contains(&server.code) => {
                DbError::constraint(sql, err.to_string())
            }
            _ => DbError::query(sql, err.to_string()),
        }
    }

    fn convert(value: Option<&mysql::Value>, kind: SemanticType) -> Value {
        match value {
            None | Some(mysql::Value::NULL) => Value::Null,
            Some(mysql::Value::Bytes(bytes)) => match kind {
                SemanticType::Blob => Value::Blob(bytes.clone()),
                _ => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            },
            Some(mysql::Value::Int(n)) => Value::Integer(*n),
            Some(mysql::Value::UInt(n)) => Value::Integer(*n as i64),
            Some(mysql::Value::Float(f)) => Value::Real(f64::from(*f)),
            Some(mysql::Value::Double(f)) => Value::Real(*f),
            Some(mysql::Value::Date(y, m, d, h, i, s, _)) => Value::Text(format!(
                "{y:04}-{m:02}-{d:02} {h:02}:{i:02}:{s:02}"
            )),
            Some(mysql::Value::Time(negative, days, h, i, s, _)) => {
                let hours = u32::from(*h) + *days * 24;
                let sign = if *negative { "-" } else { "" };
                Value::Text(format!("{sign}{hours:02}:{i:02}:{s:02}"))
            }
        }
    }

    /// Link to a MySQL or MariaDB server.
    pub struct MysqlLink {
        conn: mysql::Conn,
    }

    impl MysqlLink {
        pub fn connect(config: &ConnectionConfig) -> Result<Self> {
            let mut opts = mysql::OptsBuilder::new()
                .user(Some(config.user.as_str()))
                .pass(Some(config.password.as_str()))
                .db_name(Some(config.database.as_str()));
            opts = match config.host_spec()? {
                HostSpec::Socket(path) => opts.socket(Some(path)),
                HostSpec::Tcp { host, port } => opts
                    .ip_or_hostname(Some(host))
                    .tcp_port(port.unwrap_or(3306)),
            };
            let conn = mysql::Conn::new(opts)
                .map_err(|e| DbError::Connection(format!("Cannot connect to MySQL: {e}")))?;
            Ok(MysqlLink { conn })
        }
    }

    impl Link for MysqlLink {
        fn server_version(&mut self) -> Result<String> {
            let (major, minor, patch) = self.conn.server_version();
            Ok(format!("{major}.{minor}.{patch}"))
        }

        fn query(&mut self, sql: &str) -> Result<ResultSet> {
            let result = self.conn.query_iter(sql).map_err(|e| classify(sql, e))?;
            let mut set = ResultSet::default();
            for row in result {
                let row = row.map_err(|e| classify(sql, e))?;
                if set.columns.is_empty() {
                    set.columns = row
                        .columns_ref()
                        .iter()
                        .map(|c| {
                            Column::new(
                                c.name_str().into_owned(),
                                Driver::Mysql.semantic_type(c.column_type() as u32),
                            )
                        })
                        .collect();
                }
                let cells = set
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| convert(row.as_ref(i), column.kind))
                    .collect();
                set.rows.push(cells);
            }
            Ok(set)
        }

        fn execute(&mut self, sql: &str) -> Result<u64> {
            self.conn.query_drop(sql).map_err(|e| classify(sql, e))?;
            Ok(self.conn.affected_rows())
        }

        fn last_insert_id(&mut self) -> Result<Option<i64>> {
            let id = self.conn.last_insert_id();
            Ok((id > 0).then_some(id as i64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_control_characters() {
        assert_eq!(escape("a\0b\r\x1a"), "a\\0b\\r\\Z");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(semantic_type(3), SemanticType::Int);
        assert_eq!(semantic_type(246), SemanticType::Real);
        assert_eq!(semantic_type(7), SemanticType::Timestamp);
        assert_eq!(semantic_type(10), SemanticType::Date);
        assert_eq!(semantic_type(11), SemanticType::Time);
        assert_eq!(semantic_type(12), SemanticType::Datetime);
        assert_eq!(semantic_type(253), SemanticType::String);
        assert_eq!(semantic_type(252), SemanticType::Blob);
        assert_eq!(semantic_type(245), SemanticType::Unknown);
    }

    #[test]
    fn test_charset_sequence_mb4() {
        let statements = charset_statements(
            &ServerVersion(5, 7, 7),
            ServerVersion(5, 7, 7),
            "utf8mb4",
            "utf8mb4_unicode_ci",
        )
        .unwrap();
        assert_eq!(
            statements,
            vec![
                "SET NAMES 'utf8mb4'",
                "SET CHARACTER SET 'utf8mb4'",
                "SET COLLATION_CONNECTION = 'utf8mb4_unicode_ci'",
                "SET COLLATION_SERVER = 'utf8mb4_unicode_ci'",
                "SET CHARACTER_SET_SERVER = 'utf8mb4'",
                "SET CHARACTER_SET_DATABASE = 'utf8mb4'",
            ]
        );
    }

    #[test]
    fn test_charset_sequence_skips_database_charset_on_8() {
        let statements =
            charset_statements(&ServerVersion(8, 0, 33), ServerVersion(5, 7, 7), "utf8mb4", "x")
                .unwrap();
        assert_eq!(statements.len(), 5);
    }

    #[test]
    fn test_charset_below_minimum_fails() {
        let err = charset_statements(
            &ServerVersion(5, 7, 6),
            ServerVersion(5, 7, 7),
            "utf8mb4",
            "utf8mb4_unicode_ci",
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Connection(_)));
    }

    #[test]
    fn test_grants() {
        let grants = |line: &str| ResultSet {
            columns: Vec::new(),
            rows: vec![vec![Value::Text(line.to_string())]],
        };
        assert!(grants_allow_locking(&grants(
            "GRANT ALL PRIVILEGES ON `blog`.* TO `u`@`%`"
        )));
        assert!(grants_allow_locking(&grants(
            "GRANT SELECT, INSERT, LOCK TABLES ON `blog`.* TO `u`@`%`"
        )));
        assert!(!grants_allow_locking(&grants(
            "GRANT SELECT, INSERT ON `blog`.* TO `u`@`%`"
        )));
    }

    #[test]
    fn test_reverse_type_mapping() {
        assert_eq!(column_type_from_sql("tinyint", 1), ColumnType::Boolean);
        assert_eq!(column_type_from_sql("tinyint", 4), ColumnType::Smallint);
        assert_eq!(column_type_from_sql("int", 11), ColumnType::Integer);
        assert_eq!(column_type_from_sql("mediumtext", 0), ColumnType::Text);
    }
}
