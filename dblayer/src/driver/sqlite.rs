use super::{Column, Driver, Link, ResultSet};
use crate::error::{DbError, Result};
use crate::schema::ColumnType;
use crate::value::{SemanticType, Value};
use rusqlite::types::ValueRef;

// SQLite fundamental datatype codes.
const SQLITE_INTEGER: u32 = 1;
const SQLITE_FLOAT: u32 = 2;
const SQLITE_TEXT: u32 = 3;
const SQLITE_BLOB: u32 = 4;
const SQLITE_NULL: u32 = 5;

pub(super) fn semantic_type(code: u32) -> SemanticType {
    match code {
        SQLITE_INTEGER => SemanticType::Int,
        SQLITE_FLOAT => SemanticType::Real,
        SQLITE_TEXT => SemanticType::String,
        SQLITE_BLOB => SemanticType::Blob,
        _ => SemanticType::Unknown,
    }
}

pub(super) fn column_type_sql(kind: ColumnType, len: u32) -> String {
    match kind {
        ColumnType::Char | ColumnType::Varchar if len > 0 => format!("{}({len})", kind.as_str()),
        _ => kind.as_str().to_string(),
    }
}

pub(super) fn column_type_from_sql(base: &str) -> ColumnType {
    if let Some(kind) = ColumnType::from_name(base) {
        return kind;
    }
    if base.contains("int") {
        ColumnType::Integer
    } else if base.contains("real") || base.contains("floa") || base.contains("doub") {
        ColumnType::Float
    } else if base == "datetime" {
        ColumnType::Timestamp
    } else {
        ColumnType::Text
    }
}

fn classify(sql: &str, err: rusqlite::Error) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::constraint(sql, err.to_string())
        }
        _ => DbError::query(sql, err.to_string()),
    }
}

/// Link to a SQLite database file (or `:memory:`).
pub struct SqliteLink {
    conn: rusqlite::Connection,
}

impl SqliteLink {
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path.is_empty() || path == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(|e| DbError::Connection(format!("Cannot open SQLite database '{path}': {e}")))?;
        Ok(SqliteLink { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }
}

impl Link for SqliteLink {
    fn server_version(&mut self) -> Result<String> {
        Ok(rusqlite::version().to_string())
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| classify(sql, e))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = names.len();

        // Column types come from the first non-NULL value seen in each column.
        let mut codes = vec![SQLITE_NULL; width];
        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(|e| classify(sql, e))?;
        while let Some(row) = cursor.next().map_err(|e| classify(sql, e))? {
            let mut cells = Vec::with_capacity(width);
            for (i, code) in codes.iter_mut().enumerate() {
                let cell = row.get_ref(i).map_err(|e| classify(sql, e))?;
                let (seen, value) = match cell {
                    ValueRef::Null => (SQLITE_NULL, Value::Null),
                    ValueRef::Integer(n) => (SQLITE_INTEGER, Value::Integer(n)),
                    ValueRef::Real(f) => (SQLITE_FLOAT, Value::Real(f)),
                    ValueRef::Text(t) => (SQLITE_TEXT, Value::Text(String::from_utf8_lossy(t).into_owned())),
                    ValueRef::Blob(b) => (SQLITE_BLOB, Value::Blob(b.to_vec())),
                };
                if *code == SQLITE_NULL {
                    *code = seen;
                }
                cells.push(value);
            }
            rows.push(cells);
        }

        let columns = names
            .into_iter()
            .zip(codes)
            .map(|(name, code)| Column::new(name, Driver::Sqlite.semantic_type(code)))
            .collect();
        Ok(ResultSet { columns, rows })
    }

    fn execute(&mut self, sql: &str) -> Result<u64> {
        match self.conn.execute(sql, []) {
            Ok(n) => Ok(n as u64),
            // PRAGMA and friends answer with rows
            Err(rusqlite::Error::ExecuteReturnedResults) => {
                self.query(sql)?;
                Ok(0)
            }
            Err(e) => Err(classify(sql, e)),
        }
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>> {
        Ok(Some(self.conn.last_insert_rowid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_types_from_values() {
        let mut link = SqliteLink::open_in_memory().unwrap();
        let rs = link
            .query("SELECT 1 AS a, 2.5 AS b, 'x' AS c, NULL AS d, x'00ff' AS e")
            .unwrap();
        let kinds: Vec<_> = rs.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SemanticType::Int,
                SemanticType::Real,
                SemanticType::String,
                SemanticType::Unknown,
                SemanticType::Blob
            ]
        );
        assert_eq!(rs.rows[0][0], Value::Integer(1));
        assert_eq!(rs.rows[0][2], Value::Text("x".into()));
        assert_eq!(rs.rows[0][4], Value::Blob(vec![0, 255]));
    }

    #[test]
    fn test_execute_reports_affected_rows() {
        let mut link = SqliteLink::open_in_memory().unwrap();
        link.execute("CREATE TABLE t (id integer)").unwrap();
        assert_eq!(link.execute("INSERT INTO t VALUES (1), (2), (3)").unwrap(), 3);
        assert_eq!(link.execute("DELETE FROM t WHERE id > 1").unwrap(), 2);
        assert_eq!(link.execute("PRAGMA user_version").unwrap(), 0);
    }

    #[test]
    fn test_constraint_errors_are_classified() {
        let mut link = SqliteLink::open_in_memory().unwrap();
        link.execute("CREATE TABLE t (id integer NOT NULL UNIQUE)").unwrap();
        link.execute("INSERT INTO t VALUES (1)").unwrap();
        let err = link.execute("INSERT INTO t VALUES (1)").unwrap_err();
        assert!(matches!(err, DbError::Constraint { .. }), "{err}");

        let err = link.execute("INSERT INTO missing VALUES (1)").unwrap_err();
        assert!(matches!(err, DbError::Query { .. }), "{err}");
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db");
        let path = path.to_string_lossy();
        {
            let mut link = SqliteLink::open(&path).unwrap();
            link.execute("CREATE TABLE t (id integer)").unwrap();
            link.execute("INSERT INTO t VALUES (7)").unwrap();
        }
        let mut link = SqliteLink::open(&path).unwrap();
        let rs = link.query("SELECT id FROM t").unwrap();
        assert_eq!(rs.scalar(), Some(&Value::Integer(7)));
    }
}
