use super::types::TableFile;
use crate::error::{DbError, Result};
use std::path::Path;
use std::sync::OnceLock;

fn identifier() -> &'static regex::Regex {
    static IDENTIFIER: OnceLock<regex::Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("failed to compile identifier regex")
    })
}

/// Parse a tables.yaml file into a TableFile
pub fn parse_tables(path: &Path) -> Result<TableFile> {
    let content = std::fs::read_to_string(path)?;
    parse_tables_str(&content)
}

/// Parse a tables YAML string into a TableFile
pub fn parse_tables_str(content: &str) -> Result<TableFile> {
    let file: TableFile = serde_yaml::from_str(content)?;
    validate_tables(&file)?;
    Ok(file)
}

fn check_identifier(what: &str, name: &str) -> Result<()> {
    if identifier().is_match(name) {
        Ok(())
    } else {
        Err(DbError::Validation(format!("Invalid {what} name '{name}'")))
    }
}

/// Check names and that every key, index and reference points at declared columns.
pub fn validate_tables(file: &TableFile) -> Result<()> {
    for (table_name, table) in &file.tables {
        check_identifier("table", table_name)?;
        if table.columns.is_empty() {
            return Err(DbError::Validation(format!(
                "Table '{table_name}' declares no columns"
            )));
        }
        for column in &table.columns {
            check_identifier("column", &column.name)?;
        }

        let keyed = table
            .primary
            .iter()
            .chain(table.unique.values().flatten())
            .chain(table.indexes.values().flatten())
            .chain(table.references.values().flat_map(|r| r.columns.iter()));
        for column in keyed {
            if table.column(column).is_none() {
                return Err(DbError::Validation(format!(
                    "Table '{table_name}' references unknown column '{column}'"
                )));
            }
        }

        for (name, reference) in &table.references {
            check_identifier("reference", name)?;
            if reference.columns.len() != reference.foreign_columns.len() {
                return Err(DbError::Validation(format!(
                    "Reference '{name}' on '{table_name}' pairs {} columns with {} foreign columns",
                    reference.columns.len(),
                    reference.foreign_columns.len()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::ColumnType;

    const TABLES: &str = r#"
tables:
  post:
    columns:
      - { name: post_id, type: bigint }
      - { name: post_title, type: varchar, len: 255, nullable: true }
      - { name: post_status, type: smallint, default: "0" }
      - { name: post_dt, type: timestamp, default: "CURRENT_TIMESTAMP" }
    primary: [post_id]
    indexes:
      idx_post_dt: [post_dt]
  comment:
    columns:
      - { name: comment_id, type: bigint }
      - { name: post_id, type: bigint }
      - { name: comment_content, type: text, nullable: true }
    primary: [comment_id]
    references:
      fk_comment_post:
        columns: [post_id]
        table: post
        foreign_columns: [post_id]
        on_delete: cascade
"#;

    #[test]
    fn test_parse_tables() {
        let file = parse_tables_str(TABLES).unwrap();
        assert_eq!(file.tables.len(), 2);

        let post = &file.tables["post"];
        assert_eq!(post.columns.len(), 4);
        assert_eq!(post.columns[1].kind, ColumnType::Varchar);
        assert_eq!(post.columns[1].len, 255);
        assert!(post.columns[1].nullable);
        assert_eq!(post.columns[2].default.as_deref(), Some("0"));
        assert_eq!(post.primary, vec!["post_id"]);

        let comment = &file.tables["comment"];
        let fk = &comment.references["fk_comment_post"];
        assert_eq!(fk.table, "post");
        assert_eq!(fk.on_delete.as_deref(), Some("cascade"));
    }

    #[test]
    fn test_unknown_index_column_rejected() {
        let yaml = r#"
tables:
  t:
    columns:
      - { name: a, type: integer }
    indexes:
      idx_b: [b]
"#;
        let err = parse_tables_str(yaml).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn test_bad_identifier_rejected() {
        let yaml = r#"
tables:
  "bad name":
    columns:
      - { name: a, type: integer }
"#;
        assert!(parse_tables_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = r#"
tables:
  t:
    columns:
      - { name: a, type: jsonb }
"#;
        assert!(matches!(parse_tables_str(yaml), Err(DbError::Yaml(_))));
    }

    #[test]
    fn test_parse_tables_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.yaml");
        std::fs::write(&path, TABLES).unwrap();
        let file = parse_tables(&path).unwrap();
        assert!(file.tables.contains_key("comment"));
    }
}
