//! dblayer code generation - turns a tables.yaml file into a static table registry.
//!
//! The main entry point is [`generate_from_tables`], which reads a table file and
//! writes a Rust source file holding one `TableDef` static per table, a module of
//! column-name constants per table and an `ALL_TABLES` slice.

mod generator;
mod table_gen;
pub mod type_utils;

use std::path::Path;

/// Generate the table registry from a tables.yaml file.
///
/// Reads the table file at `tables_path` and writes the generated source to
/// `output_path`. This is intended to be called from a `build.rs` build script.
///
/// # Example
///
/// ```no_run
/// // In build.rs:
/// dblayer_codegen::generate_from_tables("tables.yaml", "src/tables.rs").unwrap();
/// ```
pub fn generate_from_tables(
    tables_path: &str,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = dblayer::schema::parse_tables(Path::new(tables_path))?;
    let tokens = generator::generate_all(&file);
    let formatted = generator::format_token_stream(&tokens);
    std::fs::write(output_path, formatted)?;
    Ok(())
}

/// Generate the table registry from a YAML string.
///
/// Like [`generate_from_tables`] but takes the table file content directly.
pub fn generate_from_tables_str(tables_yaml: &str) -> Result<String, Box<dyn std::error::Error>> {
    let file = dblayer::schema::parse_tables_str(tables_yaml)?;
    let tokens = generator::generate_all(&file);
    Ok(generator::format_token_stream(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TABLES: &str = r#"
tables:
  post:
    columns:
      - { name: post_id, type: bigint }
      - { name: blog_id, type: varchar, len: 32 }
      - { name: post_title, type: varchar, len: 255, nullable: true }
      - { name: post_dt, type: timestamp, default: "CURRENT_TIMESTAMP" }
      - { name: post_status, type: smallint, default: "0" }
    primary: [post_id]
    indexes:
      idx_post_blog: [blog_id]

  comment:
    columns:
      - { name: comment_id, type: bigint }
      - { name: post_id, type: bigint }
      - { name: comment_content, type: text, nullable: true }
      - { name: comment_trackback, type: boolean, default: "0" }
    primary: [comment_id]
    references:
      fk_comment_post:
        columns: [post_id]
        table: post
        foreign_columns: [post_id]
        on_delete: cascade
"#;

    #[test]
    fn test_generate_from_tables_str() {
        let result = generate_from_tables_str(TEST_TABLES);
        assert!(result.is_ok(), "Generation failed: {:?}", result.err());

        let code = result.unwrap();
        assert!(
            syn::parse_file(&code).is_ok(),
            "Generated code is not valid Rust:\n{}",
            &code[..code.len().min(2000)]
        );

        assert!(code.contains("pub static POST: dblayer::schema::TableDef"));
        assert!(code.contains("pub static COMMENT: dblayer::schema::TableDef"));
        assert!(code.contains("pub mod post"));
        assert!(code.contains("pub mod comment"));
        assert!(code.contains(r#"pub const POST_TITLE: &str = "post_title";"#));
        assert!(code.contains(r#"pub const COMMENT_TRACKBACK: &str = "comment_trackback";"#));
        assert!(code.contains("with_len(255)"));
        assert!(code.contains(r#"with_default("CURRENT_TIMESTAMP")"#));
        assert!(code.contains("ColumnType::Boolean"));
        assert!(code.contains("pub static ALL_TABLES: &[&dblayer::schema::TableDef]"));
    }

    #[test]
    fn test_registry_is_sorted() {
        let code = generate_from_tables_str(TEST_TABLES).unwrap();
        let registry = &code[code.find("ALL_TABLES").unwrap()..];
        let comment = registry.find("&COMMENT").unwrap();
        let post = registry.find("&POST").unwrap();
        assert!(comment < post);
    }

    #[test]
    fn test_keyword_table_name() {
        let tables = r#"
tables:
  type:
    columns:
      - { name: type, type: varchar, len: 16 }
"#;
        let code = generate_from_tables_str(tables).unwrap();
        assert!(syn::parse_file(&code).is_ok(), "Not valid Rust:\n{code}");
        assert!(code.contains("pub mod r#type"));
        assert!(code.contains(r#"pub const TYPE: &str = "type";"#));
    }

    #[test]
    fn test_path_keyword_names() {
        let tables = r#"
tables:
  self:
    columns:
      - { name: self, type: bigint }
      - { name: super, type: varchar, len: 16 }
      - { name: _1st, type: integer, nullable: true }
  crate:
    columns:
      - { name: match, type: text }
"#;
        let code = generate_from_tables_str(tables).unwrap();
        assert!(syn::parse_file(&code).is_ok(), "Not valid Rust:\n{code}");
        assert!(code.contains("pub mod self_"));
        assert!(code.contains("pub mod crate_"));
        assert!(code.contains(r#"pub const SELF: &str = "self";"#));
        assert!(code.contains(r#"pub const _1ST: &str = "_1st";"#));
        assert!(code.contains(r#"pub const MATCH: &str = "match";"#));
        assert!(code.contains(r#"name: "self""#));
    }

    #[test]
    fn test_invalid_table_file_is_rejected() {
        let tables = r#"
tables:
  post:
    columns:
      - { name: post_id, type: bigint }
    primary: [missing]
"#;
        assert!(generate_from_tables_str(tables).is_err());
    }

    #[test]
    fn test_generate_from_tables_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tables.yaml");
        let output = dir.path().join("tables.rs");
        std::fs::write(&input, TEST_TABLES).unwrap();

        generate_from_tables(input.to_str().unwrap(), output.to_str().unwrap()).unwrap();
        let code = std::fs::read_to_string(&output).unwrap();
        assert!(code.contains("pub static POST"));
    }
}
