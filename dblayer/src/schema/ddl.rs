//! DDL text per dialect. Pure renderers; [`super::Schema`] executes them.

use super::types::{ColumnDescriptor, ReferenceSpec};
use crate::driver::Driver;
use crate::error::{DbError, Result};

fn column_list(driver: Driver, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| driver.escape_system(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"name" type NULL|NOT NULL [DEFAULT x]`
pub fn column_definition(driver: Driver, column: &impl ColumnDescriptor) -> String {
    let mut sql = format!(
        "{} {} {}",
        driver.escape_system(column.name()),
        driver.column_type_sql(column.kind(), column.length()),
        if column.is_nullable() { "NULL" } else { "NOT NULL" }
    );
    if let Some(default) = column.default_value() {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

pub fn create_table<C: ColumnDescriptor>(
    driver: Driver,
    name: &str,
    columns: &[C],
    primary: &[&str],
) -> Result<String> {
    if columns.is_empty() {
        return Err(DbError::Validation(format!(
            "Table '{name}' needs at least one column"
        )));
    }
    let mut parts: Vec<String> = columns
        .iter()
        .map(|c| column_definition(driver, c))
        .collect();
    if !primary.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", column_list(driver, primary)));
    }
    Ok(format!(
        "CREATE TABLE {} ({}){}",
        driver.escape_system(name),
        parts.join(", "),
        driver.table_options()
    ))
}

pub fn create_field(driver: Driver, table: &str, column: &impl ColumnDescriptor) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        driver.escape_system(table),
        column_definition(driver, column)
    )
}

pub fn alter_field(driver: Driver, table: &str, column: &impl ColumnDescriptor) -> Result<String> {
    let table = driver.escape_system(table);
    match driver {
        Driver::Mysql | Driver::MysqlMb4 => Ok(format!(
            "ALTER TABLE {table} MODIFY COLUMN {}",
            column_definition(driver, column)
        )),
        Driver::Pgsql => {
            let name = driver.escape_system(column.name());
            let mut actions = vec![
                format!(
                    "ALTER COLUMN {name} TYPE {}",
                    driver.column_type_sql(column.kind(), column.length())
                ),
                format!(
                    "ALTER COLUMN {name} {} NOT NULL",
                    if column.is_nullable() { "DROP" } else { "SET" }
                ),
            ];
            actions.push(match column.default_value() {
                Some(default) => format!("ALTER COLUMN {name} SET DEFAULT {default}"),
                None => format!("ALTER COLUMN {name} DROP DEFAULT"),
            });
            Ok(format!("ALTER TABLE {table} {}", actions.join(", ")))
        }
        Driver::Sqlite => Err(DbError::Unsupported {
            driver: driver.name(),
            operation: "alter column",
        }),
    }
}

pub fn create_primary(driver: Driver, table: &str, name: &str, columns: &[&str]) -> String {
    match driver {
        // SQLite cannot add a primary key to an existing table
        Driver::Sqlite => format!(
            "CREATE UNIQUE INDEX {} ON {} ({})",
            driver.escape_system(name),
            driver.escape_system(table),
            column_list(driver, columns)
        ),
        _ => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            driver.escape_system(table),
            driver.escape_system(name),
            column_list(driver, columns)
        ),
    }
}

pub fn create_unique(driver: Driver, table: &str, name: &str, columns: &[&str]) -> String {
    match driver {
        Driver::Sqlite => format!(
            "CREATE UNIQUE INDEX {} ON {} ({})",
            driver.escape_system(name),
            driver.escape_system(table),
            column_list(driver, columns)
        ),
        _ => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            driver.escape_system(table),
            driver.escape_system(name),
            column_list(driver, columns)
        ),
    }
}

pub fn create_index(driver: Driver, table: &str, name: &str, columns: &[&str]) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        driver.escape_system(name),
        driver.escape_system(table),
        column_list(driver, columns)
    )
}

pub fn create_reference(
    driver: Driver,
    table: &str,
    name: &str,
    reference: &ReferenceSpec,
    foreign_table: &str,
) -> Result<String> {
    if driver == Driver::Sqlite {
        return Err(DbError::Unsupported {
            driver: driver.name(),
            operation: "add foreign key",
        });
    }
    let columns: Vec<&str> = reference.columns.iter().map(String::as_str).collect();
    let foreign: Vec<&str> = reference.foreign_columns.iter().map(String::as_str).collect();
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        driver.escape_system(table),
        driver.escape_system(name),
        column_list(driver, &columns),
        driver.escape_system(foreign_table),
        column_list(driver, &foreign)
    );
    if let Some(action) = &reference.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(&action.to_ascii_uppercase());
    }
    if let Some(action) = &reference.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(&action.to_ascii_uppercase());
    }
    Ok(sql)
}

pub fn drop_table(driver: Driver, table: &str) -> String {
    format!("DROP TABLE {}", driver.escape_system(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ColumnDef, ColumnType};
    use pretty_assertions::assert_eq;
    use crate::test_support::assert_parses;

    const COLUMNS: [ColumnDef; 4] = [
        ColumnDef::new("post_id", ColumnType::Bigint),
        ColumnDef::new("post_title", ColumnType::Varchar).with_len(255).null(),
        ColumnDef::new("post_status", ColumnType::Smallint).with_default("0"),
        ColumnDef::new("post_dt", ColumnType::Timestamp).with_default("CURRENT_TIMESTAMP"),
    ];

    #[test]
    fn test_create_table_sqlite() {
        let sql = create_table(Driver::Sqlite, "dc_post", &COLUMNS, &["post_id"]).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"dc_post\" (\"post_id\" bigint NOT NULL, \
             \"post_title\" varchar(255) NULL, \"post_status\" smallint NOT NULL DEFAULT 0, \
             \"post_dt\" timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP, PRIMARY KEY (\"post_id\"))"
        );
    }

    #[test]
    fn test_create_table_mysql_appends_options() {
        let sql = create_table(Driver::MysqlMb4, "dc_post", &COLUMNS, &[]).unwrap();
        assert!(sql.starts_with("CREATE TABLE `dc_post` (`post_id` bigint NOT NULL"));
        assert!(sql.ends_with(" ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE utf8mb4_unicode_ci"));
    }

    #[test]
    fn test_create_table_parses_per_dialect() {
        for driver in [Driver::Sqlite, Driver::Pgsql] {
            let sql = create_table(driver, "dc_post", &COLUMNS, &["post_id"]).unwrap();
            assert_parses(driver, &sql);
        }
    }

    #[test]
    fn test_no_columns() {
        let empty: [ColumnDef; 0] = [];
        assert!(matches!(
            create_table(Driver::Sqlite, "t", &empty, &[]),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn test_alter_field() {
        let column = ColumnDef::new("post_title", ColumnType::Text);
        assert_eq!(
            alter_field(Driver::Mysql, "dc_post", &column).unwrap(),
            "ALTER TABLE `dc_post` MODIFY COLUMN `post_title` longtext NOT NULL"
        );
        assert_eq!(
            alter_field(Driver::Pgsql, "dc_post", &column).unwrap(),
            "ALTER TABLE \"dc_post\" ALTER COLUMN \"post_title\" TYPE text, \
             ALTER COLUMN \"post_title\" SET NOT NULL, ALTER COLUMN \"post_title\" DROP DEFAULT"
        );
        assert!(matches!(
            alter_field(Driver::Sqlite, "dc_post", &column),
            Err(DbError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_keys_and_indexes() {
        assert_eq!(
            create_primary(Driver::Sqlite, "dc_post", "pk_post", &["post_id"]),
            "CREATE UNIQUE INDEX \"pk_post\" ON \"dc_post\" (\"post_id\")"
        );
        assert_eq!(
            create_primary(Driver::Pgsql, "dc_post", "pk_post", &["post_id"]),
            "ALTER TABLE \"dc_post\" ADD CONSTRAINT \"pk_post\" PRIMARY KEY (\"post_id\")"
        );
        assert_eq!(
            create_unique(Driver::Mysql, "dc_post", "uk_url", &["blog_id", "post_url"]),
            "ALTER TABLE `dc_post` ADD CONSTRAINT `uk_url` UNIQUE (`blog_id`, `post_url`)"
        );
        assert_eq!(
            create_index(Driver::Sqlite, "dc_post", "idx_dt", &["post_dt"]),
            "CREATE INDEX \"idx_dt\" ON \"dc_post\" (\"post_dt\")"
        );
    }

    #[test]
    fn test_create_reference() {
        let reference = ReferenceSpec {
            columns: vec!["blog_id".into()],
            table: "blog".into(),
            foreign_columns: vec!["blog_id".into()],
            on_update: Some("cascade".into()),
            on_delete: Some("cascade".into()),
        };
        let sql = create_reference(Driver::Pgsql, "dc_post", "fk_post_blog", &reference, "dc_blog")
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"dc_post\" ADD CONSTRAINT \"fk_post_blog\" FOREIGN KEY (\"blog_id\") \
             REFERENCES \"dc_blog\" (\"blog_id\") ON UPDATE CASCADE ON DELETE CASCADE"
        );
        assert_parses(Driver::Pgsql, &sql);
        assert!(matches!(
            create_reference(Driver::Sqlite, "dc_post", "fk", &reference, "dc_blog"),
            Err(DbError::Unsupported { .. })
        ));
    }
}
