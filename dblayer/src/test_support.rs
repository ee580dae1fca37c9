//! Helpers shared by the unit tests.

use crate::driver::Driver;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

pub(crate) fn parser_dialect(driver: Driver) -> Box<dyn Dialect> {
    match driver {
        Driver::Sqlite => Box::new(SQLiteDialect {}),
        Driver::Mysql | Driver::MysqlMb4 => Box::new(MySqlDialect {}),
        Driver::Pgsql => Box::new(PostgreSqlDialect {}),
    }
}

/// Fail unless `sql` parses in the dialect of `driver`.
pub(crate) fn assert_parses(driver: Driver, sql: &str) {
    let dialect = parser_dialect(driver);
    if let Err(e) = Parser::parse_sql(dialect.as_ref(), sql) {
        panic!("{driver} rendered invalid SQL: {sql}\n{e}");
    }
}
