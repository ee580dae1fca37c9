pub mod config;
pub mod connection;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod order;
pub mod param;
pub mod record;
pub mod schema;
pub mod statement;
pub mod value;

#[cfg(test)]
mod test_support;

pub use config::ConnectionConfig;
pub use connection::{Connection, LockState};
pub use cursor::Cursor;
pub use driver::{Driver, Link};
pub use error::{DbError, Result};
pub use order::{Direction, OrderSpec};
pub use param::{CommentParams, Param, ParamSet, PostParams};
pub use record::{MetaRecord, Record, RecordExtension, RowView, StaticRecord};
pub use schema::{ColumnDef, ColumnType, Schema, TableDef};
pub use statement::{
    DeleteStatement, InsertStatement, JoinStatement, Limit, SelectStatement, Statement,
    UpdateStatement,
};
pub use value::{FieldValue, Value};

/// Everything needed to build and run statements, traits included.
pub mod prelude {
    pub use crate::{
        Connection, ConnectionConfig, Cursor, DbError, Direction, FieldValue, JoinStatement,
        MetaRecord, OrderSpec, ParamSet, RowView, Statement, TableDef, Value,
    };
}
