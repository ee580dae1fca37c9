use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine-neutral column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Smallint,
    Integer,
    Bigint,
    Real,
    Float,
    Numeric,
    Date,
    Time,
    Timestamp,
    Char,
    Varchar,
    Text,
    Boolean,
}

/// What a cursor coerces an assigned value into for a given column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Real,
    Boolean,
    Date,
}

impl ColumnType {
    pub const ALL: [ColumnType; 13] = [
        ColumnType::Smallint,
        ColumnType::Integer,
        ColumnType::Bigint,
        ColumnType::Real,
        ColumnType::Float,
        ColumnType::Numeric,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::Timestamp,
        ColumnType::Char,
        ColumnType::Varchar,
        ColumnType::Text,
        ColumnType::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Smallint => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::Bigint => "bigint",
            ColumnType::Real => "real",
            ColumnType::Float => "float",
            ColumnType::Numeric => "numeric",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
        }
    }

    pub fn from_name(name: &str) -> Option<ColumnType> {
        let name = name.to_ascii_lowercase();
        ColumnType::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn field_kind(&self) -> FieldKind {
        match self {
            ColumnType::Smallint | ColumnType::Integer | ColumnType::Bigint => FieldKind::Integer,
            ColumnType::Real | ColumnType::Float | ColumnType::Numeric => FieldKind::Real,
            ColumnType::Date | ColumnType::Timestamp => FieldKind::Date,
            ColumnType::Time | ColumnType::Char | ColumnType::Varchar | ColumnType::Text => {
                FieldKind::String
            }
            ColumnType::Boolean => FieldKind::Boolean,
        }
    }
}

/// Anything the DDL renderers can turn into a column definition.
pub trait ColumnDescriptor {
    fn name(&self) -> &str;
    fn kind(&self) -> ColumnType;
    /// Declared length; 0 when the type carries none.
    fn length(&self) -> u32;
    fn is_nullable(&self) -> bool;
    /// Raw SQL default expression.
    fn default_value(&self) -> Option<&str>;
}

/// Compile-time column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnType,
    pub len: u32,
    pub nullable: bool,
    pub default: Option<&'static str>,
}

impl ColumnDef {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        ColumnDef {
            name,
            kind,
            len: 0,
            nullable: false,
            default: None,
        }
    }

    pub const fn with_len(mut self, len: u32) -> Self {
        self.len = len;
        self
    }

    pub const fn null(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn with_default(mut self, sql: &'static str) -> Self {
        self.default = Some(sql);
        self
    }

    /// A column a row cannot be inserted without.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

impl ColumnDescriptor for ColumnDef {
    fn name(&self) -> &str {
        self.name
    }
    fn kind(&self) -> ColumnType {
        self.kind
    }
    fn length(&self) -> u32 {
        self.len
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
    fn default_value(&self) -> Option<&str> {
        self.default
    }
}

/// Compile-time table definition: the `{column -> type}` registry cursors are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Unprefixed table name.
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub primary: &'static [&'static str],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// The single integer primary key column, if the table has one.
    pub fn integer_key(&self) -> Option<&ColumnDef> {
        match self.primary {
            [only] => self
                .column(only)
                .filter(|c| c.kind.field_kind() == FieldKind::Integer),
            _ => None,
        }
    }
}

/// Runtime column description: read from a table file or from introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default)]
    pub len: u32,
    #[serde(alias = "null", default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

impl ColumnDescriptor for ColumnSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> ColumnType {
        self.kind
    }
    fn length(&self) -> u32 {
        self.len
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
    fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// Foreign key declared in a table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub columns: Vec<String>,
    pub table: String,
    pub foreign_columns: Vec<String>,
    #[serde(default)]
    pub on_update: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
}

/// One table in a table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub unique: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub indexes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceSpec>,
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Top-level table file (`tables.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFile {
    #[serde(default)]
    pub tables: BTreeMap<String, TableSpec>,
}
