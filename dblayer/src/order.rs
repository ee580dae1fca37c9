use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction shared by `ORDER BY` rendering and static record sorts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("Invalid sort direction '{other}'")),
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub field: String,
    pub direction: Direction,
    /// Compare case-insensitively using the dialect's lexical collation.
    pub lexical: bool,
}

impl OrderSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderSpec {
            field: field.into(),
            direction: Direction::Asc,
            lexical: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderSpec {
            field: field.into(),
            direction: Direction::Desc,
            lexical: false,
        }
    }

    pub fn lexical(mut self) -> Self {
        self.lexical = true;
        self
    }
}
