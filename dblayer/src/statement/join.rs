use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Cross => "CROSS",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `[kind] JOIN source [ON a AND b]`, attached to another statement with `join()`.
///
/// A join holds no connection: conditions are built by the caller, usually
/// from column comparisons that need no quoting.
#[derive(Debug, Clone, Default)]
pub struct JoinStatement {
    kind: Option<JoinKind>,
    from: Vec<String>,
    on: Vec<String>,
}

impl JoinStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left() -> Self {
        Self::default().kind(JoinKind::Left)
    }

    pub fn inner() -> Self {
        Self::default().kind(JoinKind::Inner)
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn from(mut self, source: impl Into<String>) -> Self {
        self.from.push(source.into());
        self
    }

    /// Join condition; several are combined with `AND`.
    pub fn on(mut self, expr: impl Into<String>) -> Self {
        self.on.push(expr.into());
        self
    }

    pub fn statement(&self) -> String {
        let mut sql = String::new();
        if let Some(kind) = self.kind {
            sql.push_str(kind.as_sql());
            sql.push(' ');
        }
        sql.push_str("JOIN ");
        sql.push_str(&self.from.join(", "));
        if !self.on.is_empty() {
            sql.push_str(" ON ");
            sql.push_str(&self.on.join(" AND "));
        }
        sql
    }
}
