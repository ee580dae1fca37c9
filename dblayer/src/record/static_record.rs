use super::{Extensions, MetaRecord, Position, RowView};
use crate::driver::{Column, ResultSet};
use crate::error::{DbError, Result};
use crate::order::Direction;
use crate::value::Value;
use std::cmp::Ordering;

/// Fully materialized result that can be rewound, repositioned and sorted.
#[derive(Debug, Clone)]
pub struct StaticRecord {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    position: Position,
    extensions: Extensions,
}

impl StaticRecord {
    pub fn new(set: ResultSet) -> Self {
        Self::from_parts(set.columns, set.rows, Extensions::default())
    }

    pub(crate) fn from_parts(
        columns: Vec<Column>,
        rows: Vec<Vec<Value>>,
        extensions: Extensions,
    ) -> Self {
        StaticRecord {
            columns,
            rows,
            position: Position::Unfetched,
            extensions,
        }
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Rewind; the next `fetch()` lands on the first row.
    pub fn move_start(&mut self) {
        self.position = Position::Unfetched;
    }

    /// Jump to row `index`. False (and no move) when out of range.
    pub fn move_to(&mut self, index: usize) -> bool {
        if index < self.rows.len() {
            self.position = Position::At(index);
            true
        } else {
            false
        }
    }

    /// Stable sort on one column.
    pub fn sort(&mut self, field: &str, direction: Direction) -> Result<()> {
        self.sort_by(&[(field, direction)])
    }

    /// Stable multi-key sort; earlier keys take precedence.
    pub fn sort_by(&mut self, keys: &[(&str, Direction)]) -> Result<()> {
        let keys = self.resolve_keys(keys)?;
        self.rows.sort_by(|a, b| compare_rows(a, b, &keys, Value::compare));
        Ok(())
    }

    /// Stable case-insensitive sort on one column's text.
    pub fn lexical_sort(&mut self, field: &str, direction: Direction) -> Result<()> {
        let keys = self.resolve_keys(&[(field, direction)])?;
        self.rows.sort_by(|a, b| {
            compare_rows(a, b, &keys, |x, y| {
                x.to_text().to_lowercase().cmp(&y.to_text().to_lowercase())
            })
        });
        Ok(())
    }

    /// Every row as a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.name.clone(), serde_json::Value::from(v)))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    fn resolve_keys(&self, keys: &[(&str, Direction)]) -> Result<Vec<(usize, Direction)>> {
        keys.iter()
            .map(|(field, direction)| {
                self.column_index(field)
                    .map(|i| (i, *direction))
                    .ok_or_else(|| DbError::Validation(format!("Cannot sort on unknown field '{field}'")))
            })
            .collect()
    }
}

fn compare_rows(
    a: &[Value],
    b: &[Value],
    keys: &[(usize, Direction)],
    cmp: impl Fn(&Value, &Value) -> Ordering,
) -> Ordering {
    for (i, direction) in keys {
        let ordering = cmp(&a[*i], &b[*i]);
        let ordering = match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl RowView for StaticRecord {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn current(&self) -> Option<&[Value]> {
        let row = match self.position {
            Position::Unfetched => self.rows.first(),
            Position::At(i) => self.rows.get(i),
            Position::Exhausted => None,
        };
        row.map(Vec::as_slice)
    }

    fn position(&self) -> Position {
        self.position
    }

    fn count(&self) -> usize {
        self.rows.len()
    }
}

impl MetaRecord for StaticRecord {
    fn fetch(&mut self) -> bool {
        let next = match self.position {
            Position::Unfetched => 0,
            Position::At(i) => i + 1,
            Position::Exhausted => return false,
        };
        if next < self.rows.len() {
            self.position = Position::At(next);
            true
        } else {
            self.position = Position::Exhausted;
            false
        }
    }

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::names_set;
    use super::super::{Record, RecordExtension};
    use super::*;
    use crate::value::SemanticType;
    use pretty_assertions::assert_eq;

    fn names(rs: &mut StaticRecord) -> Vec<String> {
        rs.move_start();
        let mut out = Vec::new();
        while rs.fetch() {
            out.push(rs.string("name"));
        }
        out
    }

    #[test]
    fn test_sort_desc_then_rewind() {
        let live = Record::new(names_set(&["bob", "cid", "ann"]));
        let mut rs = live.to_static();
        rs.sort("name", Direction::Desc).unwrap();
        rs.move_start();
        let mut seen = Vec::new();
        for _ in 0..3 {
            assert!(rs.fetch());
            seen.push(rs.string("name"));
        }
        assert_eq!(seen, vec!["cid", "bob", "ann"]);
        assert!(!rs.fetch());
    }

    #[test]
    fn test_multi_pass() {
        let mut rs = StaticRecord::new(names_set(&["a", "b"]));
        assert_eq!(names(&mut rs), vec!["a", "b"]);
        assert_eq!(names(&mut rs), vec!["a", "b"]);
    }

    #[test]
    fn test_sort_is_stable_across_keys() {
        let set = ResultSet {
            columns: vec![
                Column::new("cat", SemanticType::String),
                Column::new("rank", SemanticType::Int),
                Column::new("name", SemanticType::String),
            ],
            rows: vec![
                vec![Value::from("x"), Value::Integer(2), Value::from("first")],
                vec![Value::from("y"), Value::Integer(1), Value::from("second")],
                vec![Value::from("x"), Value::Integer(2), Value::from("third")],
                vec![Value::from("x"), Value::Integer(10), Value::from("fourth")],
            ],
        };
        let mut rs = StaticRecord::new(set);
        rs.sort_by(&[("cat", Direction::Asc), ("rank", Direction::Desc)])
            .unwrap();
        assert_eq!(names(&mut rs), vec!["fourth", "first", "third", "second"]);
    }

    #[test]
    fn test_lexical_sort() {
        let mut rs = StaticRecord::new(names_set(&["beta", "Alpha", "alpha2", "Gamma"]));
        rs.lexical_sort("name", Direction::Asc).unwrap();
        assert_eq!(names(&mut rs), vec!["Alpha", "alpha2", "beta", "Gamma"]);
    }

    #[test]
    fn test_sort_unknown_field() {
        let mut rs = StaticRecord::new(names_set(&["a"]));
        assert!(matches!(
            rs.sort("nope", Direction::Asc),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn test_move_to() {
        let mut rs = StaticRecord::new(names_set(&["a", "b", "c"]));
        assert!(rs.move_to(2));
        assert_eq!(rs.string("name"), "c");
        assert!(rs.is_end());
        assert!(!rs.move_to(3));
        assert_eq!(rs.string("name"), "c");
        assert!(!rs.fetch());
    }

    #[test]
    fn test_extensions_survive_to_static() {
        let mut live = Record::new(names_set(&["ann"]));
        live.extend(RecordExtension::new("e").with("len", |row| {
            Value::Integer(row.string("name").len() as i64)
        }));
        let st = live.to_static();
        assert_eq!(st.call("len").unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_to_json() {
        let rs = StaticRecord::new(names_set(&["ann"]));
        assert_eq!(
            rs.to_json(),
            serde_json::json!([{ "id": 1, "name": "ann" }])
        );
    }
}
