//! Caller-supplied filter values.
//!
//! [`Param`] holds raw string values keyed by name, the way they arrive from a
//! query string or a JSON body. Its accessors only ever hand out cleaned,
//! typed values; nothing raw reaches a statement.

mod sets;

pub use sets::{CommentParams, ParamSet, PostParams};

use crate::error::{DbError, Result};
use crate::order::{Direction, OrderSpec};
use crate::statement::Limit;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    values: BTreeMap<String, Vec<String>>,
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from query-string style pairs. `key[]` accumulates into a list,
    /// a plain `key` replaces what was there.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut param = Param::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            match key.strip_suffix("[]") {
                Some(list) => param
                    .values
                    .entry(list.to_string())
                    .or_default()
                    .push(value.into()),
                None => {
                    param.set(key, value);
                }
            }
        }
        param
    }

    /// Build from a JSON object of scalars and arrays of scalars; `null` entries are skipped.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DbError::Validation("Parameters must be a JSON object".to_string()))?;
        let mut param = Param::new();
        for (key, value) in object {
            let values = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| json_scalar(key, item))
                    .collect::<Result<Vec<_>>>()?,
                scalar => vec![json_scalar(key, scalar)?],
            };
            param.values.insert(key.clone(), values);
        }
        Ok(param)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), vec![value.into()]);
        self
    }

    pub fn set_list<I, V>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.values
            .insert(key.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Drop every key not in `accepted`.
    pub fn retain(&mut self, accepted: &[&str]) {
        self.values.retain(|key, _| accepted.contains(&key.as_str()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn raw(&self, key: &str) -> impl Iterator<Item = &str> {
        self.values
            .get(key)
            .into_iter()
            .flatten()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value, trimmed.
    pub fn text(&self, key: &str) -> Option<String> {
        self.raw(key).next().map(str::to_string)
    }

    /// Every non-empty value, trimmed, duplicates removed.
    pub fn texts(&self, key: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for value in self.raw(key) {
            if !out.iter().any(|seen| seen == value) {
                out.push(value.to_string());
            }
        }
        out
    }

    /// First value that reads as an integer.
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.raw(key).find_map(|v| v.parse().ok())
    }

    /// Every value that reads as an integer, duplicates removed.
    pub fn integers(&self, key: &str) -> Vec<i64> {
        let mut out = Vec::new();
        for n in self.raw(key).filter_map(|v| v.parse::<i64>().ok()) {
            if !out.contains(&n) {
                out.push(n);
            }
        }
        out
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.raw(key).find_map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
    }

    /// Search words as `LIKE` content: split on whitespace, `*` becomes `%`.
    pub fn words(&self, key: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for word in self.raw(key).flat_map(str::split_whitespace) {
            let word = word.replace('*', "%");
            if word.chars().all(|c| c == '%') || out.contains(&word) {
                continue;
            }
            out.push(word);
        }
        out
    }

    /// `"10"` is a count; `"20,10"` or a two-value list is `(offset, count)`.
    pub fn limit(&self, key: &str) -> Option<Limit> {
        let parts: Vec<u64> = self
            .raw(key)
            .flat_map(|v| v.split(','))
            .map(|v| v.trim().parse::<u64>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [count] => Some(Limit::Count(*count)),
            [offset, count] => Some(Limit::Range {
                offset: *offset,
                count: *count,
            }),
            _ => None,
        }
    }

    /// `"field [asc|desc], ..."` restricted to `allowed` fields; invalid terms are dropped.
    pub fn order(&self, key: &str, allowed: &[&str]) -> Vec<OrderSpec> {
        let mut specs = Vec::new();
        for term in self.raw(key).flat_map(|v| v.split(',')) {
            let mut words = term.split_whitespace();
            let Some(field) = words.next() else {
                continue;
            };
            if !allowed.contains(&field) {
                log::debug!("Dropping sort on unexpected field {field}");
                continue;
            }
            let direction = match words.next() {
                None => Direction::Asc,
                Some(word) => match word.parse::<Direction>() {
                    Ok(direction) => direction,
                    Err(_) => continue,
                },
            };
            if words.next().is_some() {
                continue;
            }
            specs.push(OrderSpec {
                field: field.to_string(),
                direction,
                lexical: false,
            });
        }
        specs
    }
}

fn json_scalar(key: &str, value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok((if *b { "1" } else { "0" }).to_string()),
        _ => Err(DbError::Validation(format!(
            "Parameter '{key}' must be a scalar or a list of scalars"
        ))),
    }
}
