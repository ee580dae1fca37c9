//! In-process link double: records every statement and answers queries from a script.

use super::{Link, ResultSet};
use crate::error::Result;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) type StatementLog = Rc<RefCell<Vec<String>>>;

pub(crate) struct ScriptedLink {
    version: String,
    log: StatementLog,
    answers: Vec<(String, ResultSet)>,
}

impl ScriptedLink {
    pub(crate) fn new(version: &str) -> (Self, StatementLog) {
        let log = StatementLog::default();
        let link = ScriptedLink {
            version: version.to_string(),
            log: Rc::clone(&log),
            answers: Vec::new(),
        };
        (link, log)
    }

    /// Answer queries starting with `prefix` with one text column of `lines`.
    pub(crate) fn answer(mut self, prefix: &str, lines: &[&str]) -> Self {
        let rows = lines
            .iter()
            .map(|line| vec![Value::Text(line.to_string())])
            .collect();
        self.answers.push((
            prefix.to_string(),
            ResultSet {
                columns: Vec::new(),
                rows,
            },
        ));
        self
    }
}

impl Link for ScriptedLink {
    fn server_version(&mut self) -> Result<String> {
        Ok(self.version.clone())
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        self.log.borrow_mut().push(sql.to_string());
        Ok(self
            .answers
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, set)| set.clone())
            .unwrap_or_default())
    }

    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.log.borrow_mut().push(sql.to_string());
        Ok(0)
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>> {
        Ok(None)
    }
}
