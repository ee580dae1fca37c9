use super::RowView;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Signature of an extension function: reads the current row, returns a computed value.
pub type ExtensionFn = dyn Fn(&dyn RowView, &[Value]) -> Value;

/// A named bundle of computed accessors attachable to any record.
///
/// Functions only ever see the record through [`RowView`], so they cannot
/// write into the row they compute from.
pub struct RecordExtension {
    name: String,
    functions: Vec<(String, Box<ExtensionFn>)>,
}

impl RecordExtension {
    pub fn new(name: impl Into<String>) -> Self {
        RecordExtension {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a function taking no arguments.
    pub fn with<F>(self, function: &str, f: F) -> Self
    where
        F: Fn(&dyn RowView) -> Value + 'static,
    {
        self.with_args(function, move |row, _| f(row))
    }

    /// Add a function receiving call arguments.
    pub fn with_args<F>(mut self, function: &str, f: F) -> Self
    where
        F: Fn(&dyn RowView, &[Value]) -> Value + 'static,
    {
        self.functions.retain(|(name, _)| name != function);
        self.functions.push((function.to_string(), Box::new(f)));
        self
    }

    pub fn provides(&self, function: &str) -> bool {
        self.get(function).is_some()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(name, _)| name.as_str())
    }

    fn get(&self, function: &str) -> Option<&ExtensionFn> {
        self.functions
            .iter()
            .find(|(name, _)| name == function)
            .map(|(_, f)| f.as_ref())
    }
}

impl fmt::Debug for RecordExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordExtension")
            .field("name", &self.name)
            .field("functions", &self.function_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Extensions attached to one record, in attachment order.
#[derive(Clone, Default)]
pub struct Extensions {
    attached: Vec<Rc<RecordExtension>>,
}

impl Extensions {
    pub fn attach(&mut self, extension: Rc<RecordExtension>) {
        self.attached.push(extension);
    }

    /// Most recently attached provider of `function` wins.
    pub fn lookup(&self, function: &str) -> Option<&ExtensionFn> {
        self.attached.iter().rev().find_map(|ext| ext.get(function))
    }

    pub fn names(&self) -> Vec<&str> {
        self.attached.iter().map(|ext| ext.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
