use std::collections::HashMap;
use std::sync::Arc;

use crate::core::ScriptCore;
use crate::error::{Error, Result};
use crate::value::{Scalar, Value};

/// An associative array of [`Value`]s.
///
/// Keys are the string projections of the index values, so an index of `1`
/// and an index of `"1"` address the same slot. Multi-dimensional indexing
/// joins the per-dimension projections with the owning script's subscript
/// separator. Iteration order over keys is unspecified.
pub struct ValueArray {
    core: Arc<ScriptCore>,
    data: HashMap<String, Value>,
}

impl ValueArray {
    pub(crate) fn new(core: Arc<ScriptCore>) -> Self {
        Self {
            core,
            data: HashMap::new(),
        }
    }

    fn value(&self, scalar: impl Into<Scalar>) -> Value {
        Value::from_scalar(scalar.into(), Arc::clone(&self.core))
    }

    fn join_key(&self, indices: &[Value]) -> String {
        indices
            .iter()
            .map(|v| v.string().to_string())
            .collect::<Vec<_>>()
            .join(&self.core.sub_sep())
    }

    /// Assign a value to a single index.
    pub fn set(&mut self, index: impl Into<Scalar>, value: impl Into<Scalar>) {
        let key = self.value(index).string().to_string();
        let value = self.value(value);
        self.data.insert(key, value);
    }

    /// Assign a value to a multi-dimensional index. At least one index is
    /// required.
    pub fn set_multi(&mut self, indices: &[Value], value: impl Into<Scalar>) -> Result<()> {
        if indices.is_empty() {
            return Err(Error::config("array assignment requires at least one index"));
        }
        let key = self.join_key(indices);
        let value = self.value(value);
        self.data.insert(key, value);
        Ok(())
    }

    /// The value at a single index, or an empty-string value if the index
    /// is absent.
    pub fn get(&self, index: impl Into<Scalar>) -> Value {
        let idx = self.value(index);
        match self.data.get(idx.string()) {
            Some(v) => v.clone(),
            None => self.value(""),
        }
    }

    /// The value at a multi-dimensional index, or an empty-string value if
    /// the index is absent.
    pub fn get_multi(&self, indices: &[Value]) -> Value {
        match self.data.get(&self.join_key(indices)) {
            Some(v) => v.clone(),
            None => self.value(""),
        }
    }

    /// Whether a single index is present.
    pub fn contains(&self, index: impl Into<Scalar>) -> bool {
        let idx = self.value(index);
        self.data.contains_key(idx.string())
    }

    /// Remove a single index.
    pub fn delete(&mut self, index: impl Into<Scalar>) {
        let idx = self.value(index);
        self.data.remove(idx.string());
    }

    /// Remove a multi-dimensional index. An empty index list clears the
    /// whole array.
    pub fn delete_multi(&mut self, indices: &[Value]) {
        if indices.is_empty() {
            self.data.clear();
            return;
        }
        self.data.remove(&self.join_key(indices));
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// All keys, in unspecified order.
    pub fn keys(&self) -> Vec<Value> {
        self.data.keys().map(|k| self.value(k.as_str())).collect()
    }

    /// All values, in unspecified order.
    pub fn values(&self) -> Vec<Value> {
        self.data.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
