use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::ParameterError;
use crate::value::Value;

/// Named scalar parameters owned by the drive frontend.
///
/// This is the sole source of live values and sink of written values for
/// the machine layer.
pub trait ParameterMap: Send + Sync {
    fn read(&self, key: &str) -> Result<Value, ParameterError>;
    fn write(&self, key: &str, value: Value) -> Result<(), ParameterError>;
}

/// In-memory parameter map.
///
/// Unknown keys fail to read; any key can be written.
#[derive(Debug, Default)]
pub struct MemoryParameterMap {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map seeded with initial values.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Snapshot of every stored value, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl ParameterMap for MemoryParameterMap {
    fn read(&self, key: &str) -> Result<Value, ParameterError> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| ParameterError::Unknown(key.to_string()))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), ParameterError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}
