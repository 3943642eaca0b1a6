//! Call-order recording

use std::sync::Arc;

use mosaic_core::{Function, Value};
use parking_lot::Mutex;

/// Shared log of values pushed by procedures under test
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value
    pub fn push(&self, value: impl Into<Value>) {
        self.entries.lock().push(value.into());
    }

    /// Procedure that appends `value` each time it is called and returns
    /// `Undefined`
    pub fn pusher(&self, value: impl Into<Value>) -> Function {
        let recorder = self.clone();
        let value = value.into();
        Function::new(move |_, _| {
            recorder.push(value.clone());
            Ok(Value::Undefined)
        })
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<Value> {
        self.entries.lock().clone()
    }

    /// Recorded values read as numbers, for order assertions
    pub fn numbers(&self) -> Vec<f64> {
        self.entries
            .lock()
            .iter()
            .filter_map(Value::as_number)
            .collect()
    }

    /// How many times `value` was recorded
    pub fn count(&self, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.entries.lock().iter().filter(|v| v.same(&value)).count()
    }

    /// Forget everything recorded
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
