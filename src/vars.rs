use std::collections::HashMap;

/// Shell variables set with `NAME=value` statements.
///
/// Unlike the process environment, these bindings are private to the shell:
/// they are read by `$NAME` expansion and listed by the `set` built-in, but
/// are never exported to spawned commands.
#[derive(Debug, Clone, Default)]
pub struct VarStore {
    vars: HashMap<String, String>,
}

impl VarStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or override a variable. Last write wins.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get the value of a variable.
    ///
    /// Returns `None` for an unset variable, which is distinct from a variable
    /// that is set to the empty string.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All bindings, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
