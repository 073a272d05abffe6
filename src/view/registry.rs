//! Named view units.
//!
//! Route tables declared in configuration refer to views by name; the
//! registry resolves those names to the units the application registered.

use std::collections::HashMap;

use crate::view::ViewUnit;

#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    views: HashMap<String, ViewUnit>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, view: impl Into<ViewUnit>) -> &mut Self {
        let name = name.into();
        if self.views.insert(name.clone(), view.into()).is_some() {
            tracing::warn!(view = %name, "View registered twice, keeping the latest");
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, view: impl Into<ViewUnit>) -> Self {
        self.register(name, view);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ViewUnit> {
        self.views.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
