//! Widget Registry
//!
//! Maps a (model module, model name, view module, view name) tuple to a
//! constructor, so widgets named by incoming `comm_open` messages can be
//! instantiated.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::WidgetId;

use super::{PeerModel, Widget};

// ─────────────────────────────────────────────────────────────────
// Widget Key
// ─────────────────────────────────────────────────────────────────

/// Identifies a widget type to the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetKey {
    pub model_module: String,
    pub model_name: String,
    pub view_module: String,
    pub view_name: String,
}

impl WidgetKey {
    pub fn new(
        model_module: impl Into<String>,
        model_name: impl Into<String>,
        view_module: impl Into<String>,
        view_name: impl Into<String>,
    ) -> Self {
        Self {
            model_module: model_module.into(),
            model_name: model_name.into(),
            view_module: view_module.into(),
            view_name: view_name.into(),
        }
    }
}

impl fmt::Display for WidgetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} / {}:{}",
            self.model_module, self.model_name, self.view_module, self.view_name
        )
    }
}

/// Constructor for a registered widget type
pub type WidgetMaker = fn(WidgetId) -> Box<dyn Widget>;

/// Outcome of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The key was new and is now registered
    Added,
    /// The key was already registered; the existing maker is kept
    AlreadyRegistered,
}

// ─────────────────────────────────────────────────────────────────
// Widget Registry
// ─────────────────────────────────────────────────────────────────

/// Thread-safe registry of widget constructors
pub struct WidgetRegistry {
    makers: RwLock<HashMap<WidgetKey, WidgetMaker>>,
}

impl WidgetRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            makers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry holding the built-in widget types
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        register_builtin_widgets(&registry);
        registry
    }

    /// Register a widget constructor
    ///
    /// A key that is already present keeps its first maker.
    pub fn register(&self, key: WidgetKey, maker: WidgetMaker) -> Registration {
        let mut makers = self.makers.write();
        if makers.contains_key(&key) {
            tracing::trace!(widget = %key, "Widget type already registered");
            return Registration::AlreadyRegistered;
        }

        tracing::debug!(widget = %key, "Widget type registered");
        makers.insert(key, maker);
        Registration::Added
    }

    /// Construct a widget of a registered type
    pub fn make(&self, key: &WidgetKey, id: WidgetId) -> Result<Box<dyn Widget>> {
        let maker = self
            .makers
            .read()
            .get(key)
            .copied()
            .ok_or_else(|| Error::UnregisteredWidget {
                model_module: key.model_module.clone(),
                model_name: key.model_name.clone(),
                view_module: key.view_module.clone(),
                view_name: key.view_name.clone(),
            })?;
        Ok(maker(id))
    }

    /// Check whether a key is registered
    pub fn contains(&self, key: &WidgetKey) -> bool {
        self.makers.read().contains_key(key)
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> Vec<WidgetKey> {
        let mut keys: Vec<WidgetKey> = self.makers.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of registered widget types
    pub fn len(&self) -> usize {
        self.makers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.makers.read().is_empty()
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every widget type this crate provides
///
/// Safe to call more than once.
pub fn register_builtin_widgets(registry: &WidgetRegistry) {
    registry.register(PeerModel::widget_key(), PeerModel::make);
    PeerModel::register_companions(registry);
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
