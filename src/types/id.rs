//! Widget ids and widget references

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix that marks a JSON string as a reference to another widget model
pub const MODEL_REFERENCE_PREFIX: &str = "IPY_MODEL_";

/// Comm id of a widget
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    /// Fresh id for a kernel-created widget (32 lowercase hex digits)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WidgetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WidgetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Non-owning reference to another widget
///
/// The referenced widget is owned elsewhere (usually by the
/// [`WidgetManager`](crate::widget::WidgetManager)); holding a reference
/// does not keep it alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetRef {
    id: WidgetId,
}

impl WidgetRef {
    pub fn new(id: impl Into<WidgetId>) -> Self {
        Self { id: id.into() }
    }

    /// Id of the referenced widget
    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    /// Wire form, e.g. `IPY_MODEL_0123abcd`
    pub fn to_wire(&self) -> String {
        format!("{}{}", MODEL_REFERENCE_PREFIX, self.id)
    }

    /// Parse the wire form; `None` if the prefix is missing or the id is empty
    pub fn from_wire(s: &str) -> Option<Self> {
        s.strip_prefix(MODEL_REFERENCE_PREFIX)
            .filter(|id| !id.is_empty())
            .map(Self::new)
    }
}

impl fmt::Display for WidgetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
