//! Shared identifiers
//!
//! Widget ids double as Jupyter comm ids; widget references are the
//! `IPY_MODEL_<id>` strings one widget uses to point at another.

mod id;

pub use id::*;
