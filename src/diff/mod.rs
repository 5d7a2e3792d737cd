//! Structural diff between two architecture specs.
//!
//! Components are joined on id, connections on `(source, target)`. The
//! result carries a cost delta, a one-line summary and compliance-impact
//! notes for changes that touch security services.

mod compliance;
mod differ;
mod format;

pub use compliance::SecurityServices;
pub use differ::{
    ChangeType, ComponentChange, ComponentField, ConnectionChange, DiffResult, compute_diff,
    compute_diff_with,
};
pub use format::{format_diff_json, format_diff_markdown};
pub(crate) use format::format_cost_delta;
