//! The state/diff engine: building a [`notice_types::StateSnapshot`]
//! from matched features, diffing two snapshots, and ranking the
//! result into a bounded set of summary highlights.

mod diff;
mod highlight;
mod snapshot;

pub use diff::{apply, diff};
pub use highlight::{build_summary, DEFAULT_HIGHLIGHT_CAP};
pub use snapshot::from_matches;
