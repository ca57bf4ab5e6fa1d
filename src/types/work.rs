//! The work-item seam between the batch layer and concrete survey tasks.

use crate::types::message::Prompt;

/// A unit of work the sweep can dispatch: something with a human-readable
/// title (used for diagnostics and give-up reports) that knows how to phrase
/// itself as a two-part prompt.
///
/// Implementations own their templating; the dispatch layer treats the
/// resulting prompt and the parsed reply as opaque.
pub trait WorkItem: Send + Sync {
    /// Title used in logs and permanent-failure reports.
    fn title(&self) -> &str;

    /// Build the prompt for this item.
    fn prompt(&self) -> Prompt;
}
