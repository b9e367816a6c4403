//! Diagnostics
//!
//! Failed relation insertions are reported, never raised. Every failure
//! becomes one [`RelationFailure`] record per unresolved side, written to a
//! [`DiagnosticSink`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::ResolveError;

/// Which end of a relation failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationSide {
    From,
    To,
}

impl fmt::Display for RelationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationSide::From => f.write_str("op_from"),
            RelationSide::To => f.write_str("op_to"),
        }
    }
}

/// A relation that could not be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationFailure {
    /// The relation's description.
    pub description: String,
    /// Identifier of the key that failed to resolve.
    pub key: String,
    pub side: RelationSide,
    pub reason: ResolveError,
}

impl fmt::Display for RelationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "add_relation({}) - could not find {} ({}): {}",
            self.description, self.side, self.key, self.reason
        )
    }
}

/// Write-only stream of diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, failure: RelationFailure);
}

/// Sink that logs every failure as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, failure: RelationFailure) {
        warn!(
            description = %failure.description,
            key = %failure.key,
            side = %failure.side,
            reason = %failure.reason,
            "unresolved relation dropped"
        );
    }
}

/// Sink that keeps every failure in memory.
///
/// Clones share the same storage, so one clone can be handed to the builder
/// while another is inspected afterwards.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    records: Rc<RefCell<Vec<RelationFailure>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of everything reported so far.
    pub fn records(&self) -> Vec<RelationFailure> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, failure: RelationFailure) {
        self.records.borrow_mut().push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EntityId;

    fn failure() -> RelationFailure {
        RelationFailure {
            description: "Parent -> Child".into(),
            key: "ComponentKey(#4, Transform)".into(),
            side: RelationSide::From,
            reason: ResolveError::UnknownEntity(EntityId::from(4)),
        }
    }

    #[test]
    fn collecting_sink_clones_share_records() {
        let sink = CollectingSink::new();
        let mut writer = sink.clone();
        writer.report(failure());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].side, RelationSide::From);
    }

    #[test]
    fn failure_display_names_side_and_key() {
        let text = failure().to_string();
        assert!(text.contains("Parent -> Child"));
        assert!(text.contains("op_from"));
        assert!(text.contains("ComponentKey(#4, Transform)"));
    }
}
