//! Container grammar shared by both machines.
//!
//! Tracks the stack of open containers (one map/list bit per level), the
//! key/value alternation inside maps, and document termination: a document
//! holds exactly one top-level value, and completing it closes the grammar
//! to everything but padding. Callers split every grammar change into a
//! non-mutating `check_*` followed by the mutation, so an operation that
//! fails a later preflight (such as buffer room) leaves the grammar
//! untouched.

use crate::error::Violation;
use crate::DEFAULT_MAX_CONTAINER_DEPTH;

#[derive(Debug)]
pub(crate) struct ContainerTracker {
    max_depth: usize,
    is_map: Vec<bool>,
    next_is_key: bool,
    document_complete: bool,
}

impl ContainerTracker {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            max_depth: if max_depth == 0 {
                DEFAULT_MAX_CONTAINER_DEPTH
            } else {
                max_depth
            },
            is_map: Vec::new(),
            next_is_key: false,
            document_complete: false,
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.is_map.len()
    }

    fn expecting_key(&self) -> bool {
        self.next_is_key && self.is_map.last() == Some(&true)
    }

    /// A value is about to occupy the current grammar position.
    pub(crate) fn check_value(&self, can_be_key: bool) -> Result<(), Violation> {
        if self.document_complete {
            return Err(Violation::DocumentComplete);
        }
        if self.expecting_key() && !can_be_key {
            return Err(Violation::KeyType);
        }
        Ok(())
    }

    /// A value fully occupied the current position. At top level this is
    /// the document's one value, terminating the grammar.
    pub(crate) fn complete_value(&mut self) {
        match self.is_map.last() {
            Some(&true) => self.next_is_key = !self.next_is_key,
            Some(&false) => {}
            None => self.document_complete = true,
        }
    }

    pub(crate) fn check_depth(&self) -> Result<(), Violation> {
        if self.is_map.len() >= self.max_depth {
            return Err(Violation::TooDeep);
        }
        Ok(())
    }

    pub(crate) fn begin(&mut self, is_map: bool) {
        debug_assert!(self.is_map.len() < self.max_depth);
        self.is_map.push(is_map);
        self.next_is_key = is_map;
    }

    pub(crate) fn check_end(&self) -> Result<(), Violation> {
        match self.is_map.last() {
            None => Err(Violation::Unbalanced),
            Some(&true) if !self.next_is_key => Err(Violation::MissingValue),
            Some(_) => Ok(()),
        }
    }

    /// Close the innermost container; the container itself then counts as
    /// one completed value in its parent.
    pub(crate) fn end(&mut self) {
        self.is_map.pop();
        self.next_is_key = false;
        self.complete_value();
    }

    /// Document-end validation.
    pub(crate) fn finish(&self) -> Result<(), Violation> {
        match self.is_map.last() {
            None => Ok(()),
            Some(&true) if !self.next_is_key => Err(Violation::MissingValue),
            Some(_) => Err(Violation::Unbalanced),
        }
    }
}
