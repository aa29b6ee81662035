//! Change journal for apply runs
//!
//! Apply is not atomic: a failure part way through a manifest leaves the
//! target with some tasks written and others not. The journal records every
//! write in order, together with what it replaced, so callers can see exactly
//! what committed and undo it.

use std::collections::HashMap;

use xxhash_rust::xxh64::xxh64;

/// Lifecycle of a single journaled write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    /// Recorded, but the target write has not completed
    Staged,
    /// The target now holds the new contents
    Written,
    /// The previous contents were restored
    RolledBack,
}

/// One write to the target filesystem
#[derive(Debug, Clone)]
pub struct Change {
    pub task_index: usize,
    pub task_name: Option<String>,
    /// Normalized target path
    pub path: String,
    pub state: ChangeState,
    /// Previous contents, if the file existed and backups are enabled
    pub backup: Option<Vec<u8>>,
    /// Whether the file existed before this change
    pub existed: bool,
    /// xxHash64 of the contents written
    pub digest: u64,
}

/// Ordered record of changes with a per-path index
#[derive(Debug, Clone, Default)]
pub struct ChangeJournal {
    changes: Vec<Change>,
    by_path: HashMap<String, Vec<usize>>,
}

impl ChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending write and return its position in the journal
    pub fn stage(
        &mut self,
        task_index: usize,
        task_name: Option<String>,
        path: &str,
        existed: bool,
        backup: Option<Vec<u8>>,
        contents: &[u8],
    ) -> usize {
        let position = self.changes.len();
        self.changes.push(Change {
            task_index,
            task_name,
            path: path.to_string(),
            state: ChangeState::Staged,
            backup,
            existed,
            digest: xxh64(contents, 0),
        });
        self.by_path.entry(path.to_string()).or_default().push(position);
        position
    }

    pub fn mark(&mut self, position: usize, state: ChangeState) {
        if let Some(change) = self.changes.get_mut(position) {
            change.state = state;
        }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Every change made to a path, oldest first
    pub fn changes_for(&self, path: &str) -> Vec<&Change> {
        self.by_path
            .get(path)
            .map(|positions| positions.iter().map(|&p| &self.changes[p]).collect())
            .unwrap_or_default()
    }

    /// Positions of written changes, newest first
    pub(crate) fn written_positions_rev(&self) -> Vec<usize> {
        (0..self.changes.len())
            .rev()
            .filter(|&p| self.changes[p].state == ChangeState::Written)
            .collect()
    }

    pub(crate) fn get(&self, position: usize) -> Option<&Change> {
        self.changes.get(position)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_mark() {
        let mut journal = ChangeJournal::new();
        let first = journal.stage(0, Some("icon".into()), "/ui/icon.png", true, Some(b"old".to_vec()), b"new");
        let second = journal.stage(1, None, "/ui/icon.png", true, Some(b"new".to_vec()), b"newer");
        journal.mark(first, ChangeState::Written);

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.changes()[first].state, ChangeState::Written);
        assert_eq!(journal.changes()[second].state, ChangeState::Staged);
        assert_eq!(journal.changes()[first].digest, xxh64(b"new", 0));

        let history = journal.changes_for("/ui/icon.png");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].task_index, 0);
        assert_eq!(history[1].task_index, 1);
        assert!(journal.changes_for("/other").is_empty());
    }

    #[test]
    fn test_written_positions_are_newest_first() {
        let mut journal = ChangeJournal::new();
        for i in 0..3 {
            let p = journal.stage(i, None, &format!("/f{}", i), false, None, b"x");
            if i != 1 {
                journal.mark(p, ChangeState::Written);
            }
        }
        assert_eq!(journal.written_positions_rev(), vec![2, 0]);
    }
}
