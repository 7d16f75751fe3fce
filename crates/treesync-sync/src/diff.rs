//! Manifest comparison and the sync-required decision

use std::fmt;
use tracing::debug;
use treesync_types::{ActionKind, Manifest, SyncAction};

/// Compare a source manifest against a target manifest
///
/// Names only in `source` become [`SyncAction::Add`], names only in `target`
/// become [`SyncAction::Missing`], and names in both become
/// [`SyncAction::Modify`] when checksum, size, modification time or
/// permissions differ. Actions are returned sorted by name.
pub fn diff(source: &Manifest, target: &Manifest) -> Vec<SyncAction> {
    let mut actions = Vec::new();

    for source_record in source {
        match target.get(&source_record.name) {
            Some(target_record) => {
                if source_record.differs_from(target_record) {
                    actions.push(SyncAction::Modify {
                        source: source_record.clone(),
                        target: target_record.clone(),
                    });
                }
            }
            None => actions.push(SyncAction::Add {
                source: source_record.clone(),
            }),
        }
    }

    for target_record in target {
        if !source.contains(&target_record.name) {
            actions.push(SyncAction::Missing {
                target: target_record.clone(),
            });
        }
    }

    actions.sort_by(|a, b| a.name().cmp(b.name()));
    debug!("Detected {} actions", actions.len());
    actions
}

/// Decide whether an action set requires any filesystem work
///
/// `Add` and `Modify` always do; `Missing` only when deletion is enabled.
pub fn is_sync_required(delete_missing: bool, actions: &[SyncAction]) -> bool {
    actions.iter().any(|action| match action.kind() {
        ActionKind::Add | ActionKind::Modify => true,
        ActionKind::Missing => delete_missing,
    })
}

/// Per-kind action counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of `Add` actions
    pub added: usize,
    /// Number of `Modify` actions
    pub modified: usize,
    /// Number of `Missing` actions
    pub missing: usize,
}

impl DiffSummary {
    /// Count actions by kind
    pub fn from_actions(actions: &[SyncAction]) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action.kind() {
                ActionKind::Add => summary.added += 1,
                ActionKind::Modify => summary.modified += 1,
                ActionKind::Missing => summary.missing += 1,
            }
        }
        summary
    }

    /// Total number of actions
    pub fn total(&self) -> usize {
        self.added + self.modified + self.missing
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to add, {} to modify, {} missing",
            self.added, self.modified, self.missing
        )
    }
}
