//! Change detection against the persisted set of known identities, and
//! deadline window scans.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::deadline::{resolve, sort_key};
use crate::program::Program;

/// Days ahead covered by "deadline approaching" notifications.
pub const NOTIFY_WINDOW_DAYS: i64 = 3;

/// Days ahead covered by the `upcoming` query.
pub const QUERY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub new_programs: Vec<Program>,
    /// Identity set of the whole current catalog; replaces the known set wholesale.
    pub known: HashSet<String>,
}

/// Programs whose identity is not in `known`, plus the full current identity
/// set. A program appearing twice in one snapshot is reported once.
pub fn detect_changes(programs: &[Program], known: &HashSet<String>) -> ChangeSet {
    let mut current = HashSet::with_capacity(programs.len());
    let mut new_programs = Vec::new();

    for program in programs {
        let id = program.identity();
        if current.insert(id.clone()) && !known.contains(&id) {
            new_programs.push(program.clone());
        }
    }

    ChangeSet {
        new_programs,
        known: current,
    }
}

/// Programs whose deadline falls in `(now, now + window]`. Programs without a
/// resolvable deadline are skipped.
pub fn find_upcoming(programs: &[Program], now: DateTime<Utc>, window: Duration) -> Vec<Program> {
    let horizon = now + window;
    programs
        .iter()
        .filter(|program| match resolve(program.deadline_str()) {
            Some(deadline) => deadline > now && deadline <= horizon,
            None => {
                if !program.deadline_str().trim().is_empty() {
                    debug!(
                        program = %program.name,
                        deadline = %program.deadline_str(),
                        "unparseable deadline, treating as none"
                    );
                }
                false
            }
        })
        .cloned()
        .collect()
}

/// Ascending by deadline, unknown deadlines last. Stable for equal keys.
pub fn sort_by_deadline(programs: &mut [Program]) {
    programs.sort_by(|a, b| sort_key(a.deadline_str()).total_cmp(&sort_key(b.deadline_str())));
}
