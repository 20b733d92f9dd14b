//! Plain-text rendering of programs for notifications and command replies.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::deadline::remaining_label;
use crate::detect::NOTIFY_WINDOW_DAYS;
use crate::program::Program;

/// Entries shown in a single notification message.
pub const NOTIFY_DISPLAY_CAP: usize = 5;

/// Entries shown in a detail disambiguation list.
pub const DISAMBIGUATION_CAP: usize = 5;

fn join_tags(program: &Program) -> String {
    program
        .tags
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Multi-line summary of one program.
pub fn program_summary(program: &Program, now: DateTime<Utc>) -> String {
    let mut text = format!("[{} - {}]\n", program.name, program.institute);
    let _ = writeln!(text, "Description: {}", program.description);
    let _ = writeln!(
        text,
        "Deadline: {}",
        remaining_label(program.deadline_str(), now)
    );
    let _ = writeln!(text, "Website: {}", program.website);
    if !program.tags.is_empty() {
        let _ = writeln!(text, "Tags: {}", join_tags(program));
    }
    text
}

/// Numbered summaries, at most `cap` of them.
pub fn numbered(programs: &[&Program], cap: usize, now: DateTime<Utc>) -> String {
    let mut text = String::new();
    for (i, program) in programs.iter().take(cap).enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, program_summary(program, now));
    }
    text
}

/// `None` when there is nothing to announce.
pub fn new_programs_message(programs: &[&Program], now: DateTime<Utc>) -> Option<String> {
    if programs.is_empty() {
        return None;
    }
    let mut message = String::from("New programs have been published!\n\n");
    message.push_str(&numbered(programs, NOTIFY_DISPLAY_CAP, now));
    if programs.len() > NOTIFY_DISPLAY_CAP {
        let _ = write!(
            message,
            "\n...{} new programs in total. Use `list` to see more.",
            programs.len()
        );
    }
    Some(message)
}

/// `None` when there is nothing to announce.
pub fn upcoming_message(programs: &[&Program], now: DateTime<Utc>) -> Option<String> {
    if programs.is_empty() {
        return None;
    }
    let mut message = format!(
        "The following programs close within {NOTIFY_WINDOW_DAYS} days!\n\n"
    );
    message.push_str(&numbered(programs, NOTIFY_DISPLAY_CAP, now));
    if programs.len() > NOTIFY_DISPLAY_CAP {
        let _ = write!(
            message,
            "\n...{} programs closing soon in total. Use `upcoming` to see more.",
            programs.len()
        );
    }
    Some(message)
}

pub fn program_detail(program: &Program, now: DateTime<Utc>) -> String {
    let mut text = String::from("== Program detail ==\n");
    let _ = writeln!(text, "Name: {}", program.name);
    let _ = writeln!(text, "Institute: {}", program.institute);
    let _ = writeln!(text, "Description: {}", program.description);
    let _ = writeln!(
        text,
        "Deadline: {} ({})",
        program.deadline_str(),
        remaining_label(program.deadline_str(), now)
    );
    let _ = writeln!(text, "Website: {}", program.website);
    if !program.tags.is_empty() {
        let _ = write!(text, "Tags: {}", join_tags(program));
    }
    text
}

/// Short `name - institute` list used when a keyword is ambiguous.
pub fn disambiguation(keyword: &str, programs: &[Program]) -> String {
    let mut text = format!(
        "Found {} programs matching '{}', please use a more specific keyword:\n\n",
        programs.len(),
        keyword
    );
    for (i, program) in programs.iter().take(DISAMBIGUATION_CAP).enumerate() {
        let _ = writeln!(text, "{}. {} - {}", i + 1, program.name, program.institute);
    }
    if programs.len() > DISAMBIGUATION_CAP {
        let _ = write!(text, "... {} programs in total", programs.len());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::resolve;

    fn program(i: usize) -> Program {
        Program {
            name: format!("University {i}"),
            institute: "School of CS".into(),
            description: "Summer camp".into(),
            deadline: Some("2025-03-03T00:00:00Z".into()),
            website: "https://example.com".into(),
            tags: ["985".to_string(), "CS".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn summary_contains_fields_and_remaining_time() {
        let now = resolve("2025-03-01T00:00:00Z").unwrap();
        let text = program_summary(&program(1), now);
        assert!(text.starts_with("[University 1 - School of CS]\n"));
        assert!(text.contains("Deadline: 2 days 0 hours remaining"));
        assert!(text.contains("Tags: 985, CS"));
    }

    #[test]
    fn empty_categories_produce_no_message() {
        let now = Utc::now();
        assert!(new_programs_message(&[], now).is_none());
        assert!(upcoming_message(&[], now).is_none());
    }

    #[test]
    fn messages_are_capped_with_true_count() {
        let now = resolve("2025-03-01T00:00:00Z").unwrap();
        let programs: Vec<Program> = (1..=7).map(program).collect();
        let refs: Vec<&Program> = programs.iter().collect();

        let message = new_programs_message(&refs, now).unwrap();
        assert!(message.contains("5. [University 5"));
        assert!(!message.contains("University 6"));
        assert!(message.contains("...7 new programs in total"));

        let short = upcoming_message(&refs[..2], now).unwrap();
        assert!(!short.contains("in total"));
    }

    #[test]
    fn disambiguation_lists_names_only() {
        let programs: Vec<Program> = (1..=6).map(program).collect();
        let text = disambiguation("univ", &programs);
        assert!(text.contains("Found 6 programs matching 'univ'"));
        assert!(text.contains("5. University 5 - School of CS"));
        assert!(!text.contains("6. University 6"));
        assert!(text.ends_with("... 6 programs in total"));
    }
}
