use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::DeliveryError;
use crate::program::Program;
use crate::render::{new_programs_message, upcoming_message};
use crate::subscriptions::{SubscriptionMap, TagFilter};

/// Outbound message transport: hands finished text to a recipient handle.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, recipient: &str, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub recipient: String,
    pub text: String,
    /// Identities announced as closing soon by this message; empty for the
    /// new-programs message.
    pub reminders: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Closing-soon announcements already delivered, per subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderLog {
    sent: HashSet<(String, String)>,
}

impl ReminderLog {
    pub fn contains(&self, subscriber: &str, identity: &str) -> bool {
        self.sent
            .contains(&(subscriber.to_string(), identity.to_string()))
    }

    pub fn record<'a>(&mut self, subscriber: &str, identities: impl IntoIterator<Item = &'a String>) {
        for identity in identities {
            self.sent.insert((subscriber.to_string(), identity.clone()));
        }
    }

    /// Forgets programs that left the window and subscribers that are gone.
    pub fn retain_current(&mut self, upcoming: &[Program], subscribers: &SubscriptionMap) {
        let in_window: HashSet<String> = upcoming.iter().map(Program::identity).collect();
        self.sent.retain(|(subscriber, identity)| {
            subscribers.contains_key(subscriber) && in_window.contains(identity)
        });
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

fn select<'a>(programs: &'a [Program], filter: &TagFilter) -> Vec<&'a Program> {
    programs.iter().filter(|p| p.matches_any(filter)).collect()
}

/// Builds up to two messages per subscriber (new, upcoming). Categories with
/// no matching programs yield nothing, and closing-soon programs already
/// delivered to a subscriber are left out of its reminder.
pub fn plan(
    new_programs: &[Program],
    upcoming: &[Program],
    subscribers: &SubscriptionMap,
    reminded: &ReminderLog,
    now: DateTime<Utc>,
) -> Vec<Outgoing> {
    let mut outgoing = Vec::new();
    for (recipient, filter) in subscribers {
        if let Some(text) = new_programs_message(&select(new_programs, filter), now) {
            outgoing.push(Outgoing {
                recipient: recipient.clone(),
                text,
                reminders: Vec::new(),
            });
        }

        let pending: Vec<&Program> = select(upcoming, filter)
            .into_iter()
            .filter(|p| !reminded.contains(recipient, &p.identity()))
            .collect();
        if let Some(text) = upcoming_message(&pending, now) {
            outgoing.push(Outgoing {
                recipient: recipient.clone(),
                text,
                reminders: pending.iter().map(|p| p.identity()).collect(),
            });
        }
    }
    outgoing
}

/// Sends every planned message. A failed delivery is logged and does not
/// stop delivery to anyone else; its reminders stay pending for the next pass.
pub async fn dispatch(
    new_programs: &[Program],
    upcoming: &[Program],
    subscribers: &SubscriptionMap,
    reminded: &mut ReminderLog,
    sink: &dyn Deliver,
    now: DateTime<Utc>,
) -> DispatchReport {
    reminded.retain_current(upcoming, subscribers);

    let mut report = DispatchReport::default();
    for message in plan(new_programs, upcoming, subscribers, reminded, now) {
        match sink.deliver(&message.recipient, &message.text).await {
            Ok(()) => {
                info!(subscriber = %message.recipient, "notification delivered");
                reminded.record(&message.recipient, &message.reminders);
                report.delivered += 1;
            }
            Err(err) => {
                warn!(subscriber = %message.recipient, error = %err, "notification delivery failed");
                report.failed += 1;
            }
        }
    }
    debug!(reminded = reminded.len(), "reminder log updated");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(name: &str, tags: &[&str]) -> Program {
        Program {
            name: name.into(),
            institute: "CS".into(),
            description: "camp".into(),
            deadline: None,
            website: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn subscribers(entries: &[(&str, &[&str])]) -> SubscriptionMap {
        entries
            .iter()
            .map(|(who, tags)| (who.to_string(), tags.iter().map(|t| t.to_string()).collect()))
            .collect()
    }

    #[test]
    fn reminders_already_sent_are_left_out_per_subscriber() {
        let upcoming = vec![program("A", &["AI"]), program("B", &["Sys"])];
        let subs = subscribers(&[("alice", &[]), ("bob", &[])]);
        let mut log = ReminderLog::default();
        log.record("alice", &[upcoming[0].identity()]);

        let planned = plan(&[], &upcoming, &subs, &log, Utc::now());
        assert_eq!(planned.len(), 2);

        let alice = planned.iter().find(|m| m.recipient == "alice").unwrap();
        assert_eq!(alice.reminders, vec![upcoming[1].identity()]);
        let bob = planned.iter().find(|m| m.recipient == "bob").unwrap();
        assert_eq!(bob.reminders.len(), 2);
    }

    #[test]
    fn fully_reminded_subscriber_gets_no_upcoming_message() {
        let upcoming = vec![program("A", &[])];
        let subs = subscribers(&[("alice", &[])]);
        let mut log = ReminderLog::default();
        log.record("alice", &[upcoming[0].identity()]);

        assert!(plan(&[], &upcoming, &subs, &log, Utc::now()).is_empty());
    }

    #[test]
    fn log_forgets_departed_programs_and_subscribers() {
        let a = program("A", &[]);
        let b = program("B", &[]);
        let mut log = ReminderLog::default();
        log.record("alice", &[a.identity(), b.identity()]);
        log.record("gone", &[a.identity()]);

        log.retain_current(&[a.clone()], &subscribers(&[("alice", &[])]));
        assert!(log.contains("alice", &a.identity()));
        assert!(!log.contains("alice", &b.identity()));
        assert!(!log.contains("gone", &a.identity()));
        assert_eq!(log.len(), 1);
    }
}
