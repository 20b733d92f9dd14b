//! Query and subscription commands consumed by a chat front-end. Each
//! command returns the reply text; transport is the caller's business.

use std::fmt::Write as _;

use chrono::{Duration, Utc};
use tracing::info;

use crate::detect::{find_upcoming, sort_by_deadline, QUERY_WINDOW_DAYS};
use crate::engine::Engine;
use crate::error::CommandError;
use crate::program::{parse_tag_filter, Program};
use crate::render::{disambiguation, numbered, program_detail};
use crate::subscriptions::TagFilter;

#[derive(Clone)]
pub struct Commands {
    engine: Engine,
}

impl Commands {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    fn display_limit(&self) -> usize {
        self.engine.config().max_display_items
    }

    fn listing(&self, header: String, programs: &[Program], overflow: &str) -> String {
        let limit = self.display_limit();
        let refs: Vec<&Program> = programs.iter().collect();
        let mut text = header;
        text.push_str(&numbered(&refs, limit, Utc::now()));
        if programs.len() > limit {
            let _ = write!(
                text,
                "\nFound {} programs, showing the first {}. {}",
                programs.len(),
                limit,
                overflow
            );
        }
        text
    }

    /// Subscribes with an optional comma separated tag filter. Every tag must
    /// exist somewhere in the catalog.
    pub async fn subscribe(&self, subscriber: &str, tags: Option<&str>) -> Result<String, CommandError> {
        let requested = parse_tag_filter(tags);
        if !requested.is_empty() {
            let known_tags = self.engine.catalog().await.all_tags();
            let invalid: Vec<String> = requested
                .iter()
                .filter(|tag| !known_tags.contains(*tag))
                .cloned()
                .collect();
            if !invalid.is_empty() {
                return Err(CommandError::InvalidTags(invalid));
            }
        }

        let filter: TagFilter = requested.into_iter().collect();
        let reply = if filter.is_empty() {
            "Subscribed, you will receive every notification.".to_string()
        } else {
            format!("Subscribed with tag filter: {}", join(&filter))
        };
        self.engine.subscriptions().subscribe(subscriber, filter).await;
        info!(subscriber, "subscription updated");
        Ok(reply)
    }

    pub async fn unsubscribe(&self, subscriber: &str) -> String {
        if self.engine.subscriptions().unsubscribe(subscriber).await {
            info!(subscriber, "subscription removed");
            "Unsubscribed from notifications.".to_string()
        } else {
            "You are not subscribed.".to_string()
        }
    }

    pub async fn status(&self, subscriber: &str) -> String {
        match self.engine.subscriptions().status_of(subscriber).await {
            Some(tags) if tags.is_empty() => "You are subscribed to every program.".to_string(),
            Some(tags) => format!("You are subscribed with tag filter: {}", join(&tags)),
            None => "You are not subscribed.".to_string(),
        }
    }

    pub async fn list(&self, tag: Option<&str>) -> Result<String, CommandError> {
        let catalog = self.engine.catalog().await;
        let (source, _) = catalog.default_programs()?;
        let programs = catalog.query_default(tag);
        if programs.is_empty() {
            return Ok("No programs match the given filter.".to_string());
        }

        let mut header = format!("== Programs ==\nSource: {source}\n");
        if let Some(tags) = shown_filter(tag) {
            let _ = writeln!(header, "Tag filter: {tags}");
        }
        header.push('\n');
        Ok(self.listing(header, &programs, "Use a more specific tag filter."))
    }

    pub async fn sources(&self) -> String {
        let catalog = self.engine.catalog().await;
        if catalog.is_empty() {
            return "No sources available.".to_string();
        }
        let mut text = String::from("Available sources:\n");
        for (name, count) in catalog.sources() {
            let _ = writeln!(text, "- {name}: {count} programs");
        }
        let _ = write!(
            text,
            "\nDefault source: {}",
            catalog.default_name().unwrap_or("none")
        );
        text
    }

    pub async fn set_default_source(&self, name: &str) -> Result<String, CommandError> {
        self.engine.set_default_source(name).await?;
        Ok(format!("Default source set to: {name}"))
    }

    pub async fn tags(&self) -> Result<String, CommandError> {
        let catalog = self.engine.catalog().await;
        let (source, _) = catalog.default_programs()?;
        let tags = catalog.tags_of(source);
        if tags.is_empty() {
            return Ok(format!("Source '{source}' defines no tags."));
        }
        Ok(format!("All tags in source '{source}':\n{}", join(&tags)))
    }

    /// Programs closing within the next 30 days, soonest first.
    pub async fn upcoming(&self, tag: Option<&str>) -> Result<String, CommandError> {
        let catalog = self.engine.catalog().await;
        let (source, _) = catalog.default_programs()?;
        let filtered = catalog.query_default(tag);
        let mut programs = find_upcoming(&filtered, Utc::now(), Duration::days(QUERY_WINDOW_DAYS));
        sort_by_deadline(&mut programs);

        if programs.is_empty() {
            let mut text = format!("No programs close within {QUERY_WINDOW_DAYS} days");
            if let Some(tags) = shown_filter(tag) {
                let _ = write!(text, " (tags: {tags})");
            }
            return Ok(text);
        }

        let mut header = format!("== Programs closing within {QUERY_WINDOW_DAYS} days ==\nSource: {source}\n");
        if let Some(tags) = shown_filter(tag) {
            let _ = writeln!(header, "Tag filter: {tags}");
        }
        header.push('\n');
        Ok(self.listing(header, &programs, "Narrow it down with a tag filter."))
    }

    pub async fn manual_update(&self) -> String {
        match self.engine.refresh_catalog().await {
            Ok(_) => "Program data updated.".to_string(),
            Err(_) => "Update failed, please try again later or check the network.".to_string(),
        }
    }

    /// Full detail when exactly one program matches the keyword.
    pub async fn detail(&self, keyword: &str) -> Result<String, CommandError> {
        let matches = self.engine.catalog().await.search_default(keyword)?;
        Ok(match matches.as_slice() {
            [] => format!("No program matches '{}'.", keyword.trim()),
            [program] => program_detail(program, Utc::now()),
            _ => disambiguation(keyword.trim(), &matches),
        })
    }

    pub async fn search(&self, keyword: &str) -> Result<String, CommandError> {
        let catalog = self.engine.catalog().await;
        let matches = catalog.search_default(keyword)?;
        let keyword = keyword.trim().to_lowercase();
        if matches.is_empty() {
            return Ok(format!("No program matches '{keyword}'."));
        }

        let source = catalog.default_name().unwrap_or_default();
        let header = format!(
            "== Search results: '{keyword}' ==\nSource: {source}\nFound {} matching programs\n\n",
            matches.len()
        );
        Ok(self.listing(header, &matches, "Try a more specific keyword."))
    }
}

/// The filter as it was applied, `None` when it selects everything.
fn shown_filter(raw: Option<&str>) -> Option<String> {
    let tags = parse_tag_filter(raw);
    (!tags.is_empty()).then(|| tags.join(", "))
}

fn join(tags: &TagFilter) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
