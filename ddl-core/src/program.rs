use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Separator between the fields that make up a program identity.
const IDENTITY_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Program {
    /// Stable dedup key. Deadline, website and tags are deliberately left out,
    /// so two offerings differing only in those collapse to one identity.
    pub fn identity(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.name,
            self.institute,
            self.description,
            sep = IDENTITY_SEPARATOR
        )
    }

    /// Raw deadline text, empty when the source did not provide one.
    pub fn deadline_str(&self) -> &str {
        self.deadline.as_deref().unwrap_or_default()
    }

    /// OR match: any shared tag is enough, and an empty filter matches everything.
    pub fn matches_any<'a, I>(&self, filter: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut filter = filter.into_iter().peekable();
        if filter.peek().is_none() {
            return true;
        }
        filter.any(|tag| self.tags.contains(tag))
    }

    /// Case-insensitive substring match on name or institute.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.name.to_lowercase().contains(&keyword)
            || self.institute.to_lowercase().contains(&keyword)
    }
}

/// Splits a comma separated tag list, trimming whitespace and dropping empties.
pub fn parse_tag_filter(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
