use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::CommandError;
use crate::program::{parse_tag_filter, Program};

/// One named dataset inside the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub programs: Vec<Program>,
}

/// Remote document shape: `{ "<source>": [Program, ...], ... }`, decoded in
/// document order so the first source is well defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDocument(pub Vec<Source>);

impl<'de> Deserialize<'de> for CatalogDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = CatalogDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping source names to program arrays")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut sources: Vec<Source> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, programs)) = map.next_entry::<String, Vec<Program>>()? {
                    sources.retain(|existing| existing.name != name);
                    sources.push(Source { name, programs });
                }
                Ok(CatalogDocument(sources))
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

impl CatalogDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    sources: Vec<Source>,
    default_source: Option<String>,
    /// Set once any document has been installed, even an empty one.
    loaded: bool,
}

pub type SharedCatalog = Arc<RwLock<Catalog>>;

pub fn shared_catalog(initial: Catalog) -> SharedCatalog {
    Arc::new(RwLock::new(initial))
}

impl Catalog {
    pub fn from_document(document: CatalogDocument) -> Self {
        let mut catalog = Self::default();
        catalog.replace_from(document);
        catalog
    }

    /// Swaps in a new set of sources. A default that is still present is kept,
    /// otherwise the first source becomes the default.
    pub fn replace_from(&mut self, document: CatalogDocument) {
        self.sources = document.0;
        self.loaded = true;
        let still_valid = self
            .default_source
            .as_deref()
            .map(|name| self.source(name).is_some())
            .unwrap_or(false);
        if !still_valid {
            self.default_source = self.sources.first().map(|s| s.name.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn source(&self, name: &str) -> Option<&[Program]> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.programs.as_slice())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_source.as_deref()
    }

    /// Programs of the default source, erroring when nothing is loaded.
    pub fn default_programs(&self) -> Result<(&str, &[Program]), CommandError> {
        let name = self.default_name().ok_or(CommandError::NoDefaultSource)?;
        let programs = self.source(name).ok_or(CommandError::NoDefaultSource)?;
        Ok((name, programs))
    }

    /// Default-source programs matching any tag in the comma separated filter.
    pub fn query_default(&self, tag_filter: Option<&str>) -> Vec<Program> {
        let tags = parse_tag_filter(tag_filter);
        match self.default_programs() {
            Ok((_, programs)) => programs
                .iter()
                .filter(|p| p.matches_any(&tags))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Default-source programs whose name or institute contains the keyword.
    pub fn search_default(&self, keyword: &str) -> Result<Vec<Program>, CommandError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CommandError::EmptyKeyword);
        }
        let (_, programs) = self.default_programs()?;
        Ok(programs
            .iter()
            .filter(|p| p.matches_keyword(keyword))
            .cloned()
            .collect())
    }

    pub fn sources(&self) -> Vec<(String, usize)> {
        self.sources
            .iter()
            .map(|s| (s.name.clone(), s.programs.len()))
            .collect()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), CommandError> {
        if self.source(name).is_none() {
            return Err(CommandError::UnknownSource {
                name: name.to_string(),
                available: self.source_names(),
            });
        }
        self.default_source = Some(name.to_string());
        Ok(())
    }

    pub fn tags_of(&self, source: &str) -> BTreeSet<String> {
        self.source(source)
            .map(|programs| {
                programs
                    .iter()
                    .flat_map(|p| p.tags.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tags across every source, used to validate subscriptions.
    pub fn all_tags(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .flat_map(|s| s.programs.iter())
            .flat_map(|p| p.tags.iter().cloned())
            .collect()
    }

    /// Union of all sources' programs, in source order.
    pub fn all_programs(&self) -> Vec<Program> {
        self.sources
            .iter()
            .flat_map(|s| s.programs.iter().cloned())
            .collect()
    }
}

/// Reads the mirrored remote document. Returns the decoded sources and the
/// file's modification time, or `None` when there is no usable cache.
pub async fn load_cache(path: &Path) -> Option<(CatalogDocument, SystemTime)> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no catalog cache, waiting for first remote fetch");
            return None;
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to read catalog cache");
            return None;
        }
    };

    let document = match CatalogDocument::from_slice(&bytes) {
        Ok(document) => document,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "catalog cache is corrupt, ignoring it");
            return None;
        }
    };

    let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "cache mtime unavailable");
            SystemTime::UNIX_EPOCH
        }
    };

    info!(sources = document.0.len(), "loaded catalog from local cache");
    Some((document, modified))
}
