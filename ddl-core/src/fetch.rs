use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::catalog::CatalogDocument;
use crate::error::FetchError;

/// A fetched remote document: the raw bytes (mirrored to the cache as-is)
/// and their decoded form.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub raw: Vec<u8>,
    pub document: CatalogDocument,
}

pub async fn fetch_document(client: &Client, url: &str) -> Result<RemoteDocument, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status));
    }
    let raw = response.bytes().await?.to_vec();
    let document = CatalogDocument::from_slice(&raw)?;
    debug!(url, bytes = raw.len(), sources = document.0.len(), "fetched remote catalog");
    Ok(RemoteDocument { raw, document })
}
