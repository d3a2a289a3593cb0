//! Vocabulary loading from files, strings, and HTTP URLs.
//!
//! Loading is the only fallible step before the engine runs: a failure here
//! means no graph, and the engine must not be called.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;
use crate::index::Vocabulary;
use crate::types::VocabularyGraph;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Latest schema.org release as JSON-LD.
pub const SCHEMA_ORG_URL: &str = "https://schema.org/version/latest/schemaorg-current-https.jsonld";

/// Timeout for HTTP requests. The full vocabulary is several megabytes.
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Load a JSON-LD document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON-LD document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON-LD document from an HTTP/HTTPS URL.
///
/// One attempt only; there is no retry.
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, the server answers
/// with an error status, or the body isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    tracing::info!(url, "fetching vocabulary");

    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network_error)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a JSON-LD document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Parse a loaded document into an indexed vocabulary.
///
/// # Errors
///
/// Returns `LoadError::MissingGraph`, `LoadError::InvalidRecord`, or
/// `LoadError::Index` if the graph cannot be indexed.
pub fn vocabulary_from_document(document: &Value) -> Result<Vocabulary, LoadError> {
    let graph = VocabularyGraph::from_document(document)?;
    let vocabulary = Vocabulary::new(graph)?;
    tracing::info!(records = vocabulary.graph().len(), "vocabulary loaded");
    Ok(vocabulary)
}

/// Load, parse and index a vocabulary from a file path or URL.
///
/// # Errors
///
/// Any `LoadError`; the vocabulary is unusable on failure.
pub fn load_vocabulary(source: &str) -> Result<Vocabulary, LoadError> {
    let document = load_document_auto(source)?;
    vocabulary_from_document(&document)
}
