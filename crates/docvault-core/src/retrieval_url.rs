//! Retrieval URLs: `{base}/{session_id}/{document_id}`.
//!
//! The storage key never appears in a URL; a serve or delete request that only
//! carries the URL is resolved back to the (session, document) pair.

use crate::error::AppError;
use uuid::Uuid;

/// Parsed retrieval URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalUrl {
    pub session_id: Uuid,
    pub document_id: i64,
}

/// Builds and parses retrieval URLs under a fixed base path.
#[derive(Debug, Clone)]
pub struct RetrievalUrlBuilder {
    base_path: String,
}

impl RetrievalUrlBuilder {
    pub fn new(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn build(&self, session_id: Uuid, document_id: i64) -> String {
        format!("{}/{}/{}", self.base_path, session_id, document_id)
    }

    /// Parse a URL produced by [`build`](Self::build). Query strings and
    /// fragments are ignored.
    pub fn parse(&self, url: &str) -> Result<RetrievalUrl, AppError> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');

        let rest = path
            .strip_prefix(self.base_path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Retrieval URL must start with {}/",
                    self.base_path
                ))
            })?;

        let mut segments = rest.split('/');
        let (Some(session), Some(document), None) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(AppError::InvalidInput(
                "Retrieval URL must be {base}/{session_id}/{document_id}".to_string(),
            ));
        };

        let session_id = Uuid::parse_str(session)?;
        let document_id = document.parse::<i64>().map_err(|e| {
            AppError::InvalidInput(format!("Invalid document id '{}': {}", document, e))
        })?;

        Ok(RetrievalUrl {
            session_id,
            document_id,
        })
    }
}
