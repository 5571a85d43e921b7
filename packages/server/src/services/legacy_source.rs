//! Paged reader over a remote V1/V2 legacy dataset API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use adapter::{LegacyPage, LegacySource, StoreError};

/// Offset-paged `LegacySource` over a remote HTTP API.
///
/// The remote endpoint is expected to answer
/// `GET {base_url}?limit=N&offset=M` with `{"count": _, "results": [...]}`;
/// the cursor is the stringified next offset.
pub struct HttpLegacySource {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

#[derive(Deserialize)]
struct PageBody {
    #[serde(default)]
    results: Vec<Value>,
}

impl HttpLegacySource {
    pub fn new(base_url: String, page_size: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl LegacySource for HttpLegacySource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<LegacyPage, StoreError> {
        let offset: usize = match cursor {
            Some(cursor) => cursor
                .parse()
                .map_err(|_| StoreError::Internal(format!("bad cursor: {cursor}")))?,
            None => 0,
        };

        debug!(offset, limit = self.page_size, "fetching legacy page");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("limit", self.page_size), ("offset", offset)])
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?
            .error_for_status()
            .map_err(|err| StoreError::Network(err.to_string()))?;
        let body: PageBody = response
            .json()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        let next = (body.results.len() == self.page_size)
            .then(|| (offset + self.page_size).to_string());
        Ok(LegacyPage {
            documents: body.results,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_body_tolerates_missing_results() {
        let body: PageBody = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(body.results.is_empty());
    }
}
