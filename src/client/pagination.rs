//! Response envelopes and cursor pagination
//!
//! List endpoints answer `{ "data": [...], "next_page": { "offset": .. } | null }`.
//! [`ApiClient::fetch_all`] follows the `offset` cursor until the server
//! stops sending one and returns every page concatenated in server order.
//! It does not cap the number of pages.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ApiClient, Query};
use crate::error::ApiError;

/// Envelope of a single-resource response
#[derive(Debug, Deserialize)]
pub struct ItemEnvelope<T> {
    /// The resource
    pub data: T,
}

/// Envelope of one page of a list response
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// Cursor to the next page, absent on the last page
    #[serde(default)]
    pub next_page: Option<NextPage>,
}

/// Continuation cursor
#[derive(Debug, Deserialize)]
pub struct NextPage {
    /// Opaque offset token to send with the next request
    pub offset: String,
}

impl<T> ListEnvelope<T> {
    /// The offset to request next, if there are more pages
    pub fn next_offset(&self) -> Option<&str> {
        self.next_page
            .as_ref()
            .map(|next| next.offset.as_str())
            .filter(|offset| !offset.is_empty())
    }
}

impl ApiClient {
    /// Fetch every page of a list endpoint
    ///
    /// The first request carries `limit`; each following request carries the
    /// `offset` from the previous page. Every page is an independent request
    /// through the throttle gate and retry policy. Any page failing fails the
    /// whole list; no partial list is returned.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        fixed_params: &Query<'_>,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut offset: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut query = fixed_params.to_vec();
            query.push(("limit", self.page_limit.to_string()));
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }

            let page: ListEnvelope<T> = self.get(path, &query).await?;
            pages += 1;
            offset = page.next_offset().map(str::to_string);
            items.extend(page.data);

            if offset.is_none() {
                break;
            }
        }

        tracing::debug!(path, pages, items = items.len(), "Fetched all pages");
        Ok(items)
    }

    /// Fetch a single resource
    pub async fn fetch_one<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Query<'_>,
    ) -> Result<T, ApiError> {
        let envelope: ItemEnvelope<T> = self.get(path, params).await?;
        Ok(envelope.data)
    }
}
