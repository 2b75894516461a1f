//! HTTP implementation of [`RemoteFetch`].

use crate::error::StoreError;
use crate::store::params::RequestParams;
use crate::store::remote::{FetchResponse, RemoteFetch, ResponseFields};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Sends each request as a GET with the parameters in the query string
pub struct HttpFetch {
    client: reqwest::Client,
    fields: ResponseFields,
}

impl HttpFetch {
    pub fn new(fields: ResponseFields, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            fields,
        })
    }

    pub fn fields(&self) -> &ResponseFields {
        &self.fields
    }
}

#[async_trait]
impl RemoteFetch for HttpFetch {
    async fn fetch(
        &self,
        url: &str,
        params: &RequestParams,
    ) -> Result<FetchResponse, StoreError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        debug!(url, status = %response.status(), "HTTP fetch completed");
        let body: Value = response.json().await?;
        FetchResponse::from_body(&body, &self.fields)
    }
}
