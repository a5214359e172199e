//! HTTP/JSON client for a hosted query service.
//!
//! Protocol: `POST {endpoint}` with the query text, the ordered field names,
//! the execution options and the as-of date. The service replies with one
//! result per field (`field`, `index`, `values`) or with `{"error": ...}`.

use super::{check_shape, ClientError, QueryClient};
use crate::expr::Fill;
use crate::frame::{Cell, FieldFrame};
use crate::request::{Mode, Request};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    query: String,
    fields: Vec<&'a str>,
    options: WireOptions,
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    fill: Option<Fill>,
    mode: Mode,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    results: Option<Vec<WireResult>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    field: String,
    index: Vec<String>,
    values: Vec<Cell>,
}

pub struct HttpQueryClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpQueryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Remote(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn wire_request<'a>(request: &'a Request) -> WireRequest<'a> {
        WireRequest {
            query: request.to_query_string(),
            fields: request.field_names(),
            options: WireOptions {
                fill: request.options.fill,
                mode: request.options.mode,
            },
            as_of: request.as_of,
        }
    }

    /// Decode a response body into frames, validating its shape against the
    /// request.
    fn parse_response(request: &Request, body: &str) -> Result<Vec<FieldFrame>, ClientError> {
        let resp: WireResponse = serde_json::from_str(body)
            .map_err(|e| ClientError::MalformedResponse(format!("invalid JSON: {e}")))?;

        if let Some(message) = resp.error {
            return Err(ClientError::Remote(message));
        }
        let results = resp
            .results
            .ok_or_else(|| ClientError::MalformedResponse("no results and no error".into()))?;

        let mut frames = Vec::with_capacity(results.len());
        for result in results {
            if result.index.len() != result.values.len() {
                return Err(ClientError::MalformedResponse(format!(
                    "field '{}': {} index entries but {} values",
                    result.field,
                    result.index.len(),
                    result.values.len()
                )));
            }
            let mut frame = FieldFrame::new(result.field);
            for (key, cell) in result.index.into_iter().zip(result.values) {
                frame.push(key, cell);
            }
            frames.push(frame);
        }
        check_shape(request, &frames)?;
        Ok(frames)
    }
}

impl QueryClient for HttpQueryClient {
    fn name(&self) -> &str {
        "http"
    }

    fn execute(&self, request: &Request) -> Result<Vec<FieldFrame>, ClientError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            fingerprint = %request.fingerprint(),
            "POST query"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&Self::wire_request(request))
            .send()
            .map_err(|e| ClientError::Remote(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| ClientError::Remote(format!("reading response body: {e}")))?;

        if !status.is_success() {
            // The service may still explain itself in the JSON body.
            let detail = serde_json::from_str::<WireResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(ClientError::Remote(format!("HTTP {status}: {detail}")));
        }

        Self::parse_response(request, &body)
    }
}
