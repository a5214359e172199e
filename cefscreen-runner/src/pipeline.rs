//! Refresh pipeline: wires together builder, client, merger and formatter.
//!
//! Two entry points, one per failure point of the dashboard:
//! - `refresh()`: build the screen request, execute it, merge, format.
//! - `reload_groups()`: run the group-discovery request.
//!
//! Everything runs on the calling thread; the client call blocks.

use cefscreen_core::client::{ClientError, QueryClient};
use cefscreen_core::request::Request;
use polars::prelude::DataFrame;
use thiserror::Error;

use crate::format::GridSpec;
use crate::merge::ResultTable;
use crate::screen::{QueryBuilder, ScreenParams};

/// Errors from a screen refresh or a group reload.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("no securities matched the screen")]
    EmptyResponse,
    #[error("result conversion failed: {0}")]
    Format(String),
}

/// A successful refresh: the request that was sent and the rendered grid.
#[derive(Debug, Clone)]
pub struct ScreenOutcome {
    pub request: Request,
    pub grid: GridSpec,
}

impl ScreenOutcome {
    pub fn table(&self) -> &ResultTable {
        &self.grid.table
    }

    pub fn to_dataframe(&self) -> Result<DataFrame, ScreenError> {
        self.grid
            .table
            .to_dataframe()
            .map_err(|e| ScreenError::Format(e.to_string()))
    }
}

/// Runs screen and group-discovery requests through a [`QueryClient`] and
/// shapes the answers for display.
pub struct Screener<C> {
    client: C,
    builder: QueryBuilder,
}

impl<C: QueryClient> Screener<C> {
    pub fn new(client: C, builder: QueryBuilder) -> Self {
        Self { client, builder }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// The request `refresh` would send, without sending it.
    pub fn screen_request(&self, params: &ScreenParams) -> Request {
        self.builder.request(params)
    }

    pub fn refresh(&self, params: &ScreenParams) -> Result<ScreenOutcome, ScreenError> {
        let request = self.screen_request(params);
        self.run(request)
    }

    /// Execute an already-built screen request.
    pub fn run(&self, request: Request) -> Result<ScreenOutcome, ScreenError> {
        tracing::info!(
            client = self.client.name(),
            fingerprint = %request.fingerprint(),
            "executing screen request"
        );
        let frames = self.client.execute(&request)?;
        let table = ResultTable::merge(&frames);
        if table.is_empty() {
            return Err(ScreenError::EmptyResponse);
        }
        let grid = GridSpec::build(table);
        Ok(ScreenOutcome { request, grid })
    }

    /// Main-group values currently carried by any fund, sorted.
    pub fn reload_groups(&self) -> Result<Vec<String>, ScreenError> {
        let request = self.builder.group_discovery();
        tracing::info!(client = self.client.name(), "executing group discovery");
        let frames = self.client.execute(&request)?;
        let frame = frames.first().ok_or(ScreenError::EmptyResponse)?;
        let mut groups: Vec<String> = frame.keys().map(String::from).collect();
        groups.sort();
        groups.dedup();
        tracing::debug!(groups = groups.len(), "group discovery finished");
        Ok(groups)
    }
}
