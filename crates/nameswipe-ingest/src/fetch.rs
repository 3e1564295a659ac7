//! Streaming dataset download

use std::io;
use std::time::Duration;

use futures::{Stream, TryStreamExt};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::reassembler::LineReassembler;

/// Build the HTTP client shared by all runs of an orchestrator
pub fn build_client(config: &IngestConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("nameswipe-ingest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.connect_timeout)
        .build()?;
    Ok(client)
}

/// GET `url` and return its body as a stream of complete lines.
///
/// Waiting for the response headers is bounded by `idle_timeout`; reads from
/// the returned stream are not, the caller bounds each one. Non-2xx responses
/// are errors.
pub async fn open_lines(
    client: &reqwest::Client,
    url: &str,
    idle_timeout: Duration,
) -> Result<impl Stream<Item = io::Result<String>> + Send> {
    let response = tokio::time::timeout(idle_timeout, client.get(url).send())
        .await
        .map_err(|_| IngestError::IdleTimeout(idle_timeout))??;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::HttpStatus {
            status,
            url: url.to_string(),
        });
    }

    debug!(
        url = %url,
        content_length = ?response.content_length(),
        "Opened dataset stream"
    );

    let body = response.bytes_stream().map_err(io::Error::other);
    Ok(FramedRead::new(StreamReader::new(body), LineReassembler::new()))
}
