//! Prometheus endpoint poller
//!
//! The [`Poller`] scrapes a Prometheus text exposition endpoint on a fixed
//! interval, parses each payload with [`crate::exposition::parse`] and
//! forwards the outcome as an [`Event`]. It fires once immediately and then
//! once per interval until its stop signal fires. A failed scrape is reported
//! and retried on the next tick, there is no other backoff.

use std::time::Duration;

use metrics::{counter, gauge};
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    config::{self, Config},
    exposition,
    metric::Metric,
};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Poller`]
pub enum Error {
    /// The request could not be sent or timed out
    #[error("request to {uri} failed: {source}")]
    Request {
        /// The scraped URI
        uri: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-success status
    #[error("{uri} answered with status {status}")]
    Status {
        /// The scraped URI
        uri: String,
        /// The HTTP status received
        status: reqwest::StatusCode,
    },
    /// The response body could not be read as text
    #[error("failed to read response body from {uri}: {source}")]
    Body {
        /// The scraped URI
        uri: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },
    /// The payload is not valid exposition text
    #[error("failed to parse payload: {0}")]
    Parse(#[from] exposition::Error),
    /// The configuration does not describe a pollable endpoint
    #[error("invalid configuration: {0}")]
    Config(#[from] config::Error),
    /// The HTTP client could not be constructed
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// The receiving end of the event channel was dropped
    #[error("event receiver dropped")]
    ReceiverDropped,
}

impl Error {
    /// Short label used for the `reason` of the failure counter.
    fn reason(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request",
            Self::Status { .. } => "status",
            Self::Body { .. } => "body",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::Client(_) => "client",
            Self::ReceiverDropped => "receiver_dropped",
        }
    }
}

#[derive(Debug)]
/// Notifications emitted by [`Poller::run`]
pub enum Event {
    /// A scrape succeeded; carries the full, freshly parsed sequence
    MetricsChanged(Vec<Metric>),
    /// A scrape failed, either fetching or parsing
    ErrorOccurred(Error),
}

/// The `Poller` scrapes one endpoint on an interval.
#[derive(Debug)]
pub struct Poller {
    client: reqwest::Client,
    uri: reqwest::Url,
    poll_interval: Duration,
    stop: promdash_signal::Watcher,
    events: mpsc::Sender<Event>,
}

impl Poller {
    /// Create a new [`Poller`] instance
    ///
    /// Outcomes of each scrape are delivered on `events`. The poller stops
    /// when `stop` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll interval is zero, the URI is not an
    /// absolute http(s) URI or the HTTP client cannot be built.
    pub fn new(
        config: &Config,
        stop: promdash_signal::Watcher,
        events: mpsc::Sender<Event>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let uri = config.endpoint()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            uri,
            poll_interval: config.poll_interval(),
            stop,
            events,
        })
    }

    /// Run this [`Poller`] to completion
    ///
    /// Scrapes immediately and then once per poll interval. Missed ticks are
    /// delayed, never bunched up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReceiverDropped`] if the event receiver goes away.
    /// Scrape failures are delivered as [`Event::ErrorOccurred`] and do not
    /// stop the poller.
    pub async fn run(self) -> Result<(), Error> {
        let Self {
            client,
            uri,
            poll_interval,
            stop,
            events,
        } = self;
        info!("polling {uri} every {poll_interval:?}");

        let shutdown_wait = stop.recv();
        tokio::pin!(shutdown_wait);

        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let outcome = scrape(&client, &uri).await;
                    record_telemetry(&outcome);
                    let event = match outcome {
                        Ok(metrics) => Event::MetricsChanged(metrics),
                        Err(err) => {
                            warn!("scrape failed: {err}");
                            Event::ErrorOccurred(err)
                        }
                    };
                    if events.send(event).await.is_err() {
                        warn!("event receiver dropped, poller exiting");
                        return Err(Error::ReceiverDropped);
                    }
                }
                () = &mut shutdown_wait => {
                    info!("stop signal received");
                    return Ok(());
                }
            }
        }
    }

    /// Perform a single scrape of the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success or
    /// the payload does not parse.
    pub async fn scrape(&self) -> Result<Vec<Metric>, Error> {
        scrape(&self.client, &self.uri).await
    }
}

async fn scrape(client: &reqwest::Client, uri: &reqwest::Url) -> Result<Vec<Metric>, Error> {
    let resp = client
        .get(uri.clone())
        .send()
        .await
        .map_err(|source| Error::Request {
            uri: uri.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Status {
            uri: uri.to_string(),
            status,
        });
    }

    let text = resp.text().await.map_err(|source| Error::Body {
        uri: uri.to_string(),
        source,
    })?;

    let metrics = exposition::parse(&text)?;
    debug!("scraped {} metrics from {uri}", metrics.len());
    Ok(metrics)
}

#[allow(clippy::cast_precision_loss)]
fn record_telemetry(outcome: &Result<Vec<Metric>, Error>) {
    match outcome {
        Ok(metrics) => {
            counter!("promdash.scrape.success").increment(1);
            gauge!("promdash.scrape.records").set(metrics.len() as f64);
        }
        Err(err) => {
            counter!("promdash.scrape.failure", "reason" => err.reason()).increment(1);
        }
    }
}
