#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use bon::Builder;
use url::Url;

use crate::error::Error;

const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 8 * 1024;
const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;
const DEFAULT_PATH: &str = "/";

/// The REST API host that maps to the dedicated pipeline host.
const API_HOST: &str = "api.vrchat.cloud";

/// Realtime endpoint used when the base path points at the main API host.
const PIPELINE_ENDPOINT: &str = "wss://pipeline.vrchat.cloud/";

/// Configuration for pipeline client behavior.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Options {
    /// Explicit pipeline endpoint. When unset, the endpoint is derived from
    /// the REST base path via [`resolve_endpoint`].
    pub endpoint: Option<Url>,
    /// Receive buffer size for incoming frames
    #[builder(default = DEFAULT_RECEIVE_BUFFER_SIZE)]
    pub receive_buffer_size: usize,
    /// Interval between keep-alive pings
    #[builder(default = DEFAULT_KEEP_ALIVE_INTERVAL)]
    pub keep_alive_interval: Duration,
    /// Automatically reconnect when the socket closes or errors
    #[builder(default = true)]
    pub auto_reconnect: bool,
    /// Backoff delay before the first reconnect attempt
    #[builder(default = DEFAULT_INITIAL_RECONNECT_DELAY)]
    pub initial_reconnect_delay: Duration,
    /// Ceiling for the exponential reconnect backoff
    #[builder(default = DEFAULT_MAX_RECONNECT_DELAY)]
    pub max_reconnect_delay: Duration,
    /// Maximum accumulated message size before the connection is dropped
    #[builder(default = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,
    /// WebSocket sub-protocols to request. When empty no protocol header is
    /// sent, so servers that skip negotiation are accepted.
    #[builder(default)]
    pub sub_protocols: Vec<String>,
    /// Optional HTTP proxy to tunnel the connection through
    pub proxy: Option<Url>,
    /// Path applied when the endpoint is derived from the base path
    #[builder(default = DEFAULT_PATH.to_owned())]
    pub default_path: String,
}

impl Default for Options {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Resolve the pipeline endpoint for a client.
///
/// An explicitly configured endpoint always wins. Otherwise the endpoint is
/// derived from the REST base path: the main API host maps to the dedicated
/// pipeline host, and any other address keeps its host with the scheme
/// swapped to `ws`/`wss`, the configured default path, and no query string.
///
/// A base path that does not parse as an absolute URL is a fatal
/// configuration error and is never retried.
pub fn resolve_endpoint(base_path: &str, options: &Options) -> crate::Result<Url> {
    if let Some(endpoint) = &options.endpoint {
        return Ok(endpoint.clone());
    }

    let base = Url::parse(base_path).map_err(|e| {
        #[cfg(feature = "tracing")]
        tracing::error!(%base_path, error = %e, "Invalid base path; set Options.endpoint explicitly");
        Error::from(e)
    })?;

    if base
        .host_str()
        .is_some_and(|h| h.eq_ignore_ascii_case(API_HOST))
    {
        return Url::parse(PIPELINE_ENDPOINT).map_err(Error::from);
    }

    let scheme = if base.scheme().eq_ignore_ascii_case("https") {
        "wss"
    } else {
        "ws"
    };

    let mut endpoint = base;
    endpoint
        .set_scheme(scheme)
        .map_err(|()| Error::configuration("base path scheme cannot be mapped to ws/wss"))?;
    let path = if options.default_path.is_empty() {
        DEFAULT_PATH
    } else {
        options.default_path.as_str()
    };
    endpoint.set_path(path);
    endpoint.set_query(None);
    Ok(endpoint)
}
