use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

/// Broad classification of SDK errors.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Malformed configuration (e.g. an unparseable base path). Fatal, never retried.
    Configuration,
    /// WebSocket handshake failure. Retried by the reconnect policy when enabled.
    Connection,
    /// Mid-stream transport failure or oversized message. Treated as abnormal closure.
    Transport,
    /// Envelope or typed-payload parse failure. Reported, never tears down the connection.
    Decode,
    /// Operation attempted in the wrong connection state (e.g. send while closed).
    State,
    /// Invalid argument supplied by the caller (e.g. a blank topic).
    Validation,
    /// Operation attempted after the client was disposed.
    Disposed,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::with_source(
            Kind::Validation,
            Validation {
                reason: message.into(),
            },
        )
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::with_source(
            Kind::Configuration,
            Configuration {
                reason: message.into(),
            },
        )
    }

    pub fn state<S: Into<String>>(message: S) -> Self {
        Self::with_source(
            Kind::State,
            InvalidState {
                reason: message.into(),
            },
        )
    }

    #[must_use]
    pub fn disposed() -> Self {
        Self::with_source(Kind::Disposed, Disposed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

#[non_exhaustive]
#[derive(Debug)]
pub struct Configuration {
    pub reason: String,
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.reason)
    }
}

impl StdError for Configuration {}

#[non_exhaustive]
#[derive(Debug)]
pub struct InvalidState {
    pub reason: String,
}

impl fmt::Display for InvalidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid state: {}", self.reason)
    }
}

impl StdError for InvalidState {}

/// Marker for operations attempted after [`dispose`](crate::client::PipelineClient::dispose).
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct Disposed;

impl fmt::Display for Disposed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client has been disposed")
    }
}

impl StdError for Disposed {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::with_source(Kind::Decode, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::with_source(Kind::Configuration, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let error = Error::validation("topic must not be blank");
        assert_eq!(error.kind(), Kind::Validation);
        assert!(error.to_string().contains("topic must not be blank"));
    }

    #[test]
    fn disposed_fails_fast() {
        let error = Error::disposed();
        assert_eq!(error.kind(), Kind::Disposed);
        assert!(error.downcast_ref::<Disposed>().is_some());
    }

    #[test]
    fn json_error_maps_to_decode() {
        let e =
            serde_json::from_str::<serde_json::Value>("{not json").expect_err("parse should fail");
        let error: Error = e.into();
        assert_eq!(error.kind(), Kind::Decode);
    }
}
