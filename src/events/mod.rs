//! Event model for the realtime pipeline.
//!
//! Incoming messages surface in three tiers: the raw text, the generic
//! [`Envelope`], and the typed [`FeedEvent`] for recognized kinds. Each
//! tier degrades independently, so a payload the typed tier cannot decode
//! still reaches envelope and raw consumers.

pub mod dispatch;
pub mod envelope;
pub mod kind;
pub mod payloads;

pub use dispatch::FeedEvent;
pub use envelope::{Envelope, Event};
pub use kind::EventKind;
