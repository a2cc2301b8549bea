#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod client;
pub mod error;
pub mod events;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub use client::PipelineClient;
pub use events::{Envelope, Event, EventKind, FeedEvent};
pub use ws::{ClientEvent, ConnectionState, Options};
