//! # pmvconnect - Media server connection
//!
//! Synchronous HTTP access to one Plex-style media server: client identity
//! headers, XML document fetching, fire-and-check pings, and transcode
//! session negotiation. One request per call, blocking until the response
//! is parsed or a [`ConnectionError`] is raised; there is no retry,
//! backoff or background traffic here.
//!
//! Consumers should depend on the [`ServerLink`] trait rather than the
//! concrete [`Connection`] so tests can substitute a scripted server.

mod client;
mod connection;
mod errors;
mod link;
mod transcode;

pub use client::ClientIdentity;
pub use connection::{Connection, DEFAULT_PORT};
pub use errors::ConnectionError;
pub use link::ServerLink;
pub use transcode::TranscodeSession;
