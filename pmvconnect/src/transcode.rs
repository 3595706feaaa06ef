//! Transcode session negotiation.
//!
//! A session is an ordered option map plus a generated session id; the
//! server does the actual transcoding. We only build the start URL and
//! fire the stop request.

use std::sync::Arc;

use pmvbind::OptionMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::connection::Connection;
use crate::errors::ConnectionError;
use crate::link::ServerLink;

pub struct TranscodeSession {
    conn: Arc<Connection>,
    options: OptionMap,
    ext: String,
}

impl TranscodeSession {
    /// New session with a fresh id, streaming segments of type `ext`.
    pub fn new(conn: Arc<Connection>, ext: impl Into<String>) -> Self {
        let mut options = OptionMap::new();
        options.insert("session", Uuid::new_v4().to_string());
        Self {
            conn,
            options,
            ext: ext.into(),
        }
    }

    /// Session transcoding the item at `metadata_path`.
    ///
    /// The path option goes through the server's loopback address, which
    /// is how the universal transcoder expects its source.
    pub fn for_item(conn: Arc<Connection>, metadata_path: &str) -> Self {
        let session = Self::new(conn, "ts");
        session.option("path", format!("http://127.0.0.1:32400{}", metadata_path))
    }

    /// Adds or replaces one negotiation option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn session_id(&self) -> &str {
        self.options.get("session").unwrap_or_default()
    }

    /// Server path starting the session: identification parameters plus
    /// the negotiation options, options winning on collision.
    pub fn start_path(&self) -> String {
        let mut params = self.conn.identity_params();
        for (key, value) in self.options.iter() {
            params.insert(key, value);
        }
        format!(
            "/video/:/transcode/universal/start.{}?{}",
            self.ext,
            params.to_query()
        )
    }

    /// Absolute locator for the stream, for hand-off to a player.
    pub fn start_url(&self) -> String {
        let url = self.conn.url_for(&self.start_path());
        info!(session = %self.session_id(), "transcode session negotiated");
        url
    }

    /// Tells the server to tear the session down.
    pub fn stop(&self) -> Result<(), ConnectionError> {
        debug!(session = %self.session_id(), "stopping transcode session");
        self.conn.ping(&format!(
            "/video/:/transcode/universal/stop?session={}",
            self.session_id()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientIdentity;
    use crate::connection::DEFAULT_PORT;

    fn conn() -> Arc<Connection> {
        Arc::new(Connection::new(
            ClientIdentity::new("id-for-tests"),
            "media.local",
            DEFAULT_PORT,
            None,
        ))
    }

    #[test]
    fn start_path_merges_identity_and_options() {
        let session = TranscodeSession::for_item(conn(), "/library/metadata/7")
            .option("protocol", "http")
            .option("videoResolution", "720");

        let path = session.start_path();
        assert!(path.starts_with("/video/:/transcode/universal/start.ts?"));
        assert!(path.contains("X-Plex-Client-Identifier=id-for-tests"));
        assert!(path.contains("videoResolution=720"));
        assert!(path.contains("path=http%3A%2F%2F127.0.0.1%3A32400%2Flibrary%2Fmetadata%2F7"));
        assert!(path.contains(&format!("session={}", session.session_id())));
    }

    #[test]
    fn each_session_gets_its_own_id() {
        let a = TranscodeSession::new(conn(), "ts");
        let b = TranscodeSession::new(conn(), "ts");
        assert!(!a.session_id().is_empty());
        assert_ne!(a.session_id(), b.session_id());
    }
}
