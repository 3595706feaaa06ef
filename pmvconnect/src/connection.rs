//! Synchronous HTTP connection to one media server.

use std::time::Duration;

use tracing::{debug, info, warn};
use ureq::{Agent, Body};
use xmltree::Element;

use crate::client::ClientIdentity;
use crate::errors::ConnectionError;
use crate::link::ServerLink;

/// Default media server port.
pub const DEFAULT_PORT: u16 = 32400;

/// Global timeout applied to every request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One media server endpoint plus the HTTP agent used to reach it.
///
/// All methods are blocking and issue exactly one request. Server
/// identity fields (`name`, `machine_id`, ...) are placeholders until
/// [`Connection::refresh`] has read them from the server root document.
pub struct Connection {
    agent: Agent,
    client: ClientIdentity,
    host: String,
    port: u16,
    token: Option<String>,
    name: String,
    machine_id: Option<String>,
    server_class: String,
    multiuser: bool,
    discovered: bool,
}

impl Connection {
    pub fn new(
        client: ClientIdentity,
        host: impl Into<String>,
        port: u16,
        token: Option<String>,
    ) -> Self {
        let mut builder = Agent::config_builder();
        builder = builder.timeout_global(Some(DEFAULT_TIMEOUT));
        // Non-2xx responses keep their body readable; status mapping is
        // ours to do.
        builder = builder.http_status_as_error(false);
        let agent: Agent = builder.build().into();

        let host = host.into();
        Self {
            agent,
            client,
            name: host.clone(),
            host,
            port,
            token,
            machine_id: None,
            server_class: "primary".to_owned(),
            multiuser: false,
            discovered: false,
        }
    }

    pub fn client(&self) -> &ClientIdentity {
        &self.client
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Friendly name reported by the server, or the host until
    /// [`Connection::refresh`] has run.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    pub fn server_class(&self) -> &str {
        &self.server_class
    }

    pub fn is_multiuser(&self) -> bool {
        self.multiuser
    }

    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    /// Absolute locator for `path`, without identification parameters.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("http://{}:{}{}", self.host, self.port, path)
        } else {
            format!("http://{}:{}/{}", self.host, self.port, path)
        }
    }

    /// Identification parameters, token included, appended to every
    /// request we issue.
    pub(crate) fn identity_params(&self) -> pmvbind::OptionMap {
        let mut params = self.client.identity_params();
        if let Some(token) = &self.token {
            params.insert("X-Plex-Token", token);
        }
        params
    }

    fn identity_query(&self) -> String {
        self.identity_params().to_query()
    }

    fn request_url(&self, path: &str) -> String {
        let url = self.url_for(path);
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{}{}{}", url, separator, self.identity_query())
    }

    fn request(&self, path: &str) -> Result<ureq::http::Response<Body>, ConnectionError> {
        let url = self.request_url(path);
        debug!(url = %url, "GET");

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| ConnectionError::Offline {
                host: self.host.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status.as_u16() == 401 {
            warn!(host = %self.host, "got 401 Unauthorized");
            Err(ConnectionError::Unauthorized {
                host: self.host.clone(),
            })
        } else {
            warn!(host = %self.host, path, status = status.as_u16(), "unexpected status");
            Err(ConnectionError::InvalidResponse {
                host: self.host.clone(),
                path: path.to_owned(),
                status: status.as_u16(),
            })
        }
    }

    /// Reads the server identity from its root document.
    pub fn refresh(&mut self) -> Result<(), ConnectionError> {
        self.discovered = false;
        let root = self.fetch_node("/")?;

        if let Some(name) = root.attributes.get("friendlyName") {
            self.name = name.clone();
        }
        self.machine_id = root.attributes.get("machineIdentifier").cloned();
        self.server_class = root
            .attributes
            .get("serverClass")
            .cloned()
            .unwrap_or_else(|| "primary".to_owned());
        self.multiuser = root.attributes.get("multiuser").map(String::as_str) == Some("1");
        self.discovered = true;

        info!(name = %self.name, class = %self.server_class, "server discovered");
        Ok(())
    }
}

impl ServerLink for Connection {
    fn identity_name(&self) -> &str {
        &self.name
    }

    fn fetch_node(&self, path: &str) -> Result<Element, ConnectionError> {
        let mut response = self.request(path)?;
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|err| ConnectionError::Offline {
                host: self.host.clone(),
                message: err.to_string(),
            })?;

        Element::parse(body.as_slice()).map_err(|err| ConnectionError::InvalidPayload {
            path: path.to_owned(),
            message: err.to_string(),
        })
    }

    fn ping(&self, path: &str) -> Result<(), ConnectionError> {
        self.request(path).map(|_| ())
    }

    fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ConnectionError> {
        let mut response = self.request(path)?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|err| ConnectionError::Offline {
                host: self.host.clone(),
                message: err.to_string(),
            })
    }

    fn absolute_url(&self, path: &str) -> String {
        self.url_for(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection() -> Connection {
        Connection::new(
            ClientIdentity::new("id-for-tests"),
            "media.local",
            DEFAULT_PORT,
            Some("secret".to_owned()),
        )
    }

    #[test]
    fn url_for_joins_absolute_and_relative_paths() {
        let conn = test_connection();
        assert_eq!(
            conn.url_for("/library/sections"),
            "http://media.local:32400/library/sections"
        );
        assert_eq!(
            conn.url_for("library/sections"),
            "http://media.local:32400/library/sections"
        );
    }

    #[test]
    fn request_url_carries_identity_and_token() {
        let conn = test_connection();
        let url = conn.request_url("/library/sections");
        assert!(url.contains("X-Plex-Client-Identifier=id-for-tests"));
        assert!(url.contains("X-Plex-Token=secret"));
        assert!(url.starts_with("http://media.local:32400/library/sections?"));
    }

    #[test]
    fn request_url_extends_an_existing_query() {
        let conn = test_connection();
        let url = conn.request_url("/:/scrobble?key=7");
        assert!(url.starts_with("http://media.local:32400/:/scrobble?key=7&"));
    }
}
