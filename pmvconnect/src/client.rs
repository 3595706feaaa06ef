//! Identity of the client application, rendered as `X-Plex-*` parameters.

use pmvbind::OptionMap;
use uuid::Uuid;

/// Information the server wants to know about us.
///
/// Sent with every request as URL parameters. The `client_id` is expected
/// to be stable across runs; callers normally read it from configuration
/// and fall back to [`ClientIdentity::generate_id`] on first launch.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub device: String,
    pub device_name: String,
    pub product: String,
    pub version: String,
    pub platform: String,
    pub language: String,
    pub provides: String,
}

impl ClientIdentity {
    pub const PLATFORM: &'static str = "PMVideo";

    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            device: "PMVideo client".to_owned(),
            device_name: "PMVideo".to_owned(),
            product: "PMVideo".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            platform: Self::PLATFORM.to_owned(),
            language: "en".to_owned(),
            provides: "player".to_owned(),
        }
    }

    /// Fresh random identifier for a first launch.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// The identification parameters, in stable order.
    pub fn identity_params(&self) -> OptionMap {
        let mut params = OptionMap::new();
        params.insert("X-Plex-Client-Identifier", &self.client_id);
        params.insert("X-Plex-Device", &self.device);
        params.insert("X-Plex-Device-Name", &self.device_name);
        params.insert("X-Plex-Product", &self.product);
        params.insert("X-Plex-Version", &self.version);
        params.insert("X-Plex-Platform", &self.platform);
        params.insert("X-Plex-Client-Platform", &self.platform);
        params.insert("X-Plex-Platform-Version", &self.version);
        params.insert("X-Plex-Language", &self.language);
        params.insert("X-Plex-Provides", &self.provides);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_params_carry_the_client_identifier() {
        let identity = ClientIdentity::new("11111111-2222-3333-4444-555555555555");
        let params = identity.identity_params();
        assert_eq!(
            params.get("X-Plex-Client-Identifier"),
            Some("11111111-2222-3333-4444-555555555555")
        );
        assert_eq!(params.get("X-Plex-Provides"), Some("player"));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(
            ClientIdentity::generate_id(),
            ClientIdentity::generate_id()
        );
    }
}
