use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const OFFLINE_CLIENT_ID: &str = "00000000402B5328";
pub const DEFAULT_USERNAME: &str = "Player";

const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";

/// Stable identity for an offline player: UUIDv5 over the DNS namespace.
///
/// The same username always maps to the same id, across calls and restarts.
pub fn offline_uuid(username: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, username.as_bytes())
}

/// Identity values substituted into the game arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchAccountProfile {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline(DEFAULT_USERNAME, None)
    }
}

impl LaunchAccountProfile {
    /// Offline profile; a configured uuid takes precedence over the derived one.
    pub fn offline(username: &str, configured_uuid: Option<&str>) -> Self {
        let username = match username.trim() {
            "" => DEFAULT_USERNAME,
            name => name,
        };
        let uuid = configured_uuid
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| offline_uuid(username).to_string());

        Self {
            username: username.to_string(),
            uuid,
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            xuid: "0".into(),
            user_type: "legacy".into(),
            client_id: OFFLINE_CLIENT_ID.into(),
        }
    }

    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = DEFAULT_USERNAME.into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = offline_uuid(&self.username).to_string();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = "legacy".into();
        }
        if self.client_id.trim().is_empty() {
            self.client_id = OFFLINE_CLIENT_ID.into();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_uuid_is_stable_and_name_based() {
        let a = LaunchAccountProfile::offline("Steve", None);
        let b = LaunchAccountProfile::offline("Steve", None);
        assert_eq!(a.uuid, b.uuid);
        assert_eq!(offline_uuid("Steve").get_version_num(), 5);
        assert_ne!(a.uuid, LaunchAccountProfile::offline("Alex", None).uuid);
        assert_eq!(
            a.uuid,
            Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"Steve").hyphenated().to_string()
        );
    }

    #[test]
    fn configured_uuid_wins() {
        let p = LaunchAccountProfile::offline("Steve", Some("1234"));
        assert_eq!(p.uuid, "1234");
        let p = LaunchAccountProfile::offline("Steve", Some("  "));
        assert_eq!(p.uuid, offline_uuid("Steve").to_string());
    }

    #[test]
    fn blank_fields_are_refilled() {
        let p = LaunchAccountProfile {
            username: " ".into(),
            uuid: String::new(),
            access_token: String::new(),
            xuid: String::new(),
            user_type: String::new(),
            client_id: String::new(),
        }
        .sanitized();
        assert_eq!(p, LaunchAccountProfile::default());
    }
}
