use crate::error::{Result, ScanError};
use crate::record::{RawEntry, ServerTag};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Opaque credential source. Returns a usable token or `None` when the
/// caller is not authenticated; how the token is obtained is not this
/// crate's business.
pub type CredentialProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Relationship type for a direct connection in the root list.
const DIRECT_CONNECTION: i64 = 1;

/// Thin client for the connection API. Every call carries the caller's
/// token in the `authorization` header and fails on non-2xx; per-call
/// timeouts come from the underlying reqwest client so a stuck fetch
/// degrades into an ordinary fetch failure.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent("Lattice/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: "https://discord.com/api/v9".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let res = self
            .client
            .get(url)
            .header("authorization", token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ScanError::Status(status.as_u16()));
        }

        Ok(res.json::<T>().await?)
    }

    /// Fetch the subject's root connection list, filtered to direct
    /// connections (pending and blocked relationships are dropped).
    pub async fn fetch_root(&self, token: &str) -> Result<Vec<RawEntry>> {
        let relationships: Vec<Relationship> =
            self.get_json("/users/@me/relationships", token).await?;

        Ok(relationships
            .into_iter()
            .filter(|r| r.kind == DIRECT_CONNECTION)
            .map(|r| RawEntry {
                id: r.user.id,
                username: r.user.username,
                global_name: r.user.global_name,
                discriminator: r.user.discriminator,
                avatar: r.user.avatar,
            })
            .collect())
    }

    /// Fetch the ids of one entity's own connections.
    pub async fn fetch_mutuals(&self, id: &str, token: &str) -> Result<Vec<String>> {
        let mutuals: Vec<MutualEntry> = self
            .get_json(&format!("/users/{}/relationships", id), token)
            .await?;
        Ok(mutuals.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one entity's secondary profile and reduce it to server tags.
    pub async fn fetch_profile(&self, id: &str, token: &str) -> Result<Vec<ServerTag>> {
        let profile: Profile = self
            .get_json(&format!("/users/{}/profile", id), token)
            .await?;
        Ok(profile
            .mutual_guilds
            .into_iter()
            .map(|g| ServerTag {
                group_id: g.id,
                label: g.nick.unwrap_or_default(),
            })
            .collect())
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

// Wire shapes, private to this module.

#[derive(Deserialize)]
struct Relationship {
    #[serde(rename = "type")]
    kind: i64,
    user: RelationshipUser,
}

#[derive(Deserialize)]
struct RelationshipUser {
    id: String,
    username: String,
    global_name: Option<String>,
    discriminator: Option<String>,
    avatar: Option<String>,
}

#[derive(Deserialize)]
struct MutualEntry {
    id: String,
}

#[derive(Deserialize)]
struct Profile {
    #[serde(default)]
    mutual_guilds: Vec<MutualGuild>,
}

#[derive(Deserialize)]
struct MutualGuild {
    id: String,
    #[serde(default)]
    nick: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_timeout(5).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn fetch_root_keeps_only_direct_connections() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/@me/relationships"))
            .and(header("authorization", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "type": 1, "user": {"id": "1", "username": "alan"}},
                {"id": "2", "type": 3, "user": {"id": "2", "username": "pending"}},
                {"id": "3", "type": 1, "user": {"id": "3", "username": "lora", "global_name": "Lora", "avatar": "abc"}}
            ])))
            .mount(&server)
            .await;

        let entries = client_for(&server).fetch_root("tok").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "1");
        assert_eq!(entries[1].global_name.as_deref(), Some("Lora"));
    }

    #[tokio::test]
    async fn fetch_root_surfaces_non_2xx_as_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/@me/relationships"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_root("tok").await.unwrap_err();
        assert!(matches!(err, ScanError::Status(401)));
    }

    #[tokio::test]
    async fn fetch_mutuals_returns_ids_in_source_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/7/relationships"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "9"}, {"id": "4"}, {"id": "12"}])),
            )
            .mount(&server)
            .await;

        let ids = client_for(&server).fetch_mutuals("7", "tok").await.unwrap();
        assert_eq!(ids, vec!["9", "4", "12"]);
    }

    #[tokio::test]
    async fn fetch_profile_tolerates_missing_guild_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/7/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": "7"}})))
            .mount(&server)
            .await;

        let tags = client_for(&server).fetch_profile("7", "tok").await.unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn fetch_profile_maps_guilds_to_server_tags() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/7/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "mutual_guilds": [
                    {"id": "g1", "nick": "flynn"},
                    {"id": "g2"}
                ]
            })))
            .mount(&server)
            .await;

        let tags = client_for(&server).fetch_profile("7", "tok").await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].group_id, "g1");
        assert_eq!(tags[0].label, "flynn");
        assert_eq!(tags[1].label, "");
    }
}
