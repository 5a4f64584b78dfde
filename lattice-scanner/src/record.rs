use serde::{Deserialize, Serialize};

/// One entry of the root connection list as returned by the source API,
/// reduced to the fields the crawler needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub discriminator: Option<String>,
    pub avatar: Option<String>,
}

/// Secondary enrichment: one shared group the subject and this entity are
/// both members of. Aliases accept the field names older export documents
/// used for the same data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTag {
    #[serde(default, alias = "id")]
    pub group_id: String,
    #[serde(default, alias = "nick")]
    pub label: String,
}

/// A node of the connection map. `id` is the identity key and is immutable
/// once the record is created; every other field is presentation or
/// enrichment data and never participates in identity comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "username")]
    pub display_name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub profile_url: String,
    /// IDs of this entity's own connections. May reference entities that
    /// were never crawled.
    #[serde(default, alias = "connections")]
    pub mutual_ids: Vec<String>,
    /// Best-effort: empty when the profile fetch failed or returned nothing.
    #[serde(default, alias = "serverNicknames")]
    pub server_tags: Vec<ServerTag>,
}

/// Number of stock avatar variants the CDN serves under `embed/avatars/`.
const DEFAULT_AVATAR_VARIANTS: u64 = 6;

/// Builds a normalized [`ConnectionRecord`] from a raw root-list entry.
/// Pure, no I/O, no failure path: malformed optional fields fall back to
/// documented defaults.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    cdn_base: String,
    profile_base: String,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            cdn_base: "https://cdn.discordapp.com".to_string(),
            profile_base: "https://discord.com".to_string(),
        }
    }

    pub fn with_cdn_base(mut self, base: impl Into<String>) -> Self {
        self.cdn_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_profile_base(mut self, base: impl Into<String>) -> Self {
        self.profile_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Enrichment fields (`mutual_ids`, `server_tags`) start empty; the
    /// enrichment fetcher fills them in later.
    pub fn build(&self, raw: &RawEntry) -> ConnectionRecord {
        let display_name = raw
            .global_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(raw.username.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or(raw.id.as_str())
            .to_string();

        let discriminator = raw
            .discriminator
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "0".to_string());

        // Post-migration accounts have discriminator "0" and go by username alone.
        let tag = if discriminator == "0" {
            raw.username.clone()
        } else {
            format!("{}#{}", raw.username, discriminator)
        };

        let avatar_url = match raw.avatar.as_deref().filter(|h| !h.is_empty()) {
            Some(hash) => format!("{}/avatars/{}/{}.png", self.cdn_base, raw.id, hash),
            None => format!(
                "{}/embed/avatars/{}.png",
                self.cdn_base,
                default_avatar_index(&raw.id)
            ),
        };

        ConnectionRecord {
            id: raw.id.clone(),
            display_name,
            tag,
            discriminator,
            avatar_url,
            profile_url: format!("{}/users/{}", self.profile_base, raw.id),
            mutual_ids: Vec::new(),
            server_tags: Vec::new(),
        }
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stock-avatar variant for entities without an avatar hash. Ids are
/// snowflakes whose low 22 bits are sequence/worker noise, so shift them out
/// before taking the modulus. Computed in u64 so large ids cannot overflow;
/// a non-numeric id lands on variant 0.
fn default_avatar_index(id: &str) -> u64 {
    id.parse::<u64>()
        .map(|n| (n >> 22) % DEFAULT_AVATAR_VARIANTS)
        .unwrap_or(0)
}
