use crate::api::ApiClient;
use crate::limiter::RateLimiter;
use crate::record::ConnectionRecord;
use std::sync::Arc;
use tracing::warn;

/// Populates the enrichment fields of a freshly built record.
///
/// Both sub-fetches are best-effort and independent: a failure is logged and
/// leaves that field at its default, so one bad entry never aborts the crawl
/// and a failed mutual list does not prevent the profile fetch.
pub struct EnrichmentFetcher {
    api: Arc<ApiClient>,
    limiter: Arc<RateLimiter>,
}

impl EnrichmentFetcher {
    pub fn new(api: Arc<ApiClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    /// Mutual list first, then the secondary profile. The shared limiter
    /// gates the second call so both fetches count against the same global
    /// request budget.
    pub async fn enrich(&self, record: &mut ConnectionRecord, token: &str) {
        match self.api.fetch_mutuals(&record.id, token).await {
            Ok(ids) => record.mutual_ids = ids,
            // 403/429 here is expected sometimes, skip
            Err(e) => warn!("mutual list fetch failed for {}: {}", record.id, e),
        }

        self.limiter.wait().await;

        match self.api.fetch_profile(&record.id, token).await {
            Ok(tags) => record.server_tags = tags,
            Err(e) => warn!("profile fetch failed for {}: {}", record.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawEntry, RecordBuilder};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> EnrichmentFetcher {
        let api = Arc::new(ApiClient::with_timeout(5).with_base_url(server.uri()));
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        EnrichmentFetcher::new(api, limiter)
    }

    fn record(id: &str) -> ConnectionRecord {
        RecordBuilder::new().build(&RawEntry {
            id: id.to_string(),
            username: "quorra".to_string(),
            global_name: None,
            discriminator: None,
            avatar: None,
        })
    }

    #[tokio::test]
    async fn enrich_fills_both_fields_on_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/5/relationships"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "6"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/5/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "mutual_guilds": [{"id": "g1", "nick": "q"}]
            })))
            .mount(&server)
            .await;

        let mut rec = record("5");
        fetcher_for(&server).enrich(&mut rec, "tok").await;

        assert_eq!(rec.mutual_ids, vec!["6"]);
        assert_eq!(rec.server_tags.len(), 1);
    }

    #[tokio::test]
    async fn failed_mutual_fetch_does_not_block_profile_fetch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/5/relationships"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/5/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "mutual_guilds": [{"id": "g1", "nick": "q"}]
            })))
            .mount(&server)
            .await;

        let mut rec = record("5");
        fetcher_for(&server).enrich(&mut rec, "tok").await;

        assert!(rec.mutual_ids.is_empty());
        assert_eq!(rec.server_tags[0].group_id, "g1");
    }

    #[tokio::test]
    async fn failed_profile_fetch_keeps_mutual_ids() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/5/relationships"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "6"}, {"id": "7"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/5/profile"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut rec = record("5");
        fetcher_for(&server).enrich(&mut rec, "tok").await;

        assert_eq!(rec.mutual_ids, vec!["6", "7"]);
        assert!(rec.server_tags.is_empty());
    }
}
