pub mod api;
pub mod enrich;
pub mod error;
pub mod limiter;
pub mod record;

pub use api::{ApiClient, CredentialProvider};
pub use enrich::EnrichmentFetcher;
pub use error::ScanError;
pub use limiter::RateLimiter;
pub use record::{ConnectionRecord, RawEntry, RecordBuilder, ServerTag};
