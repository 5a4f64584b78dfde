pub mod crawl;
pub mod data;
pub mod export;
pub mod graph;

pub use crawl::{CrawlEngine, CrawlError, ScanOutcome, generate_scan_report};
pub use data::{CrawlProgress, Store};
pub use export::{GraphExport, export_graph, import_graph};
pub use graph::{GraphDoc, build_graph};
