// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    format_outcome,
    format_status,
    resolve_store_path,
    resolve_token,
};

// Re-export crawl functionality from lattice-core
pub use lattice_core::{
    CrawlEngine, CrawlError, ScanOutcome,
    build_graph, export_graph, generate_scan_report, import_graph,
};
