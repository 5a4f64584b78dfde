use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lattice_core::data::{CrawlProgress, Store};
use lattice_core::{CrawlEngine, ScanOutcome, build_graph, export_graph, generate_scan_report, import_graph};
use lattice_scanner::{ApiClient, CredentialProvider};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber;
use url::Url;

const STORE_FILE: &str = "lattice.db";
const TOKEN_ENV: &str = "LATTICE_TOKEN";

// Helper functions shared by the command handlers

/// Expand the configured store directory and point at the database file in it.
pub fn resolve_store_path(dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(dir);
    Path::new(expanded.as_ref()).join(STORE_FILE)
}

/// Token resolution order: the --token flag, then the LATTICE_TOKEN
/// environment variable. Empty values count as absent.
pub fn resolve_token(flag: Option<&String>) -> Option<String> {
    flag.cloned()
        .filter(|t| !t.is_empty())
        .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
}

pub fn format_outcome(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::Completed { scanned, skipped } => {
            format!("Scan complete: {} scanned, {} skipped", scanned, skipped)
        }
        ScanOutcome::Cancelled { scanned, skipped } => {
            format!("Scan cancelled: {} scanned, {} skipped", scanned, skipped)
        }
    }
}

pub fn format_status(count: usize, progress: Option<CrawlProgress>, stop_requested: bool) -> String {
    let mut out = format!("Connections mapped: {}\n", count);
    match progress {
        Some(p) => match p.total {
            Some(total) => out.push_str(&format!("Scan in progress: {}/{}\n", p.current, total)),
            None => out.push_str(&format!("Scan in progress: {} so far\n", p.current)),
        },
        None => out.push_str("No scan in progress\n"),
    }
    if stop_requested {
        out.push_str("Stop requested\n");
    }
    out
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

fn store_path_from_args(args: &ArgMatches) -> PathBuf {
    resolve_store_path(args.get_one::<String>("db").unwrap())
}

fn open_existing_store(args: &ArgMatches) -> Store {
    let path = store_path_from_args(args);
    if !Store::exists(&path) {
        eprintln!(
            "✗ No store at {}; run `lattice init` first",
            path.display()
        );
        std::process::exit(1);
    }
    Store::new(&path).expect("Failed to open store")
}

fn engine_from_args(args: &ArgMatches) -> CrawlEngine {
    let store = open_existing_store(args);

    let token = match resolve_token(args.get_one::<String>("token")) {
        Some(token) => token,
        None => {
            eprintln!("✗ No token: pass --token or set {}", TOKEN_ENV);
            std::process::exit(1);
        }
    };
    let credentials: CredentialProvider = Arc::new(move || Some(token.clone()));

    let mut api = ApiClient::new();
    if let Some(base) = args.get_one::<Url>("base-url") {
        api = api.with_base_url(base.as_str());
    }

    let mut engine = CrawlEngine::with_api(store, credentials, api);
    // Not every subcommand that builds an engine exposes --interval-ms.
    if let Ok(Some(ms)) = args.try_get_one::<u64>("interval-ms") {
        engine = engine.with_interval(Duration::from_millis(*ms));
    }
    engine
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  LATTICE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let dir = args.get_one::<String>("PATH").unwrap();
    let force = args.get_flag("force");
    let expanded_config_dir = shellexpand::tilde(dir);
    let config_dir = Path::new(expanded_config_dir.as_ref());
    let db_loc = config_dir.join(STORE_FILE);
    let db_path = db_loc.as_path();

    println!("{} Parsed arguments", "✓".green().bold());
    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    // Handle existing store in force mode
    if force && Store::exists(db_path) {
        println!(
            "{} Deleting existing store (force mode)",
            "→".yellow().bold()
        );
        Store::drop(db_path);
        println!("{} Existing store removed", "✓".green().bold());
        println!();
    }

    if Store::exists(db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A store already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Would you like to overwrite it? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Keeping existing store", "→".blue());
            return;
        }
        Store::drop(db_path);
        println!("{} Existing store removed", "✓".green().bold());
        println!();
    }

    println!("{} Creating store...", "→".blue());
    fs::create_dir_all(config_dir).expect("Failed to create config directory");
    Store::new(db_path).expect("Failed to create store");

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Store: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
}

pub async fn handle_count(args: &ArgMatches) {
    tracing_subscriber::fmt::init();

    let mut engine = engine_from_args(args);
    match engine.count().await {
        Ok(n) => println!("{} {} connections in the root list", "✓".green().bold(), n),
        Err(e) => {
            eprintln!("✗ Count failed: {}", e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_scan(args: &ArgMatches) {
    tracing_subscriber::fmt::init();

    let limit = args.get_one::<i64>("limit").copied();
    let interval_ms = *args.get_one::<u64>("interval-ms").unwrap_or(&1000);
    let store_path = store_path_from_args(args);
    let mut engine = engine_from_args(args);

    println!("\n🕸️  Scanning the connection graph");
    println!("Store: {}", store_path.display());
    match limit {
        Some(n) => println!("Limit: {}", n),
        None => println!("Limit: whole root list"),
    }
    println!("Request spacing: {}ms\n", interval_ms);

    // Progress observer on its own store connection, the same way any
    // external watcher would poll.
    let done = Arc::new(AtomicBool::new(false));
    let done_flag = done.clone();
    let observer_path = store_path.clone();
    let observer = tokio::spawn(async move {
        let store = match Store::new(&observer_path) {
            Ok(store) => store,
            Err(_) => return,
        };

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("scanning");

        while !done_flag.load(Ordering::SeqCst) {
            if let Ok(Some(progress)) = store.progress() {
                if let Some(total) = progress.total {
                    bar.set_length(total);
                }
                bar.set_position(progress.current);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        bar.finish_and_clear();
    });

    let result = engine.scan(limit).await;
    done.store(true, Ordering::SeqCst);
    let _ = observer.await;

    match result {
        Ok(outcome) => {
            println!("\n{} {}", "✓".green().bold(), format_outcome(&outcome));
            let total = engine.store().connection_count().unwrap_or(0);
            println!("{} Connections mapped: {}", "✓".green().bold(), total);
        }
        Err(e) => {
            eprintln!("\n✗ Scan failed: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn handle_stop(args: &ArgMatches) {
    let store = open_existing_store(args);
    store.request_stop().expect("Failed to write stop request");
    println!(
        "{} Stop requested; the running scan will halt at the next entry",
        "✓".green().bold()
    );
}

pub fn handle_status(args: &ArgMatches) {
    let store = open_existing_store(args);

    let count = store.connection_count().expect("Failed to read store");
    let progress = store.progress().expect("Failed to read store");
    let stop = store.stop_requested().expect("Failed to read store");

    print!("{}", format_status(count, progress, stop));
}

pub fn handle_clear(args: &ArgMatches) {
    let mut store = open_existing_store(args);

    if !args.get_flag("force") {
        println!(
            "{}",
            "This deletes the entire connection map and all scan state.".yellow()
        );
        let response = print_prompt("Do you want to continue? [y/N]:");
        if response != "y" && response != "yes" {
            println!("{} Clear cancelled", "✗".red().bold());
            return;
        }
    }

    store.clear().expect("Failed to clear store");
    println!("{} Store cleared", "✓".green().bold());
}

pub fn handle_export(args: &ArgMatches) {
    let store = open_existing_store(args);

    let export = match export_graph(&store) {
        Ok(export) => export,
        Err(e) => {
            eprintln!("✗ Export failed: {}", e);
            std::process::exit(1);
        }
    };
    let json = serde_json::to_string_pretty(&export).expect("Failed to serialize export");

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            fs::write(path, json).expect("Failed to write export file");
            println!(
                "{} Exported {} connections to {}",
                "✓".green().bold(),
                export.total_users,
                path.display().to_string().bright_white()
            );
        }
        None => println!("{}", json),
    }
}

pub fn handle_import(args: &ArgMatches) {
    let mut store = open_existing_store(args);
    let file = args.get_one::<PathBuf>("file").unwrap();

    let doc = match fs::read_to_string(file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("✗ Failed to read {}: {}", file.display(), e);
            std::process::exit(1);
        }
    };

    match import_graph(&mut store, &doc) {
        Ok(n) => println!("{} Imported {} connections", "✓".green().bold(), n),
        Err(e) => {
            eprintln!("✗ Import failed: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn handle_graph(args: &ArgMatches) {
    let store = open_existing_store(args);
    let map = store.load_connections().expect("Failed to read store");

    let doc = build_graph(&map);
    let json = serde_json::to_string_pretty(&doc).expect("Failed to serialize graph");

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            fs::write(path, json).expect("Failed to write graph file");
            println!(
                "{} Wrote {} nodes and {} edges to {}",
                "✓".green().bold(),
                doc.nodes.len(),
                doc.edges.len(),
                path.display().to_string().bright_white()
            );
        }
        None => println!("{}", json),
    }
}

pub fn handle_report(args: &ArgMatches) {
    let store = open_existing_store(args);
    let map = store.load_connections().expect("Failed to read store");
    print!("{}", generate_scan_report(&map));
}
