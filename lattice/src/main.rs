use clap;
use colored::Colorize;
use commands::command_argument_builder;

mod commands;
mod handlers;

const BANNER: &str = r#"
 _       _   _   _
| | __ _| |_| |_(_) ___ ___
| |/ _` | __| __| |/ __/ _ \
| | (_| | |_| |_| | (_|  __/
|_|\__,_|\__|\__|_|\___\___|
"#;

fn print_banner() {
    println!("{}", BANNER.bright_cyan());
    println!(
        "  {} v{}\n",
        "mutual-connection graph crawler".bright_white(),
        env!("CARGO_PKG_VERSION")
    );
}

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handlers::handle_init(primary_command),
        Some(("count", primary_command)) => handlers::handle_count(primary_command).await,
        Some(("scan", primary_command)) => handlers::handle_scan(primary_command).await,
        Some(("stop", primary_command)) => handlers::handle_stop(primary_command),
        Some(("status", primary_command)) => handlers::handle_status(primary_command),
        Some(("clear", primary_command)) => handlers::handle_clear(primary_command),
        Some(("export", primary_command)) => handlers::handle_export(primary_command),
        Some(("import", primary_command)) => handlers::handle_import(primary_command),
        Some(("graph", primary_command)) => handlers::handle_graph(primary_command),
        Some(("report", primary_command)) => handlers::handle_report(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
