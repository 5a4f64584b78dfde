use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use url::Url;

fn db_arg() -> Arg {
    arg!(-d --"db" <PATH>)
        .required(false)
        .help("Directory holding the lattice store")
        .default_value("~/.config/lattice/")
}

fn token_arg() -> Arg {
    arg!(-t --"token" <TOKEN>)
        .required(false)
        .help("API token (falls back to the LATTICE_TOKEN environment variable)")
}

fn base_url_arg() -> Arg {
    arg!(--"base-url" <URL>)
        .required(false)
        .help("Override the API base URL (useful for testing against a mock)")
        .value_parser(clap::value_parser!(Url))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("lattice")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("lattice")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the lattice store on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the lattice database")
                        .default_value("~/.config/lattice/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing store at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("count")
                .about("Fetch the root connection list and report how many entries a scan would cover")
                .arg(db_arg())
                .arg(token_arg())
                .arg(base_url_arg()),
        )
        .subcommand(
            command!("scan")
                .about(
                    "Crawl the connection graph. Resumes where the last scan left off and \
                persists every record as it lands.",
                )
                .arg(db_arg())
                .arg(token_arg())
                .arg(base_url_arg())
                .arg(
                    arg!(-l --"limit" <N>)
                        .required(false)
                        .help("Scan at most N root entries (default: all of them)")
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--"interval-ms" <MS>)
                        .required(false)
                        .help("Minimum spacing between outbound requests, in milliseconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1000"),
                ),
        )
        .subcommand(
            command!("stop")
                .about("Ask the running scan to halt at the next entry boundary")
                .arg(db_arg()),
        )
        .subcommand(
            command!("status")
                .about("Show the size of the map and any in-flight scan progress")
                .arg(db_arg()),
        )
        .subcommand(
            command!("clear")
                .about("Delete the connection map and all scan state")
                .arg(db_arg())
                .arg(
                    arg!(-f - -"force")
                        .help("Skip the confirmation prompt")
                        .required(false),
                ),
        )
        .subcommand(
            command!("export")
                .about("Write the connection map as a timestamped JSON document")
                .arg(db_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the document to a file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("import")
                .about("Replace the connection map with a previously exported document")
                .arg(db_arg())
                .arg(
                    arg!(-f --"file" <PATH>)
                        .required(true)
                        .help("The export document to load")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("graph")
                .about("Render the map as a node/edge document for the graph viewer")
                .arg(db_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the document to a file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("report")
                .about("Print a text summary of the crawled graph")
                .arg(db_arg()),
        )
}
