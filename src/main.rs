use clap::{crate_version, App, Arg};
use docsmith::build::build_site;
use docsmith::config::Config;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = App::new("docsmith")
        .version(crate_version!())
        .about("Builds a static documentation website")
        .arg(
            Arg::with_name("ROOT")
                .help("The project directory")
                .default_value(".")
                .index(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Logs each build stage (-vv for each file)"),
        )
        .get_matches();

    // -v enables INFO, -vv DEBUG, otherwise use RUST_LOG or default to WARN
    let filter = match matches.occurrences_of("verbose") {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let root = Path::new(matches.value_of("ROOT").unwrap_or("."));
    let result = Config::from_directory(root)
        .map_err(docsmith::build::Error::from)
        .and_then(|config| build_site(&config));

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}
