use crate::CLAP_STYLING;
use clap::{arg, command};

pub fn command_argument_builder() -> clap::Command {
    command!("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .about("Crawl every page of a single host and write out its sitemap")
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .required(true)
                .help("Entry URL of the site to crawl, e.g. https://monzo.com"),
        )
        .arg(
            arg!(-f --"filename" <NAME>)
                .required(false)
                .help("Output file name without extension (default: the target host)"),
        )
        .arg(
            arg!(-m --"map-type" <TYPE>)
                .required(false)
                .help("Sitemap shape: hash (adjacency list) or tree (page tree)")
                .default_value("hash"),
        )
        .arg(
            arg!(-o --"format" <FORMAT>)
                .required(false)
                .help("Output format: json or xml")
                .default_value("json"),
        )
        .arg(
            arg!(-v --"verbose" "Log per-page failures and debug output")
                .required(false),
        )
        .arg(
            arg!(-q --"quiet" "Suppress the progress spinner and summary")
                .required(false),
        )
        .arg(
            arg!(-p --"parallel" "Limit concurrent fetches to the number of logical CPUs")
                .required(false),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("Maximum concurrent fetches (overrides --parallel)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(-t --"timeout" <SECONDS>)
                .required(false)
                .help("Per-request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("10"),
        )
        .arg(
            arg!(-d --"deadline" <SECONDS>)
                .required(false)
                .help("Stop the whole crawl after this many seconds and write what was found")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            arg!(--"keep-evicted" "Keep non-HTML pages in the page tree after dropping them from the map")
                .required(false),
        )
}
