//! Argument definitions

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `labeltrace` command tree
pub fn build_cli() -> Command {
    Command::new("labeltrace")
        .version(labeltrace_core::VERSION)
        .about("Scan product labels and look up their traceability records")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML scan configuration"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Traceability service root, overrides the config file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("normalize")
                .about("Print the lookup identifier for a scanned payload")
                .arg(Arg::new("payload").required(true).help("Decoded code text")),
        )
        .subcommand(
            Command::new("lookup")
                .about("Resolve a scanned payload against the traceability service")
                .arg(Arg::new("payload").required(true).help("Decoded code text"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full record as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a scan session against a synthetic camera")
                .arg(
                    Arg::new("payload")
                        .long("payload")
                        .required(true)
                        .help("Payload the scripted decoder reports"),
                )
                .arg(
                    Arg::new("detect-on-tick")
                        .long("detect-on-tick")
                        .default_value("3")
                        .value_parser(value_parser!(u32).range(1..))
                        .help("Sampling tick on which the payload is detected"),
                ),
        )
}
