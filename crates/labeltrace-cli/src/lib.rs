//! LabelTrace command-line tool
//!
//! `normalize`, `lookup` and `simulate` over the scan pipeline in
//! `labeltrace-core` and the HTTP resolver in `labeltrace-http`.

#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod synthetic;

use anyhow::{bail, Result};
use clap::ArgMatches;
use labeltrace_core::normalize;
use logging::LogConfig;
use std::ffi::OsString;
use std::path::PathBuf;

pub use cli::build_cli;

/// Parse `args`, set up logging and run the selected subcommand
pub async fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match build_cli().try_get_matches_from(args) {
        Ok(matches) => matches,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(err.into()),
    };

    let log_config = LogConfig {
        verbose: matches.get_flag("verbose"),
        json: matches.get_flag("json-logs"),
    };
    if let Err(err) = logging::init_logging(log_config) {
        eprintln!("logging disabled: {err}");
    }

    dispatch(&matches).await
}

async fn dispatch(matches: &ArgMatches) -> Result<()> {
    let config_path = matches.get_one::<PathBuf>("config");
    let base_url = matches.get_one::<String>("base-url");

    match matches.subcommand() {
        Some(("normalize", args)) => {
            let payload = required(args, "payload")?;
            println!("{}", normalize(payload));
        }
        Some(("lookup", args)) => {
            let config = commands::load_config(config_path.map(PathBuf::as_path), base_url.map(String::as_str))?;
            let payload = required(args, "payload")?;
            let output = commands::lookup(&config, payload, args.get_flag("json")).await?;
            println!("{output}");
        }
        Some(("simulate", args)) => {
            let config = commands::load_config(config_path.map(PathBuf::as_path), base_url.map(String::as_str))?;
            let payload = required(args, "payload")?;
            let detect_on = args.get_one::<u32>("detect-on-tick").copied().unwrap_or(1);
            commands::simulate(&config, payload, detect_on).await?;
        }
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("no subcommand given"),
    }
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    match args.get_one::<String>(name) {
        Some(value) => Ok(value.as_str()),
        None => bail!("missing argument <{name}>"),
    }
}
