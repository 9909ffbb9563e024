mod args;
mod tracker;

use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};
use snafu::{whatever, ErrorCompat};

use crate::args::{Args, Command};
use crate::tracker::cache::{AttendanceCache, HttpSource};
use crate::tracker::config_reader::*;
use crate::tracker::slack::SlackClient;
use crate::tracker::{webhook, Tracker, TrackerResult};

fn run(args: &Args) -> TrackerResult<ExitCode> {
    let sources = SourceSettings::from_args(args)?;
    let cache_settings = CacheSettings::from_args(args);
    debug!("sources: {:?} cache: {:?}", sources, cache_settings);
    let cache = AttendanceCache::new(cache_settings, HttpSource::new(sources)?);

    match &args.command {
        Command::Serve { .. } => {
            let (server_settings, slack_settings) =
                match (ServerSettings::from_args(args), SlackSettings::from_args(args)) {
                    (Some(server), Some(slack)) => (server, slack),
                    _ => whatever!("Missing settings for the serve command"),
                };
            info!("slack: {:?}", slack_settings);
            let support_contact = slack_settings.support_contact.clone();
            let tracker = Tracker::new(cache, SlackClient::new(slack_settings)?, support_contact);
            webhook::serve(&server_settings, &tracker)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Refresh { reference } => {
            tracker::run_refresh(&cache, reference.clone())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Lookup { handle } => {
            if tracker::run_lookup(&cache, handle)? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
    }
}

fn main() -> ExitCode {
    // A missing .env file is not an error: the settings may come from the environment.
    let dotenv_res = dotenvy::dotenv();

    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    if let Ok(path) = dotenv_res {
        debug!("Loaded settings from {}", path.display());
    }

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("An error occured: {}", e);
            for cause in ErrorCompat::iter_chain(&e).skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            ExitCode::FAILURE
        }
    }
}
