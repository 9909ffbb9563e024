use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use snafu::prelude::*;

use crate::args::{Args, Command};
use crate::tracker::*;

/// Where the two spreadsheets are published.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceSettings {
    pub responses_url: String,
    pub events_url: String,
    pub timeout: Duration,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CacheSettings {
    pub data_dir: PathBuf,
    /// A summary older than this is rebuilt on the next request.
    pub max_age: Duration,
}

#[derive(Eq, PartialEq, Clone)]
pub struct SlackSettings {
    pub bot_token: String,
    pub api_url: String,
    pub support_contact: Option<String>,
    pub timeout: Duration,
}

// The token must not end up in the logs.
impl fmt::Debug for SlackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackSettings")
            .field("bot_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("support_contact", &self.support_contact)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl SourceSettings {
    pub fn from_args(args: &Args) -> TrackerResult<SourceSettings> {
        let responses_url = args.responses_url.clone().context(MissingSettingSnafu {
            name: "RESPONSES_URL",
            flag: "responses-url",
        })?;
        let events_url = args.events_url.clone().context(MissingSettingSnafu {
            name: "EVENTS_URL",
            flag: "events-url",
        })?;
        Ok(SourceSettings {
            responses_url,
            events_url,
            timeout: Duration::from_secs(args.fetch_timeout_secs),
        })
    }
}

impl CacheSettings {
    pub fn from_args(args: &Args) -> CacheSettings {
        CacheSettings {
            data_dir: PathBuf::from(&args.data_dir),
            max_age: Duration::from_secs(args.max_age_hours.saturating_mul(3600)),
        }
    }
}

impl SlackSettings {
    /// Only the `serve` command talks to Slack.
    pub fn from_args(args: &Args) -> Option<SlackSettings> {
        match &args.command {
            Command::Serve {
                slack_bot_token,
                slack_api_url,
                support_contact,
                ..
            } => Some(SlackSettings {
                bot_token: slack_bot_token.clone(),
                api_url: slack_api_url.clone(),
                support_contact: match support_contact.clone() {
                    Some(x) if x.trim().is_empty() => None,
                    x => x,
                },
                timeout: Duration::from_secs(args.fetch_timeout_secs),
            }),
            _ => None,
        }
    }
}

impl ServerSettings {
    pub fn from_args(args: &Args) -> Option<ServerSettings> {
        match &args.command {
            Command::Serve { bind, .. } => Some(ServerSettings { bind: bind.clone() }),
            _ => None,
        }
    }
}
