use clap::{Parser, Subcommand};

/// Reports the progress of HKN officers on their attendance requirements.
///
/// All the options may also be provided through environment variables or a `.env` file.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (URL) The CSV export of the spreadsheet with the self-reported attendance.
    #[clap(long, value_parser, env = "RESPONSES_URL")]
    pub responses_url: Option<String>,

    /// (URL) The CSV export of the spreadsheet with the official events.
    #[clap(long, value_parser, env = "EVENTS_URL")]
    pub events_url: Option<String>,

    /// (directory) Where the downloaded spreadsheets and the attendance summary are stored.
    #[clap(long, value_parser, env = "HKN_DATA_DIR", default_value = "data")]
    pub data_dir: String,

    /// (hours, default one week) The spreadsheets are downloaded again when the local copy is older than this.
    #[clap(long, value_parser, default_value_t = 168)]
    pub max_age_hours: u64,

    /// (seconds) Timeout for each HTTP request.
    #[clap(long, value_parser, default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Runs the webhook for the Slack slash command.
    Serve {
        /// (address) The address to listen on.
        #[clap(long, value_parser, default_value = "127.0.0.1:5000")]
        bind: String,

        /// The Slack bot token used to send the replies.
        #[clap(long, value_parser, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
        slack_bot_token: String,

        /// (URL) The base URL of the Slack Web API.
        #[clap(
            long,
            value_parser,
            env = "SLACK_API_URL",
            default_value = "https://slack.com/api"
        )]
        slack_api_url: String,

        /// (Slack user id, optional) The person to contact about bugs, mentioned at the end of each reply.
        #[clap(long, value_parser, env = "SUPPORT_CONTACT")]
        support_contact: Option<String>,
    },
    /// Downloads the spreadsheets now, rebuilds the summary and prints it in CSV format.
    Refresh {
        /// (file path) A reference summary in CSV format. If provided, the rebuilt summary must match it.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Prints the attendance of one person.
    Lookup {
        /// The handle of the person, as entered in the form.
        #[clap(value_parser)]
        handle: String,
    },
}
