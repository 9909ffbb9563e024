use attendance::Category;
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::tracker::config_reader::SlackSettings;
use crate::tracker::*;

/// A message only visible to one user of a channel.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct EphemeralMessage {
    pub channel: String,
    pub user: String,
    pub blocks: Vec<JSValue>,
    /// Shown in notifications and by clients that cannot display blocks.
    pub text: String,
}

impl EphemeralMessage {
    pub fn render(
        channel_id: &str,
        user_id: &str,
        outcome: &LookupOutcome,
        support_contact: Option<&str>,
    ) -> EphemeralMessage {
        let (blocks, text) = match outcome {
            LookupOutcome::Found(row) => {
                let greeting = format!(
                    "Hello <@{}>, here is your current progress on HKN officer requirements:",
                    user_id
                );
                let attendance_block = row
                    .per_category()
                    .iter()
                    .map(|(c, n)| format!("*{}*: {}", c.column_name(), n))
                    .collect::<Vec<String>>()
                    .join("\n");
                let mut blocks = vec![
                    section(&greeting),
                    divider(),
                    section(&attendance_block),
                ];
                if let Some(contact) = support_contact {
                    blocks.push(divider());
                    blocks.push(section(&format!(
                        "If you have any questions/bug reports about this feature, feel free to ping <@{}>.",
                        contact
                    )));
                }
                let total: u64 = Category::ALL.iter().map(|c| row.count(*c)).sum();
                let text = format!(
                    "Your HKN officer requirements progress: {} activities attended",
                    total
                );
                (blocks, text)
            }
            LookupOutcome::NotFound(handle) => {
                let text = format!(
                    "No attendance has been recorded yet for the handle {}. Check that the handle you use in the attendance form matches your Slack name.",
                    handle
                );
                (vec![section(&format!("Hello <@{}>. {}", user_id, text))], text)
            }
            LookupOutcome::Unavailable => {
                let text =
                    "The attendance data is currently unavailable, please try again later."
                        .to_string();
                (vec![section(&format!("Hello <@{}>. {}", user_id, text))], text)
            }
        };
        EphemeralMessage {
            channel: channel_id.to_string(),
            user: user_id.to_string(),
            blocks,
            text,
        }
    }
}

fn section(markdown: &str) -> JSValue {
    json!({"type": "section", "text": {"type": "mrkdwn", "text": markdown}})
}

fn divider() -> JSValue {
    json!({"type": "divider"})
}

/// Where the replies go.
pub trait MessageSink {
    fn send(&self, message: &EphemeralMessage) -> TrackerResult<()>;
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}

/// Sends messages through the Slack Web API.
pub struct SlackClient {
    client: Client,
    settings: SlackSettings,
}

impl SlackClient {
    pub fn new(settings: SlackSettings) -> TrackerResult<SlackClient> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context(HttpClientSnafu {})?;
        Ok(SlackClient { client, settings })
    }

    pub fn post_ephemeral(&self, message: &EphemeralMessage) -> TrackerResult<()> {
        let url = format!(
            "{}/chat.postEphemeral",
            self.settings.api_url.trim_end_matches('/')
        );
        debug!("post_ephemeral: {} to {}", url, message.user);
        let resp = self
            .client
            .post(url.as_str())
            .bearer_auth(&self.settings.bot_token)
            .json(message)
            .send()
            .context(DeliveryRequestSnafu {})?;
        let status = resp.status();
        if !status.is_success() {
            return DeliverySnafu {
                error: format!("HTTP status {}", status.as_u16()),
            }
            .fail();
        }
        // Slack answers 200 even when the message is rejected.
        let answer: SlackResponse = resp.json().context(DeliveryRequestSnafu {})?;
        if !answer.ok {
            return DeliverySnafu {
                error: answer.error.unwrap_or_else(|| "unknown error".to_string()),
            }
            .fail();
        }
        info!("Sent attendance to {} in {}", message.user, message.channel);
        Ok(())
    }
}

impl MessageSink for SlackClient {
    fn send(&self, message: &EphemeralMessage) -> TrackerResult<()> {
        self.post_ephemeral(message)
    }
}
