// The HTTP endpoint called by Slack for the slash command.

use std::io::Read;

use log::{debug, info, warn};
use serde::Deserialize;
use snafu::prelude::*;
use tiny_http::{Method, Request, Response, Server, StatusCode};

use crate::tracker::cache::RawSource;
use crate::tracker::config_reader::ServerSettings;
use crate::tracker::slack::MessageSink;
use crate::tracker::*;

/// The fields of the slash command payload that are used. Slack sends many
/// more, they are ignored.
#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
pub struct SlashCommand {
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
}

pub fn parse_slash_command(body: &[u8]) -> TrackerResult<SlashCommand> {
    serde_urlencoded::from_bytes(body).context(ParsingFormSnafu {})
}

pub fn bind(settings: &ServerSettings) -> TrackerResult<Server> {
    Server::http(settings.bind.as_str()).map_err(|e| TrackerError::ServerStart {
        bind: settings.bind.clone(),
        message: e.to_string(),
    })
}

/// Answers the requests one at a time, forever.
pub fn serve<S: RawSource, M: MessageSink>(
    settings: &ServerSettings,
    tracker: &Tracker<S, M>,
) -> TrackerResult<()> {
    let server = bind(settings)?;
    info!("Listening on {}", server.server_addr());
    for request in server.incoming_requests() {
        handle_request(request, tracker);
    }
    Ok(())
}

/// Acknowledges the request immediately, then looks up the attendance and
/// sends the reply. Failures are only logged: Slack already got its answer.
pub fn handle_request<S: RawSource, M: MessageSink>(mut request: Request, tracker: &Tracker<S, M>) {
    debug!("handle_request: {} {}", request.method(), request.url());
    if request.method() != &Method::Post {
        let _ = request.respond(Response::empty(StatusCode(405)));
        return;
    }

    let mut body: Vec<u8> = Vec::new();
    let read_res = request.as_reader().read_to_end(&mut body);
    if let Err(e) = request.respond(Response::empty(StatusCode(200))) {
        warn!("handle_request: could not acknowledge the request: {}", e);
    }
    if let Err(e) = read_res {
        warn!("handle_request: could not read the request body: {}", e);
        return;
    }

    let command = match parse_slash_command(&body) {
        Ok(c) => c,
        Err(e) => {
            warn!("handle_request: dropping request: {}", e);
            return;
        }
    };
    if let Err(e) = tracker.reply(&command) {
        warn!(
            "handle_request: could not reply to {} ({}): {}",
            command.user_name, command.user_id, e
        );
    }
}
