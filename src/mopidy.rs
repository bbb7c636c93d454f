//! Mopidy player core over its HTTP JSON-RPC endpoint (`/mopidy/rpc`).

use crate::core::player::{CoreError, PlayerCore};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC client for a running Mopidy server.
pub struct MopidyClient {
    rpc_url: String,
    agent: ureq::Agent,
    next_id: AtomicU64,
}

impl MopidyClient {
    /// `base_url` is the Mopidy HTTP root, e.g. `http://127.0.0.1:6680`.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Self {
            rpc_url: format!("{}/mopidy/rpc", base_url.trim_end_matches('/')),
            agent,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, CoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request_body(id, method, params);
        log::trace!("Mopidy request: {}", body);

        let reply: Value = match self.agent.post(&self.rpc_url).send_json(&body) {
            Ok(resp) => resp
                .into_json::<Value>()
                .map_err(|_| CoreError::UnexpectedReply(method.to_string()))?,
            Err(ureq::Error::Status(code, _)) => {
                return Err(CoreError::Transport(format!("HTTP {} from {}", code, self.rpc_url)));
            }
            Err(e) => return Err(CoreError::Transport(e.to_string())),
        };

        parse_reply(method, reply)
    }
}

fn request_body(id: u64, method: &str, params: Value) -> Value {
    let mut body = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if !params.is_null() {
        body["params"] = params;
    }
    body
}

fn parse_reply(method: &str, mut reply: Value) -> Result<Value, CoreError> {
    if let Some(error) = reply.get("error") {
        return Err(CoreError::Rpc {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    match reply.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(CoreError::UnexpectedReply(method.to_string())),
    }
}

impl PlayerCore for MopidyClient {
    fn play_uri(&self, uri: &str) -> Result<(), CoreError> {
        self.call("core.tracklist.clear", Value::Null)?;
        let added = self.call("core.tracklist.add", json!({ "uris": [uri] }))?;
        if added.as_array().is_some_and(Vec::is_empty) {
            log::warn!("Mopidy found nothing to play for {}", uri);
        }
        self.call("core.playback.play", Value::Null)?;
        Ok(())
    }

    fn toggle_pause(&self) -> Result<(), CoreError> {
        let state = self.call("core.playback.get_state", Value::Null)?;
        let method = match state.as_str() {
            Some("playing") => "core.playback.pause",
            Some("paused") => "core.playback.resume",
            _ => "core.playback.play",
        };
        self.call(method, Value::Null)?;
        Ok(())
    }

    fn stop(&self) -> Result<(), CoreError> {
        self.call("core.playback.stop", Value::Null).map(drop)
    }

    fn next(&self) -> Result<(), CoreError> {
        self.call("core.playback.next", Value::Null).map(drop)
    }

    fn previous(&self) -> Result<(), CoreError> {
        self.call("core.playback.previous", Value::Null).map(drop)
    }

    fn shuffle(&self) -> Result<(), CoreError> {
        self.call("core.tracklist.shuffle", Value::Null).map(drop)
    }

    fn set_volume(&self, volume: u8) -> Result<(), CoreError> {
        self.call("core.mixer.set_volume", json!({ "volume": volume }))
            .map(drop)
    }
}
