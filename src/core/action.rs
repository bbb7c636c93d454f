//! Tag actions - what happens when a registered tag is scanned.
//!
//! # Key types
//!
//! - [`ActionKind`] - closed set of behaviors, matched exhaustively
//! - [`TagAction`] - descriptor stored in the registry and shown over HTTP
//! - [`ActionContext`] - handles an action may use while running
//!
//! # Wire format
//!
//! ```text
//! {"kind":"PlayResource","uid":"0A1B2C3D","alias":"Kids","parameter":"spotify:track:xyz"}
//! ```
//!
//! `alias` and `parameter` are always present (null when unset). `scanned`
//! (RFC 3339) only appears on copies published as the latest scan.

use super::player::{CoreError, PlayerCore};
use super::tag::TagUid;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::{Child, Command, Stdio};
use std::thread;
use thiserror::Error;

/// Action construction / invocation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Invalid tag class \"{0}\"")]
    InvalidKind(String),
    #[error("Tag class \"{0}\" cannot be registered")]
    NotRegistrable(ActionKind),
    #[error("Tag class \"{0}\" requires a parameter")]
    MissingParameter(ActionKind),
    #[error("Invalid parameter \"{value}\" for tag class \"{kind}\": {reason}")]
    InvalidParameter {
        kind: ActionKind,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Failed to start command: {0}")]
    Command(String),
}

/// Behavior bound to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Placeholder for scans of unregistered tags; does nothing.
    Unknown,
    PlayResource,
    RunCommand,
    PlayPause,
    Stop,
    NextTrack,
    PreviousTrack,
    Shuffle,
    Volume,
}

impl ActionKind {
    /// Kinds accepted by registration, in display order.
    pub const REGISTRABLE: [ActionKind; 8] = [
        ActionKind::PlayResource,
        ActionKind::RunCommand,
        ActionKind::PlayPause,
        ActionKind::Stop,
        ActionKind::NextTrack,
        ActionKind::PreviousTrack,
        ActionKind::Shuffle,
        ActionKind::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Unknown => "Unknown",
            ActionKind::PlayResource => "PlayResource",
            ActionKind::RunCommand => "RunCommand",
            ActionKind::PlayPause => "PlayPause",
            ActionKind::Stop => "Stop",
            ActionKind::NextTrack => "NextTrack",
            ActionKind::PreviousTrack => "PreviousTrack",
            ActionKind::Shuffle => "Shuffle",
            ActionKind::Volume => "Volume",
        }
    }

    /// Exact (case-sensitive) lookup by variant name.
    pub fn from_name(name: &str) -> Result<Self, ActionError> {
        let name = name.trim();
        [ActionKind::Unknown]
            .into_iter()
            .chain(Self::REGISTRABLE)
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ActionError::InvalidKind(name.to_string()))
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionKind::Unknown => "Unregistered tag, does nothing",
            ActionKind::PlayResource => "Replace the tracklist with a resource URI and play it",
            ActionKind::RunCommand => "Run a shell command",
            ActionKind::PlayPause => "Toggle between play and pause",
            ActionKind::Stop => "Stop playback",
            ActionKind::NextTrack => "Skip to the next track",
            ActionKind::PreviousTrack => "Go back to the previous track",
            ActionKind::Shuffle => "Shuffle the tracklist",
            ActionKind::Volume => "Set the volume (parameter 0-100)",
        }
    }

    pub fn registrable(self) -> bool {
        !matches!(self, ActionKind::Unknown)
    }

    pub fn needs_parameter(self) -> bool {
        matches!(
            self,
            ActionKind::PlayResource | ActionKind::RunCommand | ActionKind::Volume
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handles available to a running action.
pub struct ActionContext<'a> {
    pub core: &'a dyn PlayerCore,
}

/// Action descriptor: a registry entry, or a "last seen" copy of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAction {
    pub kind: ActionKind,
    pub uid: TagUid,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned: Option<DateTime<Utc>>,
}

impl TagAction {
    /// Build a registrable descriptor, validating the parameter for `kind`.
    ///
    /// Empty alias/parameter strings are treated as absent.
    pub fn new(
        kind: ActionKind,
        uid: TagUid,
        alias: Option<&str>,
        parameter: Option<&str>,
    ) -> Result<Self, ActionError> {
        if !kind.registrable() {
            return Err(ActionError::NotRegistrable(kind));
        }

        let alias = non_empty(alias);
        let parameter = non_empty(parameter);

        if kind.needs_parameter() && parameter.is_none() {
            return Err(ActionError::MissingParameter(kind));
        }
        if kind == ActionKind::Volume {
            if let Some(value) = &parameter {
                parse_volume(value)?;
            }
        }

        Ok(Self {
            kind,
            uid,
            alias,
            parameter,
            scanned: None,
        })
    }

    /// Transient descriptor for a tag that is not in the registry.
    pub fn unknown(uid: TagUid) -> Self {
        Self {
            kind: ActionKind::Unknown,
            uid,
            alias: None,
            parameter: None,
            scanned: None,
        }
    }

    /// Copy stamped with the scan time.
    pub fn scanned_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            scanned: Some(at),
            ..self.clone()
        }
    }

    /// Perform the action.
    pub fn invoke(&self, ctx: &ActionContext<'_>) -> Result<(), ActionError> {
        debug!("Invoking {} for tag {}", self.kind, self.uid);

        match self.kind {
            ActionKind::Unknown => Ok(()),
            ActionKind::PlayResource => {
                let uri = self.required_parameter()?;
                info!("Playing {}", uri);
                ctx.core.play_uri(uri)?;
                Ok(())
            }
            ActionKind::RunCommand => {
                let command_line = self.required_parameter()?;
                info!("Running command: {}", command_line);
                let child = shell_command(command_line)
                    .stdin(Stdio::null())
                    .spawn()
                    .map_err(|e| ActionError::Command(format!("{}: {}", command_line, e)))?;
                reap(child, command_line.to_string());
                Ok(())
            }
            ActionKind::PlayPause => Ok(ctx.core.toggle_pause()?),
            ActionKind::Stop => Ok(ctx.core.stop()?),
            ActionKind::NextTrack => Ok(ctx.core.next()?),
            ActionKind::PreviousTrack => Ok(ctx.core.previous()?),
            ActionKind::Shuffle => Ok(ctx.core.shuffle()?),
            ActionKind::Volume => {
                let volume = parse_volume(self.required_parameter()?)?;
                ctx.core.set_volume(volume)?;
                Ok(())
            }
        }
    }

    fn required_parameter(&self) -> Result<&str, ActionError> {
        self.parameter
            .as_deref()
            .ok_or(ActionError::MissingParameter(self.kind))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_volume(value: &str) -> Result<u8, ActionError> {
    let invalid = |reason: &str| ActionError::InvalidParameter {
        kind: ActionKind::Volume,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let volume: u8 = value
        .trim()
        .parse()
        .map_err(|_| invalid("expected an integer"))?;
    if volume > 100 {
        return Err(invalid("must be between 0 and 100"));
    }
    Ok(volume)
}

fn shell_command(command_line: &str) -> Command {
    #[cfg(windows)]
    let mut command = Command::new("cmd");
    #[cfg(windows)]
    command.arg("/C");
    #[cfg(not(windows))]
    let mut command = Command::new("sh");
    #[cfg(not(windows))]
    command.arg("-c");

    command.arg(command_line);
    command
}

/// Wait for `child` on its own thread; a command may run for as long as it likes.
fn reap(mut child: Child, command_line: String) {
    let spawned = thread::Builder::new()
        .name("tapdeck-command".to_string())
        .spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("Command finished: {}", command_line),
            Ok(status) => warn!("Command `{}` exited with {}", command_line, status),
            Err(e) => warn!("Failed to wait for `{}`: {}", command_line, e),
        });

    if let Err(e) = spawned {
        warn!("Command started but cannot be waited on: {}", e);
    }
}
