//! Player core handle - the external music player actions drive.
//!
//! The scanner never talks to a concrete player. It hands a `&dyn PlayerCore`
//! to [`TagAction::invoke`](super::action::TagAction::invoke), and the action
//! decides which calls to make. `mopidy::MopidyClient` is the shipped
//! implementation; tests use a recording fake.

use thiserror::Error;

/// Failure reported by a player core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("player unreachable: {0}")]
    Transport(String),
    #[error("player rejected {method}: {message} (code {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("unexpected reply to {0}")]
    UnexpectedReply(String),
}

/// Operations tag actions may perform on the player.
pub trait PlayerCore: Send + Sync {
    /// Replace the current tracklist with `uri` and start playing it.
    fn play_uri(&self, uri: &str) -> Result<(), CoreError>;
    /// Pause when playing, resume when paused, play when stopped.
    fn toggle_pause(&self) -> Result<(), CoreError>;
    fn stop(&self) -> Result<(), CoreError>;
    fn next(&self) -> Result<(), CoreError>;
    fn previous(&self) -> Result<(), CoreError>;
    fn shuffle(&self) -> Result<(), CoreError>;
    /// Set mixer volume, 0..=100.
    fn set_volume(&self, volume: u8) -> Result<(), CoreError>;
}
