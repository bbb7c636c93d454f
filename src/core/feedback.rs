//! Audible scan feedback.
//!
//! [`CommandFeedback`] shells out to a sound player (`aplay -q` by default) on
//! the worker pool. Playback problems are logged and never reach the scanner.

use super::workers::Workers;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Feedback clip to play after a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Tag found in the registry
    Success,
    /// Tag not registered
    Failure,
}

impl Cue {
    pub fn file_name(self) -> &'static str {
        match self {
            Cue::Success => "success.wav",
            Cue::Failure => "fail.wav",
        }
    }
}

/// Fire-and-forget feedback player.
pub trait Feedback: Send + Sync {
    fn play(&self, cue: Cue);
}

/// No sound at all (`--no-sound`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl Feedback for SilentFeedback {
    fn play(&self, cue: Cue) {
        debug!("Feedback {:?} (silent)", cue);
    }
}

/// Plays cue files from `sounds_dir` with an external player command.
pub struct CommandFeedback {
    program: String,
    args: Vec<String>,
    sounds_dir: PathBuf,
    workers: Arc<Workers>,
}

impl CommandFeedback {
    /// `command` is the player invocation, e.g. `["aplay", "-q"]`; the cue file path is appended.
    pub fn new(command: &[String], sounds_dir: impl Into<PathBuf>, workers: Arc<Workers>) -> Self {
        let (program, args) = match command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => ("aplay".to_string(), vec!["-q".to_string()]),
        };

        Self {
            program,
            args,
            sounds_dir: sounds_dir.into(),
            workers,
        }
    }

    pub fn cue_path(&self, cue: Cue) -> PathBuf {
        self.sounds_dir.join(cue.file_name())
    }
}

impl Feedback for CommandFeedback {
    fn play(&self, cue: Cue) {
        let path = self.cue_path(cue);
        if !path.is_file() {
            debug!("No feedback sound at {}, skipping", path.display());
            return;
        }

        let program = self.program.clone();
        let args = self.args.clone();

        self.workers.execute(move || {
            let status = Command::new(&program)
                .args(&args)
                .arg(&path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .status();

            match status {
                Ok(s) if s.success() => {}
                Ok(s) => warn!("{} {} exited with {}", program, path.display(), s),
                Err(e) => warn!("Failed to run {}: {}", program, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cue_paths() {
        let workers = Arc::new(Workers::new(1).unwrap());
        let feedback = CommandFeedback::new(&[], "/opt/sounds", workers);
        assert_eq!(feedback.cue_path(Cue::Success), PathBuf::from("/opt/sounds/success.wav"));
        assert_eq!(feedback.cue_path(Cue::Failure), PathBuf::from("/opt/sounds/fail.wav"));
    }

    #[test]
    fn test_missing_player_does_not_panic() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("fail.wav"), b"RIFF").unwrap();

        let workers = Arc::new(Workers::new(1).unwrap());
        let command = vec!["tapdeck-no-such-player".to_string()];
        let feedback = CommandFeedback::new(&command, temp_dir.path(), workers);

        feedback.play(Cue::Failure);
        feedback.play(Cue::Success); // file missing, skipped
    }
}
