//! Audio cue playback
//!
//! Cues are played by spawning an external player on a randomly chosen clip.
//! Playback never blocks the caller; the player process is reaped in the background.

use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::types::Cue;
use crate::config::SoundsConfig;
use crate::error::{AppError, Result};

/// Something that can announce a cue
pub trait CuePlayer: Send + Sync {
    /// Start playing one clip of the category and return immediately
    fn play(&self, cue: Cue) -> Result<()>;
}

/// Plays pre-recorded clips with an external player
pub struct SoundBoard {
    config: SoundsConfig,
}

impl SoundBoard {
    pub fn new(config: SoundsConfig) -> Self {
        Self { config }
    }

    /// Pick one registered clip for the cue, uniformly at random
    pub fn pick_clip(&self, cue: Cue) -> Result<PathBuf> {
        let clip = self
            .config
            .cues
            .get(&cue)
            .and_then(|clips| clips.choose(&mut rand::thread_rng()))
            .ok_or_else(|| AppError::Config(format!("no sound clips for cue {}", cue)))?;
        Ok(PathBuf::from(&self.config.dir).join(clip))
    }
}

impl CuePlayer for SoundBoard {
    fn play(&self, cue: Cue) -> Result<()> {
        if !self.config.enabled {
            info!("Cue {} (sound disabled)", cue);
            return Ok(());
        }

        let clip = self.pick_clip(cue)?;
        debug!("Playing cue {}: {}", cue, clip.display());

        let mut child = Command::new(&self.config.player)
            .arg(&clip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                AppError::Command(format!("failed to start {}: {}", self.config.player, e))
            })?;

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    warn!("Player exited with {} for {}", status, clip.display())
                }
                Err(e) => warn!("Failed to wait for player: {}", e),
                _ => {}
            }
        });

        Ok(())
    }
}
