//! Transfer Executor
//!
//! Copies the media directory from the source drive to the backup drive and unmounts
//! drives. Both steps run external commands and block the caller until they finish.
//! Failures are logged and reported as `false`, never raised.

mod command;

pub use command::{run_command, CommandOutput};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::TransferConfig;

/// Copy and unmount operations
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Recursively copy `<source_mount>/<source_subpath>/` into `<dest_mount>/<dest_subpath>/`
    async fn copy(
        &self,
        source_mount: &Path,
        source_subpath: &str,
        dest_mount: &Path,
        dest_subpath: &str,
    ) -> bool;

    /// Unmount a single device node
    async fn unmount(&self, device: &str) -> bool;
}

/// Transfer executor running the configured copy and unmount tools
pub struct CommandTransfer {
    copy_command: Vec<String>,
    unmount_command: Vec<String>,
    copy_timeout: Option<Duration>,
}

impl CommandTransfer {
    pub fn new(config: &TransferConfig) -> Self {
        Self {
            copy_command: config.copy_command.clone(),
            unmount_command: config.unmount_command.clone(),
            copy_timeout: config.copy_timeout(),
        }
    }

    /// Full copy command line for the given directories
    pub fn copy_argv(&self, source: &Path, destination: &Path) -> Vec<String> {
        let mut argv = self.copy_command.clone();
        argv.push(dir_arg(source));
        argv.push(dir_arg(destination));
        argv
    }

    pub fn unmount_argv(&self, device: &str) -> Vec<String> {
        let mut argv = self.unmount_command.clone();
        argv.push(device.to_string());
        argv
    }

    async fn run(&self, what: &str, argv: &[String], timeout: Option<Duration>) -> bool {
        match run_command(argv, timeout).await {
            Ok(out) if out.success => true,
            Ok(out) => {
                warn!(
                    stdout = %out.stdout,
                    stderr = %out.stderr,
                    "{} failed: {}",
                    what,
                    argv.join(" ")
                );
                false
            }
            Err(e) => {
                warn!("{} failed: {}", what, e);
                false
            }
        }
    }
}

#[async_trait]
impl Transfer for CommandTransfer {
    async fn copy(
        &self,
        source_mount: &Path,
        source_subpath: &str,
        dest_mount: &Path,
        dest_subpath: &str,
    ) -> bool {
        let source = source_mount.join(source_subpath);
        let destination = dest_mount.join(dest_subpath);
        let argv = self.copy_argv(&source, &destination);

        info!("Copying {} to {}", source.display(), destination.display());
        let ok = self.run("Copy", &argv, self.copy_timeout).await;
        if ok {
            info!("Copy finished");
        }
        ok
    }

    async fn unmount(&self, device: &str) -> bool {
        info!("Unmounting {}", device);
        self.run("Unmount", &self.unmount_argv(device), None).await
    }
}

/// Directory argument with a trailing slash (copy contents, not the directory itself)
fn dir_arg(path: &Path) -> String {
    let mut arg = path.to_string_lossy().to_string();
    if !arg.ends_with('/') {
        arg.push('/');
    }
    arg
}
