//! Repointing the active-version alias.
//!
//! The alias is a directory symlink that always points at one installed
//! `v<version>` directory. Switching removes the old link and creates a new
//! one; between the two calls the alias is briefly absent. When the OS refuses
//! to create or remove the link, one more attempt is made through an elevated
//! sub-process. A link that already exists at creation time (another process
//! raced us) is removed and the whole switch is retried once.

use crate::index;
use crate::platform;
use crate::version::Version;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Total attempts when link creation keeps hitting an existing entry.
pub const MAX_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasState {
    Unlinked,
    LinkedTo(PathBuf),
    /// The link exists but its target has been removed.
    StaleLinkPresent(PathBuf),
    /// Something that is not a symlink sits at the alias path.
    Foreign,
    OperationInProgress,
}

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("Flutter SDK {version} is not installed. Install it with `flutterver install {version}`")]
    VersionNotInstalled { version: Version },
    #[error("Permission denied while replacing {}: {message}. Re-run from an elevated shell", .path.display())]
    AccessDenied { path: PathBuf, message: String },
    #[error("{} kept reappearing while linking it: {message}", .path.display())]
    LinkConflict { path: PathBuf, message: String },
    #[error("Elevated link creation failed: {0}")]
    EscalationFailed(String),
    #[error("{} exists and is not a symlink; move it out of the way first", .path.display())]
    AliasOccupied { path: PathBuf },
    #[error("Could not link {}: {message}", .path.display())]
    LinkFailed { path: PathBuf, message: String },
    #[error("Could not remove {}: {message}", .path.display())]
    RemoveFailed { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFailure {
    AccessDenied,
    InsufficientPrivilege,
    AlreadyExists,
    Other,
}

impl LinkFailure {
    pub fn is_permission(self) -> bool {
        matches!(self, LinkFailure::AccessDenied | LinkFailure::InsufficientPrivilege)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LinkError {
    pub kind: LinkFailure,
    pub message: String,
}

impl LinkError {
    pub fn new(kind: LinkFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify from command output or an OS message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(classify_message(&message), message)
    }
}

impl From<io::Error> for LinkError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => LinkFailure::AccessDenied,
            io::ErrorKind::AlreadyExists => LinkFailure::AlreadyExists,
            _ => classify_message(&err.to_string()),
        };
        Self::new(kind, err.to_string())
    }
}

pub fn classify_message(message: &str) -> LinkFailure {
    let lower = message.to_lowercase();
    if lower.contains("access is denied")
        || lower.contains("access denied")
        || lower.contains("permission denied")
        || lower.contains("operation not permitted")
    {
        LinkFailure::AccessDenied
    } else if lower.contains("privilege") {
        LinkFailure::InsufficientPrivilege
    } else if lower.contains("already exists") || lower.contains("file exists") {
        LinkFailure::AlreadyExists
    } else {
        LinkFailure::Other
    }
}

/// Filesystem operations the switch needs, some of which may require elevation.
pub trait LinkOps {
    /// Remove a link or directory tree. A missing entry is not an error.
    fn remove_entry(&self, path: &Path) -> Result<(), LinkError>;
    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<(), LinkError>;
    fn create_dir_link_elevated(&self, link: &Path, target: &Path) -> Result<(), LinkError>;
    fn remove_entry_elevated(&self, path: &Path) -> Result<(), LinkError>;
}

/// [`LinkOps`] backed by the real filesystem.
pub struct SystemLinker;

impl LinkOps for SystemLinker {
    fn remove_entry(&self, path: &Path) -> Result<(), LinkError> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if metadata.file_type().is_symlink() {
            // Windows directory links are removed like directories
            if cfg!(windows) {
                fs::remove_dir(path).or_else(|_| fs::remove_file(path))?;
            } else {
                fs::remove_file(path)?;
            }
        } else if metadata.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
        #[cfg(unix)]
        std::os::unix::fs::symlink(target, link)?;
        #[cfg(windows)]
        std::os::windows::fs::symlink_dir(target, link)?;
        Ok(())
    }

    fn create_dir_link_elevated(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
        run_elevated(platform::escalated_link_command(link, target))?;

        // Start-Process reports success even if the user declined the prompt
        if fs::symlink_metadata(link).is_err() {
            return Err(LinkError::new(
                LinkFailure::Other,
                "elevated command finished but no link was created",
            ));
        }
        Ok(())
    }

    fn remove_entry_elevated(&self, path: &Path) -> Result<(), LinkError> {
        run_elevated(platform::escalated_remove_command(path))?;

        if fs::symlink_metadata(path).is_ok() {
            return Err(LinkError::new(
                LinkFailure::Other,
                "elevated command finished but the link is still there",
            ));
        }
        Ok(())
    }
}

fn run_elevated(mut cmd: Command) -> Result<(), LinkError> {
    tracing::debug!("Executing elevated: {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| LinkError::new(LinkFailure::Other, e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(LinkError::from_message(if stderr.is_empty() {
            format!("elevated command exited with {}", output.status)
        } else {
            stderr
        }));
    }
    Ok(())
}

/// Handle to the alias path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAlias {
    path: PathBuf,
}

impl ActiveAlias {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn inspect(&self) -> AliasState {
        let Ok(metadata) = fs::symlink_metadata(&self.path) else {
            return AliasState::Unlinked;
        };
        if !metadata.file_type().is_symlink() {
            return AliasState::Foreign;
        }

        let target = fs::read_link(&self.path).unwrap_or_default();
        if self.path.exists() {
            AliasState::LinkedTo(target)
        } else {
            AliasState::StaleLinkPresent(target)
        }
    }

    /// The installed version the alias currently resolves to.
    pub fn current_version(&self) -> Option<Version> {
        match self.inspect() {
            AliasState::LinkedTo(target) => index::version_from_dir(&target),
            _ => None,
        }
    }
}

pub struct ActiveVersionSwitch<L> {
    alias: ActiveAlias,
    ops: L,
    state: AliasState,
}

impl<L: LinkOps> ActiveVersionSwitch<L> {
    pub fn new(alias: ActiveAlias, ops: L) -> Self {
        let state = alias.inspect();
        Self { alias, ops, state }
    }

    pub fn state(&self) -> &AliasState {
        &self.state
    }

    /// Point the alias at the installed `version` under `root`.
    pub fn activate(&mut self, root: &Path, version: &Version) -> Result<(), SwitchError> {
        let result = self.try_activate(root, version);
        if result.is_err() {
            self.state = self.alias.inspect();
        }
        result
    }

    fn try_activate(&mut self, root: &Path, version: &Version) -> Result<(), SwitchError> {
        // A relative target would be resolved from the alias's directory
        let root = std::path::absolute(root).map_err(|e| SwitchError::LinkFailed {
            path: self.alias.path().to_path_buf(),
            message: e.to_string(),
        })?;
        let root = root.as_path();
        let target = index::version_dir(root, version);
        let link = self.alias.path().to_path_buf();

        for attempt in 1..=MAX_ATTEMPTS {
            if !index::is_installed(root, version) {
                return Err(SwitchError::VersionNotInstalled {
                    version: version.clone(),
                });
            }

            let previous = self.alias.inspect();
            if previous == AliasState::Foreign {
                return Err(SwitchError::AliasOccupied { path: link });
            }
            self.state = AliasState::OperationInProgress;
            tracing::debug!(
                "Switching {} to {} (attempt {}, was {:?})",
                link.display(),
                target.display(),
                attempt,
                previous
            );

            if let Some(parent) = link.parent() {
                fs::create_dir_all(parent).map_err(|e| SwitchError::LinkFailed {
                    path: link.clone(),
                    message: e.to_string(),
                })?;
            }

            if previous != AliasState::Unlinked {
                match self.remove_alias(&link) {
                    Ok(()) => {}
                    Err(e) if e.kind.is_permission() => {
                        return Err(SwitchError::AccessDenied {
                            path: link,
                            message: e.message,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Could not remove {}: {}", link.display(), e);
                    }
                }
            }

            let err = match self.ops.create_dir_link(&link, &target) {
                Ok(()) => {
                    self.linked(&link, target);
                    return Ok(());
                }
                Err(e) => e,
            };

            match err.kind {
                LinkFailure::AccessDenied | LinkFailure::InsufficientPrivilege => {
                    tracing::info!("Link creation denied ({}), retrying elevated", err);
                    self.ops
                        .create_dir_link_elevated(&link, &target)
                        .map_err(|e| SwitchError::EscalationFailed(e.message))?;
                    self.linked(&link, target);
                    return Ok(());
                }
                LinkFailure::AlreadyExists if attempt < MAX_ATTEMPTS => {
                    tracing::warn!("{} appeared while switching, removing it", link.display());
                    match self.remove_alias(&link) {
                        Ok(()) => continue,
                        Err(e) if e.kind.is_permission() => {
                            return Err(SwitchError::AccessDenied {
                                path: link,
                                message: e.message,
                            });
                        }
                        Err(e) => {
                            return Err(SwitchError::LinkConflict {
                                path: link,
                                message: e.message,
                            });
                        }
                    }
                }
                LinkFailure::AlreadyExists => {
                    return Err(SwitchError::LinkConflict {
                        path: link,
                        message: err.message,
                    });
                }
                LinkFailure::Other => {
                    return Err(SwitchError::LinkFailed {
                        path: link,
                        message: err.message,
                    });
                }
            }
        }

        Err(SwitchError::LinkConflict {
            path: link,
            message: "retries exhausted".to_string(),
        })
    }

    /// Remove the alias entry, retrying once elevated when the OS denies it.
    fn remove_alias(&self, link: &Path) -> Result<(), LinkError> {
        match self.ops.remove_entry(link) {
            Err(e) if e.kind.is_permission() => {
                tracing::info!("Removal denied ({}), retrying elevated", e);
                self.ops.remove_entry_elevated(link).map_err(|elevated| {
                    LinkError::new(
                        LinkFailure::AccessDenied,
                        format!("{}; elevated removal failed: {}", e.message, elevated),
                    )
                })
            }
            other => other,
        }
    }

    fn linked(&mut self, link: &Path, target: PathBuf) {
        tracing::info!("Linked {} -> {}", link.display(), target.display());
        self.state = AliasState::LinkedTo(target);
    }

    /// Remove the alias so that no version is active.
    pub fn disable(&mut self) -> Result<(), SwitchError> {
        match self.alias.inspect() {
            AliasState::Unlinked => {
                tracing::info!("No active version to disable");
                self.state = AliasState::Unlinked;
                return Ok(());
            }
            AliasState::Foreign => {
                return Err(SwitchError::AliasOccupied {
                    path: self.alias.path().to_path_buf(),
                });
            }
            _ => {}
        }

        let path = self.alias.path().to_path_buf();
        match self.remove_alias(&path) {
            Ok(()) => {
                tracing::info!("Removed {}", path.display());
                self.state = AliasState::Unlinked;
                Ok(())
            }
            Err(e) => {
                self.state = self.alias.inspect();
                if e.kind.is_permission() {
                    Err(SwitchError::AccessDenied {
                        path,
                        message: e.message,
                    })
                } else {
                    Err(SwitchError::RemoveFailed {
                        path,
                        message: e.message,
                    })
                }
            }
        }
    }
}
