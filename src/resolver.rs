//! Turns what the user typed into a concrete release version.
//!
//! Accepted requests:
//! - `latest`: head of the **beta** channel. This matches how the release
//!   feed has always been read by this tool, even though it looks like it
//!   should mean stable.
//! - `lts`: head of the stable channel.
//! - `newest`: the newest installed version.
//! - `3.10.6`: taken as is.
//! - `3.10` or `3`: completed to the highest matching release.

use crate::catalog::{CatalogError, ReleaseCatalog, ReleaseSource};
use crate::index;
use crate::version::{PartialVersion, Version, VersionParseError};
use std::io;
use std::path::Path;
use thiserror::Error;

pub const LATEST: &str = "latest";
pub const LTS: &str = "lts";
pub const NEWEST: &str = "newest";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No version specified")]
    MissingVersion,
    #[error("Unrecognized version '{0}'. Supply a concrete version such as 3.10.6")]
    UnrecognizedVersion(String),
    #[error("No release matches '{0}'. Supply a concrete version such as 3.10.6")]
    NoMatchingRelease(String),
    #[error("No Flutter SDK versions are installed. Install one with `flutterver install <version>`")]
    NoInstalledVersions,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Could not read installed versions: {0}")]
    Io(#[from] io::Error),
}

/// A resolved version, plus the symbolic name it replaced, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: Version,
    pub substituted_from: Option<&'static str>,
}

impl Resolution {
    fn exact(version: Version) -> Self {
        Self {
            version,
            substituted_from: None,
        }
    }

    fn substituted(version: Version, alias: &'static str) -> Self {
        tracing::info!("'{}' resolved to {}", alias, version);
        Self {
            version,
            substituted_from: Some(alias),
        }
    }
}

pub struct VersionResolver<'a, S> {
    source: &'a S,
    root: &'a Path,
}

impl<'a, S: ReleaseSource> VersionResolver<'a, S> {
    pub fn new(source: &'a S, root: &'a Path) -> Self {
        Self { source, root }
    }

    pub async fn resolve(
        &self,
        requested: &str,
        local_only: bool,
    ) -> Result<Resolution, ResolveError> {
        let requested = requested.trim();
        tracing::debug!("Resolving '{}' (local_only: {})", requested, local_only);

        match requested {
            "" => Err(ResolveError::MissingVersion),
            LATEST => {
                let catalog = self.source.fetch_releases().await?;
                let release = catalog
                    .latest_beta()
                    .ok_or_else(|| ResolveError::UnrecognizedVersion(requested.to_string()))?;
                Ok(Resolution::substituted(release.version.clone(), LATEST))
            }
            LTS => {
                let catalog = self.source.fetch_releases().await?;
                let release = catalog
                    .latest_stable()
                    .ok_or_else(|| ResolveError::UnrecognizedVersion(requested.to_string()))?;
                Ok(Resolution::substituted(release.version.clone(), LTS))
            }
            NEWEST => index::list_installed(self.root)?
                .into_iter()
                .next()
                .map(Resolution::exact)
                .ok_or(ResolveError::NoInstalledVersions),
            _ => match Version::parse(requested) {
                Ok(version) => Ok(Resolution::exact(version)),
                Err(VersionParseError::Incomplete { partial, .. }) => self
                    .complete(requested, partial, local_only)
                    .await
                    .map(Resolution::exact),
                Err(_) => Err(ResolveError::UnrecognizedVersion(requested.to_string())),
            },
        }
    }

    async fn complete(
        &self,
        requested: &str,
        partial: PartialVersion,
        local_only: bool,
    ) -> Result<Version, ResolveError> {
        if local_only {
            let installed = index::list_installed(self.root)?;
            if let Some(version) = installed.into_iter().filter(|v| partial.matches(v)).max() {
                tracing::debug!("Completed {} to installed {}", partial, version);
                return Ok(version);
            }
            tracing::debug!("No installed version matches {}, asking the release feed", partial);
        }

        let catalog = self.source.fetch_releases().await?;
        complete_from_catalog(&catalog, requested, partial)
    }
}

fn complete_from_catalog(
    catalog: &ReleaseCatalog,
    requested: &str,
    partial: PartialVersion,
) -> Result<Version, ResolveError> {
    let matching = catalog.candidates().filter(|v| partial.matches(v));

    match partial {
        PartialVersion::MajorMinor(major, minor) => matching
            .map(|v| v.patch)
            .max()
            .map(|patch| Version::new(major, minor, patch))
            .ok_or_else(|| ResolveError::NoMatchingRelease(requested.to_string())),
        PartialVersion::Major(_) => matching
            .max()
            .cloned()
            .ok_or_else(|| ResolveError::UnrecognizedVersion(requested.to_string())),
    }
}
