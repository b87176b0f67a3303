use crate::catalog::ReleaseCatalog;
use crate::download::{download_file, extract_archive};
use crate::index;
use crate::platform::get_system_info;
use crate::switch::{ActiveAlias, ActiveVersionSwitch, AliasState, LinkOps, SystemLinker};
use crate::types::FlutterverSettings;
use crate::version::Version;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Download interrupted; the partial installation was removed")]
pub struct Interrupted;

pub async fn install_version(
    settings: &FlutterverSettings,
    catalog: &ReleaseCatalog,
    version: &Version,
    force: bool,
) -> Result<PathBuf> {
    let root = settings.install_root();
    let version_dir = index::version_dir(&root, version);

    if !force && index::is_installed(&root, version) {
        tracing::info!("Flutter SDK {} is already installed.", version);
        return Ok(version_dir);
    }

    let system_info = get_system_info();
    let release = catalog.find(version, &system_info.arch).ok_or_else(|| {
        anyhow!(
            "Flutter SDK {} is not published for {}. Run `flutterver releases` to see what is",
            version,
            system_info.os
        )
    })?;
    let url = catalog.archive_url(release);

    eprintln!("Installing Flutter SDK {} ({})...", version, release.channel);
    tracing::debug!("Archive URL: {}", url);

    fs::create_dir_all(&root)
        .with_context(|| format!("Could not create {}", root.display()))?;

    // Staging lives inside the root so the final move is a rename on one filesystem
    let staging_dir = TempDir::new_in(&root)?;
    let download_dir = TempDir::new()?;
    let archive_name = release.archive.rsplit('/').next().unwrap_or("flutter.zip");
    let archive_path = download_dir.path().join(archive_name);

    tokio::select! {
        result = download_file(&url, &archive_path) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, removing {}", staging_dir.path().display());
            return Err(Interrupted.into());
        }
    }

    let sdk_root = extract_archive(&archive_path, staging_dir.path())?;

    if fs::symlink_metadata(&version_dir).is_ok() {
        tracing::debug!("Replacing existing {}", version_dir.display());
        SystemLinker.remove_entry(&version_dir)?;
    }
    fs::rename(&sdk_root, &version_dir).with_context(|| {
        format!(
            "Could not move {} to {}",
            sdk_root.display(),
            version_dir.display()
        )
    })?;

    tracing::info!(
        "Successfully installed Flutter SDK {} to {}",
        version,
        version_dir.display()
    );
    Ok(version_dir)
}

/// Delete an installed version, deactivating it first if the alias points at it.
pub fn remove_version(settings: &FlutterverSettings, version: &Version) -> Result<()> {
    let root = settings.install_root();
    let version_dir = index::version_dir(&root, version);

    if fs::symlink_metadata(&version_dir).is_err() {
        return Err(anyhow!("Flutter SDK {} is not installed", version));
    }

    let alias = ActiveAlias::new(settings.alias_path());
    let points_here = match alias.inspect() {
        AliasState::LinkedTo(target) | AliasState::StaleLinkPresent(target) => {
            target == version_dir
        }
        _ => false,
    };
    if points_here {
        tracing::info!("{} is active, disabling it first", version);
        ActiveVersionSwitch::new(alias, SystemLinker).disable()?;
    }

    tracing::info!("Removing directory: {}", version_dir.display());
    SystemLinker
        .remove_entry(&version_dir)
        .with_context(|| format!("Could not remove {}", version_dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::fixtures::install_fake;
    use tempfile::tempdir;

    fn settings_in(dir: &std::path::Path) -> FlutterverSettings {
        FlutterverSettings {
            install_root: dir.join("versions").to_string_lossy().to_string(),
            alias_path: dir.join("current").to_string_lossy().to_string(),
            feed_url: "http://127.0.0.1:9/releases.json".to_string(),
        }
    }

    #[tokio::test]
    async fn installed_versions_are_not_downloaded_again() {
        let scratch = tempdir().unwrap();
        let settings = settings_in(scratch.path());
        let expected = install_fake(&settings.install_root(), "3.10.6");

        // An empty catalog would fail the lookup if a download were attempted
        let dir = install_version(
            &settings,
            &ReleaseCatalog::default(),
            &Version::new(3, 10, 6),
            false,
        )
        .await
        .unwrap();
        assert_eq!(dir, expected);
    }

    #[tokio::test]
    async fn unknown_release_is_reported() {
        let scratch = tempdir().unwrap();
        let settings = settings_in(scratch.path());

        let err = install_version(
            &settings,
            &ReleaseCatalog::default(),
            &Version::new(3, 10, 6),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not published"));
    }

    #[test]
    fn remove_deletes_the_version_directory() {
        let scratch = tempdir().unwrap();
        let settings = settings_in(scratch.path());
        let dir = install_fake(&settings.install_root(), "3.10.6");

        remove_version(&settings, &Version::new(3, 10, 6)).unwrap();
        assert!(!dir.exists());

        assert!(remove_version(&settings, &Version::new(3, 10, 6)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn remove_disables_the_active_version() {
        let scratch = tempdir().unwrap();
        let settings = settings_in(scratch.path());
        let root = settings.install_root();
        install_fake(&root, "3.10.6");
        let mut switch =
            ActiveVersionSwitch::new(ActiveAlias::new(settings.alias_path()), SystemLinker);
        switch.activate(&root, &Version::new(3, 10, 6)).unwrap();

        remove_version(&settings, &Version::new(3, 10, 6)).unwrap();

        assert_eq!(
            ActiveAlias::new(settings.alias_path()).inspect(),
            AliasState::Unlinked
        );
    }
}
