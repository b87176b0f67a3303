use crate::index;
use anyhow::{anyhow, Result};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;

pub async fn download_file(url: &str, local_path: &Path) -> Result<()> {
    let filename = local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| url.to_string());
    tracing::info!("Downloading {}...", filename);

    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(anyhow!("Download of {} failed: {}", url, response.status()));
    }
    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {}", filename));

    let mut file = fs::File::create(local_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    use futures_util::StreamExt;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    pb.finish_with_message("Download complete");
    Ok(())
}

/// Unpack an SDK archive into `extract_dir` and return the directory that holds the
/// `flutter/` tree.
pub fn extract_archive(archive_path: &Path, extract_dir: &Path) -> Result<PathBuf> {
    let name = archive_path.to_string_lossy().to_lowercase();
    tracing::info!("Extracting {}...", archive_path.display());

    if name.ends_with(".zip") {
        extract_zip(archive_path, extract_dir)?;
    } else if name.ends_with(".tar.xz") {
        extract_tar_xz(archive_path, extract_dir)?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(archive_path, extract_dir)?;
    } else {
        return Err(anyhow!(
            "Unsupported archive format: {}",
            archive_path.display()
        ));
    }

    find_sdk_root(extract_dir).ok_or_else(|| {
        anyhow!(
            "{} does not contain a Flutter SDK",
            archive_path.display()
        )
    })
}

fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative) = file.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("Skipping malicious path in zip: {}", file.name());
            continue;
        };
        let outpath = extract_dir.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&outpath)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}

fn extract_tar_gz(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    archive.unpack(extract_dir)?;

    Ok(())
}

fn extract_tar_xz(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let decoder = xz2::read::XzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    archive.unpack(extract_dir)?;

    Ok(())
}

/// Archives normally unpack to `flutter/`, but tolerate one extra wrapping directory.
fn find_sdk_root(extract_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(extract_dir)
        .min_depth(0)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .find(|dir| index::marker_path(dir).is_file())
}
