//! Channel-partitioned view of the remote release feed.

use crate::types::{CurrentRelease, FeedRelease, ReleaseFeed};
use crate::version::Version;
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Release catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stable,
    Beta,
}

impl Channel {
    /// Only the stable and beta channels are tracked; `dev` and unknown tags map to `None`.
    pub fn from_feed(tag: &str) -> Option<Self> {
        match tag {
            "stable" => Some(Channel::Stable),
            "beta" => Some(Channel::Beta),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stable => write!(f, "stable"),
            Channel::Beta => write!(f, "beta"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: Version,
    pub channel: Channel,
    pub hash: String,
    pub release_date: Option<DateTime<Utc>>,
    pub archive: String,
    pub sha256: String,
    pub dart_sdk_version: Option<String>,
    pub dart_sdk_arch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseCatalog {
    base_url: String,
    current: CurrentRelease,
    stable: Vec<Release>,
    beta: Vec<Release>,
}

impl ReleaseCatalog {
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let feed: ReleaseFeed = serde_json::from_str(text)
            .map_err(|e| CatalogError::Unavailable(format!("malformed release feed: {}", e)))?;
        Ok(Self::from_feed(feed))
    }

    pub fn from_feed(feed: ReleaseFeed) -> Self {
        let mut catalog = ReleaseCatalog {
            base_url: feed.base_url.trim_end_matches('/').to_string(),
            current: feed.current_release,
            ..Default::default()
        };

        for entry in feed.releases {
            if entry.version.contains("hotfix") {
                continue;
            }
            let Some(channel) = Channel::from_feed(&entry.channel) else {
                continue;
            };
            match release_from_feed(entry, channel) {
                Some(release) if channel == Channel::Stable => catalog.stable.push(release),
                Some(release) => catalog.beta.push(release),
                None => {}
            }
        }

        tracing::debug!(
            "Catalog holds {} stable and {} beta releases",
            catalog.stable.len(),
            catalog.beta.len()
        );
        catalog
    }

    pub fn releases(&self, channel: Channel) -> &[Release] {
        match channel {
            Channel::Stable => &self.stable,
            Channel::Beta => &self.beta,
        }
    }

    pub fn stable_versions(&self) -> impl Iterator<Item = &Version> {
        self.stable.iter().map(|r| &r.version)
    }

    pub fn beta_versions(&self) -> impl Iterator<Item = &Version> {
        self.beta.iter().map(|r| &r.version)
    }

    /// Head of the stable channel; the feed lists newest first.
    pub fn latest_stable(&self) -> Option<&Release> {
        self.stable.first()
    }

    /// Head of the beta channel.
    pub fn latest_beta(&self) -> Option<&Release> {
        self.beta.first()
    }

    /// Stable then beta versions, the pool used for sub-version completion.
    pub fn candidates(&self) -> impl Iterator<Item = &Version> {
        self.stable_versions().chain(self.beta_versions())
    }

    /// Find the release to download for `version`, preferring a build for `arch`
    /// when the feed publishes several.
    pub fn find(&self, version: &Version, arch: &str) -> Option<&Release> {
        let mut matching = self
            .stable
            .iter()
            .chain(self.beta.iter())
            .filter(|r| &r.version == version);
        let first = matching.next()?;
        if first.dart_sdk_arch.as_deref().map_or(true, |a| a == arch) {
            return Some(first);
        }
        matching
            .find(|r| r.dart_sdk_arch.as_deref() == Some(arch))
            .or(Some(first))
    }

    pub fn archive_url(&self, release: &Release) -> String {
        format!("{}/{}", self.base_url, release.archive)
    }

    /// Whether the feed's channel pointer currently names this release.
    pub fn is_current(&self, release: &Release) -> bool {
        let pointer = match release.channel {
            Channel::Stable => &self.current.stable,
            Channel::Beta => &self.current.beta,
        };
        pointer.as_deref() == Some(release.hash.as_str())
    }
}

fn release_from_feed(entry: FeedRelease, channel: Channel) -> Option<Release> {
    let version = match Version::parse(&entry.version) {
        Ok(version) => version,
        Err(e) => {
            tracing::debug!("Skipping feed entry: {}", e);
            return None;
        }
    };
    let release_date = DateTime::parse_from_rfc3339(&entry.release_date)
        .ok()
        .map(|d| d.with_timezone(&Utc));

    Some(Release {
        version,
        channel,
        hash: entry.hash,
        release_date,
        archive: entry.archive,
        sha256: entry.sha256,
        dart_sdk_version: entry.dart_sdk_version,
        dart_sdk_arch: entry.dart_sdk_arch,
    })
}

/// Anything that can produce a release catalog on demand.
pub trait ReleaseSource {
    fn fetch_releases(&self) -> impl Future<Output = Result<ReleaseCatalog, CatalogError>> + Send;
}

/// The HTTP release feed, downloaded at most once per process.
pub struct RemoteFeed {
    url: String,
    catalog: OnceCell<ReleaseCatalog>,
}

impl RemoteFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            catalog: OnceCell::new(),
        }
    }
}

impl ReleaseSource for RemoteFeed {
    fn fetch_releases(&self) -> impl Future<Output = Result<ReleaseCatalog, CatalogError>> + Send {
        async move {
            self.catalog
                .get_or_try_init(|| fetch_releases(&self.url))
                .await
                .cloned()
        }
    }
}

pub async fn fetch_releases(url: &str) -> Result<ReleaseCatalog, CatalogError> {
    tracing::debug!("Fetching release feed from: {}", url);

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("User-Agent", "flutterver")
        .send()
        .await
        .map_err(|e| CatalogError::Unavailable(format!("{}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(CatalogError::Unavailable(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| CatalogError::Unavailable(format!("{}: {}", url, e)))?;
    ReleaseCatalog::from_json(&text)
}
