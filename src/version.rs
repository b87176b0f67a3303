//! SDK release versions.
//!
//! A [`Version`] is `major.minor.patch` with an optional pre-release marker
//! (`3.14.0-0.2.pre`). Ordering looks at the numeric triple first; the marker
//! only breaks ties, and a plain release sorts above any pre-release of the
//! same triple.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

/// A version with fewer than three components, as typed by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialVersion {
    Major(u64),
    MajorMinor(u64, u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("version string is empty")]
    Empty,
    #[error("'{input}' is not a full major.minor.patch version")]
    Incomplete {
        input: String,
        partial: PartialVersion,
    },
    #[error("'{0}' is not a valid version")]
    Invalid(String),
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse a version string, accepting an optional leading `v`.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let clean = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if clean.is_empty() {
            return Err(VersionParseError::Empty);
        }

        if let Ok(parsed) = semver::Version::parse(clean) {
            // Build metadata has no place in the ordering, so it cannot name a release
            if !parsed.build.is_empty() {
                return Err(VersionParseError::Invalid(trimmed.to_string()));
            }
            let pre = (!parsed.pre.is_empty()).then(|| parsed.pre.as_str().to_string());
            return Ok(Self {
                major: parsed.major,
                minor: parsed.minor,
                patch: parsed.patch,
                pre,
            });
        }

        let numbers: Option<Vec<u64>> = clean.split('.').map(|part| part.parse().ok()).collect();
        let partial = match numbers.as_deref() {
            Some([major]) => PartialVersion::Major(*major),
            Some([major, minor]) => PartialVersion::MajorMinor(*major, *minor),
            _ => return Err(VersionParseError::Invalid(trimmed.to_string())),
        };

        Err(VersionParseError::Incomplete {
            input: trimmed.to_string(),
            partial,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

impl PartialVersion {
    /// Whether `version` shares every component this partial version names.
    pub fn matches(&self, version: &Version) -> bool {
        match *self {
            PartialVersion::Major(major) => version.major == major,
            PartialVersion::MajorMinor(major, minor) => {
                version.major == major && version.minor == minor
            }
        }
    }
}

impl fmt::Display for PartialVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialVersion::Major(major) => write!(f, "{}", major),
            PartialVersion::MajorMinor(major, minor) => write!(f, "{}.{}", major, minor),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_versions() {
        assert_eq!(Version::parse("3.10.6").unwrap(), Version::new(3, 10, 6));
        assert_eq!(Version::parse("v1.0.0").unwrap(), Version::new(1, 0, 0));

        let beta = Version::parse("3.14.0-0.2.pre").unwrap();
        assert_eq!(beta.pre.as_deref(), Some("0.2.pre"));
        assert!(beta.is_prerelease());
        assert_eq!(beta.to_string(), "3.14.0-0.2.pre");
    }

    #[test]
    fn reports_incomplete_versions() {
        match Version::parse("3.10") {
            Err(VersionParseError::Incomplete { partial, .. }) => {
                assert_eq!(partial, PartialVersion::MajorMinor(3, 10));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        match Version::parse("3") {
            Err(VersionParseError::Incomplete { partial, .. }) => {
                assert_eq!(partial, PartialVersion::Major(3));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Version::parse("  "), Err(VersionParseError::Empty));
        assert!(matches!(
            Version::parse("stable"),
            Err(VersionParseError::Invalid(_))
        ));
        assert!(matches!(
            Version::parse("3.x"),
            Err(VersionParseError::Invalid(_))
        ));
        assert!(matches!(
            Version::parse("3.10.6+build.1"),
            Err(VersionParseError::Invalid(_))
        ));
    }

    #[test]
    fn orders_by_numeric_triple_first() {
        let mut versions: Vec<Version> = ["3.10.6", "3.9.12", "3.13.0", "3.10.0", "3.13.0-0.1.pre"]
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        versions.sort();

        let rendered: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            ["3.9.12", "3.10.0", "3.10.6", "3.13.0-0.1.pre", "3.13.0"]
        );
    }

    #[test]
    fn partial_matching_is_component_wise() {
        let partial = PartialVersion::MajorMinor(3, 1);
        assert!(partial.matches(&Version::new(3, 1, 4)));
        assert!(!partial.matches(&Version::new(3, 10, 6)));
        assert!(PartialVersion::Major(3).matches(&Version::new(3, 22, 1)));
        assert!(!PartialVersion::Major(3).matches(&Version::new(30, 0, 0)));
    }
}
