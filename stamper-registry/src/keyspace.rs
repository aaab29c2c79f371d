//! # Package Key Space
//!
//! Every stored package version lives under a single key built from its
//! owner, name and version: `owner/name/version`. The three parts are
//! sanitized independently so a key only ever contains letters, digits,
//! `_`, `-`, `.` and the `/` separators. Case is preserved.
//!
//! Raw request input arrives as [`PackageCoordinates`] and is turned into a
//! [`PackageKey`] by [`PackageCoordinates::resolve`]. Resolution is the only
//! place defaults are applied, so create, update and fetch always agree on
//! which key a request addresses.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Version used when a request does not name one.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Separator between the owner, name and version segments of a key.
pub const KEY_SEPARATOR: char = '/';

fn unsafe_chars() -> &'static Regex {
    static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();
    UNSAFE_CHARS.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9_.\-]").unwrap_or_else(|e| {
            panic!("Failed to compile key sanitization regex: {}. This is a bug in the code - the regex pattern should be valid.", e)
        })
    })
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Each offending character becomes exactly one `_`, so the function is
/// idempotent: `sanitize(&sanitize(s)) == sanitize(s)`.
///
/// ```
/// # use stamper_registry::keyspace::sanitize;
/// assert_eq!(sanitize("my tool/v2!"), "my_tool_v2_");
/// assert_eq!(sanitize("Already-Safe_1.0"), "Already-Safe_1.0");
/// ```
pub fn sanitize(input: &str) -> String {
    unsafe_chars().replace_all(input, "_").into_owned()
}

/// Canonical storage key of one package version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageKey {
    owner: String,
    name: String,
    version: String,
}

impl PackageKey {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Rebuild a key from its `owner/name/version` form.
    ///
    /// Returns `None` when the string does not have exactly three non-empty
    /// segments or any segment is not already sanitized. Backends use this to
    /// skip foreign entries while enumerating.
    pub fn parse(key: &str) -> Option<Self> {
        let mut parts = key.split(KEY_SEPARATOR);
        let owner = parts.next()?;
        let name = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let valid = |segment: &str| {
            !segment.is_empty() && !is_dot_segment(segment) && sanitize(segment) == segment
        };
        if !(valid(owner) && valid(name) && valid(version)) {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// The three segments in storage order.
    pub fn segments(&self) -> [&str; 3] {
        [&self.owner, &self.name, &self.version]
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.owner,
            self.name,
            self.version,
            sep = KEY_SEPARATOR
        )
    }
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

/// Raw, unsanitized coordinates of a package version as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageCoordinates {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl PackageCoordinates {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            name: Some(name.into()),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sanitize the coordinates and apply the version default.
    ///
    /// A missing or empty owner or name is rejected rather than producing a
    /// key with an empty segment.
    pub fn resolve(&self, default_version: &str) -> AppResult<PackageKey> {
        let owner = required_segment("owner", self.owner.as_deref())?;
        let name = required_segment("name", self.name.as_deref())?;

        let raw_version = match self.version.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => default_version,
        };
        let version = sanitize(raw_version);
        check_segment("version", &version)?;

        Ok(PackageKey {
            owner,
            name,
            version,
        })
    }
}

fn required_segment(field: &str, value: Option<&str>) -> AppResult<String> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            return Err(AppError::BadRequest(format!(
                "Missing '{}' query parameter",
                field
            )))
        }
    };
    let sanitized = sanitize(value);
    check_segment(field, &sanitized)?;
    Ok(sanitized)
}

fn check_segment(field: &str, segment: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::BadRequest(format!("'{}' cannot be empty", field)));
    }
    if is_dot_segment(segment) {
        return Err(AppError::BadRequest(format!(
            "'{}' cannot be '{}'",
            field, segment
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("alice"), "alice");
        assert_eq!(sanitize("a b"), "a_b");
        assert_eq!(sanitize("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize("tool@2.0"), "tool_2.0");
        assert_eq!(sanitize("naïve"), "na_ve");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "",
            "plain",
            "with space",
            "slash/separated/value",
            "ümlaut-ß",
            "emoji 🚀 rocket",
            "tabs\tand\nnewlines",
            "..",
            "MiXeD_Case-1.2.3",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn resolve_applies_default_version() {
        let key = PackageCoordinates::new("alice", "tool")
            .resolve(DEFAULT_VERSION)
            .unwrap();
        assert_eq!(key.to_string(), "alice/tool/0.1.0");

        let key = PackageCoordinates::new("alice", "tool")
            .with_version("")
            .resolve(DEFAULT_VERSION)
            .unwrap();
        assert_eq!(key.version(), "0.1.0");
    }

    #[test]
    fn resolve_sanitizes_each_segment() {
        let key = PackageCoordinates::new("al ice", "my/tool")
            .with_version("v 2")
            .resolve(DEFAULT_VERSION)
            .unwrap();
        assert_eq!(key.owner(), "al_ice");
        assert_eq!(key.name(), "my_tool");
        assert_eq!(key.version(), "v_2");
        assert_eq!(key.to_string(), "al_ice/my_tool/v_2");
    }

    #[test]
    fn resolve_preserves_case() {
        let key = PackageCoordinates::new("Alice", "Tool")
            .resolve(DEFAULT_VERSION)
            .unwrap();
        assert_eq!(key.to_string(), "Alice/Tool/0.1.0");
    }

    #[test]
    fn resolve_rejects_missing_owner_or_name() {
        let missing_owner = PackageCoordinates {
            owner: None,
            name: Some("tool".into()),
            version: None,
        };
        assert!(matches!(
            missing_owner.resolve(DEFAULT_VERSION),
            Err(AppError::BadRequest(msg)) if msg.contains("owner")
        ));

        let empty_name = PackageCoordinates::new("alice", "");
        assert!(matches!(
            empty_name.resolve(DEFAULT_VERSION),
            Err(AppError::BadRequest(msg)) if msg.contains("name")
        ));
    }

    #[test]
    fn resolve_rejects_dot_segments() {
        assert!(PackageCoordinates::new("..", "tool")
            .resolve(DEFAULT_VERSION)
            .is_err());
        assert!(PackageCoordinates::new("alice", ".")
            .resolve(DEFAULT_VERSION)
            .is_err());
        assert!(PackageCoordinates::new("alice", "tool")
            .with_version("..")
            .resolve(DEFAULT_VERSION)
            .is_err());
        // Dots inside a segment are fine.
        assert!(PackageCoordinates::new("alice", "tool")
            .with_version("1.0.0..rc")
            .resolve(DEFAULT_VERSION)
            .is_ok());
    }

    #[test]
    fn parse_round_trips_display() {
        let key = PackageCoordinates::new("alice", "tool")
            .with_version("2.0.0")
            .resolve(DEFAULT_VERSION)
            .unwrap();
        assert_eq!(PackageKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(PackageKey::parse("alice/tool").is_none());
        assert!(PackageKey::parse("alice/tool/0.1.0/extra").is_none());
        assert!(PackageKey::parse("/tool/0.1.0").is_none());
        assert!(PackageKey::parse("alice/../0.1.0").is_none());
        assert!(PackageKey::parse("alice/to ol/0.1.0").is_none());
    }
}
