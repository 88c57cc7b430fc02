//! Module coordinate syntax: path and version checks, case escaping and
//! major-version markers.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};

static MAJOR_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v[0-9]+$").unwrap());

/// An import path plus a version query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub path:  String,
    pub query: String,
}

impl Coordinate {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path:  path.into(),
            query: query.into(),
        }
    }

    pub fn check(&self) -> Result<()> {
        check(&self.path, &self.query)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.query)
    }
}

/// Whether a path segment is a major-version marker such as `v2`.
pub fn is_major_marker(segment: &str) -> bool {
    MAJOR_MARKER.is_match(segment)
}

/// The trailing major-version marker of `path`, if it has one.
pub fn split_major(path: &str) -> Option<&str> {
    let (_, last) = path.rsplit_once('/')?;
    is_major_marker(last).then_some(last)
}

/// Validate a module path and a concrete version together.
///
/// The version must be a canonical `v`-prefixed semantic version whose
/// major agrees with the path's major-version marker. Without a marker,
/// majors of 2 and above need the `+incompatible` suffix.
pub fn check(path: &str, version: &str) -> Result<()> {
    check_path(path).map_err(|reason| Error::invalid(path, version, reason))?;

    let parsed = parse_version(version)
        .ok_or_else(|| Error::invalid(path, version, "not a canonical semantic version"))?;
    let incompatible = parsed.build.as_str() == "incompatible";

    match split_major(path) {
        Some(marker) => {
            let major = marker[1..]
                .parse::<u64>()
                .ok()
                .filter(|n| *n >= 2 && !marker[1..].starts_with('0'))
                .ok_or_else(|| {
                    Error::invalid(path, version, "major version suffixes must be /vN with N >= 2")
                })?;
            if parsed.major != major {
                return Err(Error::invalid(
                    path,
                    version,
                    format!("version major v{} does not match path suffix {marker}", parsed.major),
                ));
            }
            if incompatible {
                return Err(Error::invalid(path, version, "+incompatible on a path with a major suffix"));
            }
        }
        None if parsed.major >= 2 && !incompatible => {
            return Err(Error::invalid(
                path,
                version,
                format!("major version v{} needs a /v{} path suffix", parsed.major, parsed.major),
            ));
        }
        None if parsed.major < 2 && incompatible => {
            return Err(Error::invalid(path, version, "+incompatible on a compatible major version"));
        }
        None => {}
    }
    Ok(())
}

/// Parse `vMAJOR.MINOR.PATCH[-pre][+incompatible]`.
fn parse_version(version: &str) -> Option<Version> {
    let parsed = Version::parse(version.strip_prefix('v')?).ok()?;
    (parsed.build.is_empty() || parsed.build.as_str() == "incompatible").then_some(parsed)
}

fn check_path(path: &str) -> std::result::Result<(), &'static str> {
    if path.is_empty() {
        return Err("empty path");
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err("leading or trailing slash");
    }

    for (index, element) in path.split('/').enumerate() {
        if element.is_empty() {
            return Err("double slash");
        }
        if element == "." || element == ".." {
            return Err("dot path element");
        }
        if element.starts_with('.') {
            return Err("leading dot in path element");
        }
        if element.ends_with('.') {
            return Err("trailing dot in path element");
        }
        if !element.chars().all(|c| c.is_ascii_alphanumeric() || "-._~".contains(c)) {
            return Err("invalid character in path element");
        }
        if index == 0 {
            if !element.contains('.') {
                return Err("missing dot in first path element");
            }
            if element.starts_with('-') {
                return Err("leading dash in first path element");
            }
            if element.chars().any(|c| c.is_ascii_uppercase()) {
                return Err("uppercase letter in first path element");
            }
        }
    }
    Ok(())
}

/// Case-encode a module path: each uppercase letter becomes `!` plus its
/// lowercase form.
pub fn escape_path(path: &str) -> Result<String> {
    check_path(path).map_err(|reason| Error::invalid(path, "", reason))?;
    Ok(escape(path))
}

/// Case-encode a version string. Versions are not otherwise validated.
pub fn escape_version(version: &str) -> String {
    escape(version)
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Reverse [`escape_path`]. Returns `None` for malformed input: a bare
/// uppercase letter, or `!` not followed by a lowercase letter.
pub fn unescape_path(escaped: &str) -> Option<String> {
    let mut path = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '!' => match chars.next() {
                Some(next) if next.is_ascii_lowercase() => path.push(next.to_ascii_uppercase()),
                _ => return None,
            },
            c if c.is_ascii_uppercase() => return None,
            c => path.push(c),
        }
    }
    Some(path)
}
