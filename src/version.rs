//! Version constraint parsing and matching.
//!
//! A constraint is either a bare version token (exact match), a wildcard
//! pattern, or bracket/paren interval syntax such as `[1.0,2.0)`.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use semver::Version;
use serde::{Deserialize, Serialize};

/// A parsed version constraint.
///
/// Immutable once parsed; keeps the source text for display and
/// serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    text: String,
    kind: RangeKind,
}

#[derive(Debug, Clone, PartialEq)]
enum RangeKind {
    /// `*` - matches every version.
    Any,
    /// `1.*` or `1.2.*` - matches versions sharing the numeric prefix.
    Floating { major: u64, minor: Option<u64> },
    /// Interval with optional bounds, e.g. `[1.0,2.0)` or `(,2.0]`.
    Interval {
        min: Option<Bound>,
        max: Option<Bound>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Bound {
    version: Version,
    inclusive: bool,
}

impl VersionRange {
    /// Parse a version range from user input.
    ///
    /// A bare token like `1.0` is treated as the exact match `[1.0]`, not
    /// as "1.0 or newer". Users passing a verbatim version expect that
    /// version; the open-ended minimum requires the full `[1.0,]` syntax.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            bail!("'{}' is not a valid version range", text);
        }

        let effective = if !trimmed.contains(['*', '(', '[']) {
            format!("[{trimmed}]")
        } else {
            trimmed.to_string()
        };

        let kind = parse_range(&effective)
            .with_context(|| format!("'{}' is not a valid version range", trimmed))?;

        Ok(Self {
            text: trimmed.to_string(),
            kind,
        })
    }

    /// Whether `version` falls inside this range.
    ///
    /// Pure interval evaluation; prerelease gating is the caller's
    /// concern.
    pub fn satisfies(&self, version: &Version) -> bool {
        match &self.kind {
            RangeKind::Any => true,
            RangeKind::Floating { major, minor } => {
                version.major == *major && minor.is_none_or(|m| version.minor == m)
            }
            RangeKind::Interval { min, max } => {
                if let Some(bound) = min {
                    if version < &bound.version {
                        return false;
                    }
                    if !bound.inclusive && version == &bound.version {
                        return false;
                    }
                }
                if let Some(bound) = max {
                    if version > &bound.version {
                        return false;
                    }
                    if !bound.inclusive && version == &bound.version {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// The source text this range was parsed from.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for VersionRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.text
    }
}

fn parse_range(text: &str) -> Result<RangeKind> {
    if text == "*" {
        return Ok(RangeKind::Any);
    }
    if text.contains('*') {
        return parse_floating(text);
    }
    parse_interval(text)
}

fn parse_floating(text: &str) -> Result<RangeKind> {
    let segments: Vec<&str> = text.split('.').collect();
    if segments.last() != Some(&"*") {
        bail!("wildcard must be the final version segment");
    }

    match segments.as_slice() {
        [major, "*"] => Ok(RangeKind::Floating {
            major: parse_segment(major)?,
            minor: None,
        }),
        [major, minor, "*"] => Ok(RangeKind::Floating {
            major: parse_segment(major)?,
            minor: Some(parse_segment(minor)?),
        }),
        _ => bail!("unsupported wildcard pattern"),
    }
}

fn parse_segment(segment: &str) -> Result<u64> {
    segment
        .parse::<u64>()
        .with_context(|| format!("'{segment}' is not a numeric version segment"))
}

fn parse_interval(text: &str) -> Result<RangeKind> {
    let mut chars = text.chars();
    let open = chars.next();
    let close = chars.next_back();

    let min_inclusive = match open {
        Some('[') => true,
        Some('(') => false,
        _ => bail!("expected '[' or '(' at the start of a range"),
    };
    let max_inclusive = match close {
        Some(']') => true,
        Some(')') => false,
        _ => bail!("expected ']' or ')' at the end of a range"),
    };

    let inner = &text[1..text.len() - 1];
    let parts: Vec<&str> = inner.split(',').collect();

    match parts.as_slice() {
        [single] => {
            // Only the fully inclusive form denotes an exact version.
            if !min_inclusive || !max_inclusive {
                bail!("an exact version requires '[version]'");
            }
            let version = parse_version(single)?;
            Ok(RangeKind::Interval {
                min: Some(Bound {
                    version: version.clone(),
                    inclusive: true,
                }),
                max: Some(Bound {
                    version,
                    inclusive: true,
                }),
            })
        }
        [min_text, max_text] => {
            let min = parse_bound(min_text, min_inclusive)?;
            let max = parse_bound(max_text, max_inclusive)?;
            match (&min, &max) {
                (None, None) => bail!("a range requires at least one bound"),
                (Some(lo), Some(hi)) if lo.version > hi.version => {
                    bail!("the minimum bound is greater than the maximum bound")
                }
                _ => {}
            }
            Ok(RangeKind::Interval { min, max })
        }
        _ => bail!("a range has at most two bounds"),
    }
}

fn parse_bound(text: &str, inclusive: bool) -> Result<Option<Bound>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(Bound {
        version: parse_version(trimmed)?,
        inclusive,
    }))
}

/// Parse a version leniently.
///
/// Accepts an optional `v` prefix and pads partial versions (`1`, `1.2`)
/// to full triples, keeping any prerelease or build suffix.
pub fn parse_version(text: &str) -> Result<Version> {
    let trimmed = text.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if bare.is_empty() {
        bail!("'{}' is not a valid version", text);
    }

    let (core, suffix) = match bare.find(['-', '+']) {
        Some(index) => bare.split_at(index),
        None => (bare, ""),
    };

    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0"),
        2 => format!("{core}.0"),
        _ => core.to_string(),
    };

    Version::parse(&format!("{padded}{suffix}"))
        .with_context(|| format!("'{}' is not a valid version", text))
}
