//! Host platform versions and the ranges compatibility adapters declare.

use thiserror::Error;

/// Errors that can occur when parsing versions or version ranges.
#[derive(Debug, Error)]
pub enum VersionError {
    /// The version string was empty.
    #[error("version cannot be empty")]
    Empty,
    /// A version component was not a number.
    #[error("invalid version component '{0}'")]
    InvalidComponent(String),
    /// A version had more than three components.
    #[error("version '{0}' has too many components")]
    TooManyComponents(String),
    /// A range had more than one `-` separator.
    #[error("invalid version range '{0}'")]
    InvalidRange(String),
    /// A wildcard appeared somewhere other than the final component.
    #[error("wildcard must be the final component in '{0}'")]
    MisplacedWildcard(String),
}

/// The version of the host platform the plugin is running inside.
///
/// Resolved once at startup and used to select compatibility adapters;
/// missing components parse as zero, so `"2.1"` is `2.1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PlatformVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    fn as_triple(self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for PlatformVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let mut components = [0u32; 3];
        let mut count = 0;
        for part in trimmed.split('.') {
            if count >= 3 {
                return Err(VersionError::TooManyComponents(trimmed.to_owned()));
            }
            components[count] = part
                .parse::<u32>()
                .map_err(|_| VersionError::InvalidComponent(part.to_owned()))?;
            count += 1;
        }
        Ok(Self::new(components[0], components[1], components[2]))
    }
}

/// One endpoint of a version range: up to three numeric components, with an
/// optional trailing wildcard covering everything below that position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct VersionPattern {
    components: [Option<u32>; 3],
}

impl VersionPattern {
    fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let mut components = [None; 3];
        let mut count = 0;
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::TooManyComponents(trimmed.to_owned()));
        }
        for (i, part) in parts.iter().enumerate() {
            if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(VersionError::MisplacedWildcard(trimmed.to_owned()));
                }
                break;
            }
            components[count] = Some(
                part.parse::<u32>()
                    .map_err(|_| VersionError::InvalidComponent((*part).to_owned()))?,
            );
            count += 1;
        }
        Ok(Self { components })
    }

    /// The smallest concrete version covered by this pattern.
    fn floor(self) -> (u32, u32, u32) {
        (
            self.components[0].unwrap_or(0),
            self.components[1].unwrap_or(0),
            self.components[2].unwrap_or(0),
        )
    }

    /// The largest concrete version covered by this pattern.
    fn ceiling(self) -> (u32, u32, u32) {
        (
            self.components[0].unwrap_or(u32::MAX),
            self.components[1].unwrap_or(u32::MAX),
            self.components[2].unwrap_or(u32::MAX),
        )
    }

    /// Whether the pattern names a single concrete version (no wildcard).
    fn is_exact(self) -> bool {
        self.components.iter().all(|c| c.is_some())
    }
}

/// A declared range of host platform versions an adapter supports.
///
/// Three forms are accepted, all with inclusive bounds:
/// - a closed range: `"1.9.9 - 1.12.*"`
/// - a single wildcard pattern: `"2.*"`
/// - a single exact version: `"2.2.0"`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionRange {
    lower: VersionPattern,
    upper: VersionPattern,
}

impl VersionRange {
    /// Parses a declared range string.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        // Strip the bracketed form some declarations use: "[1.7.5 - 1.9.*]".
        let trimmed = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed)
            .trim();
        let parts: Vec<&str> = trimmed.split('-').map(str::trim).collect();
        match parts.as_slice() {
            [single] => {
                let pattern = VersionPattern::parse(single)?;
                Ok(Self {
                    lower: pattern,
                    upper: pattern,
                })
            }
            [lower, upper] => Ok(Self {
                lower: VersionPattern::parse(lower)?,
                upper: VersionPattern::parse(upper)?,
            }),
            _ => Err(VersionError::InvalidRange(trimmed.to_owned())),
        }
    }

    /// Whether the given host version falls inside this range (inclusive).
    pub fn matches(&self, version: PlatformVersion) -> bool {
        let v = version.as_triple();
        self.lower.floor() <= v && v <= self.upper.ceiling()
    }

    /// Whether this range names exactly one version.
    pub fn is_exact(&self) -> bool {
        self.lower == self.upper && self.lower.is_exact()
    }
}
