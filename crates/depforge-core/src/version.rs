//! Source version parsing.
//!
//! A source version is an ordinary version string that embeds one or more SCM
//! coordinates after the `-SRC-` infix, e.g. `1.2.3-SRC-tag-v1.2.3` or
//! `1.2.3-SRC-branch-main`. A dependency carrying such a version is built
//! from its source-control history rather than resolved from a binary
//! repository.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// The infix that turns an ordinary version string into a source version.
pub const SRC_VERSION_INFIX: &str = "-SRC-";

/// The delimiter between the version type and the version value.
pub const SRC_VERSION_DELIMITER: char = '-';

/// Errors raised when parsing a source version string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The `-SRC-` infix is present but not followed by a `<type>-<value>` token.
    #[error(
        "version string '{raw}' contains '-SRC-' that is not followed by a version type \
         such as 'tag', 'branch', or 'revision' and a version value"
    )]
    MalformedVersion {
        /// The offending raw version string.
        raw: String,
    },

    /// The version type is none of the well-known ones.
    #[error("unknown version type '{version_type}' in version string '{raw}'")]
    UnknownVersionType {
        /// The raw version string the type was parsed from.
        raw: String,
        /// The unrecognized version type.
        version_type: String,
    },
}

/// The well-known version types. The set is open on the wire: an element may
/// carry any type string, and only a provider that has to interpret it maps
/// it through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum WellKnownType {
    /// A branch name; the tip of the branch is built.
    Branch,
    /// A tag name.
    Tag,
    /// An exact commit identifier.
    Revision,
}

/// One `(type, value)` SCM coordinate of a [`SrcVersion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionElement {
    version_type: String,
    version_value: String,
}

impl VersionElement {
    /// The version type, typically `branch`, `tag` or `revision`.
    #[must_use]
    pub fn version_type(&self) -> &str {
        &self.version_type
    }

    /// The version value, e.g. a branch name or a commit id.
    #[must_use]
    pub fn version_value(&self) -> &str {
        &self.version_value
    }

    /// Maps [`Self::version_type`] onto [`WellKnownType`].
    ///
    /// # Errors
    ///
    /// [`VersionError::UnknownVersionType`] if the type is not well-known.
    pub fn well_known_type(&self, raw: &str) -> Result<WellKnownType, VersionError> {
        WellKnownType::from_str(&self.version_type).map_err(|_| VersionError::UnknownVersionType {
            raw: raw.to_string(),
            version_type: self.version_type.clone(),
        })
    }
}

/// An immutable, parsed source version.
///
/// Equality and hashing are defined over the raw string only; two
/// `SrcVersion`s are interchangeable exactly when their raw forms are equal.
#[derive(Debug, Clone)]
pub struct SrcVersion {
    /// What we parsed from; also what [`fmt::Display`] renders.
    raw: String,
    elements: Vec<VersionElement>,
}

impl SrcVersion {
    /// Fast discriminator: does `raw` look like a source version at all?
    #[must_use]
    pub fn is_src_version(raw: &str) -> bool {
        raw.contains(SRC_VERSION_INFIX)
    }

    /// Parses `raw` into a [`SrcVersion`].
    ///
    /// Returns `Ok(None)` when `raw` does not contain the `-SRC-` infix,
    /// i.e. when it is an ordinary version that needs no source build.
    ///
    /// # Errors
    ///
    /// [`VersionError::MalformedVersion`] when the infix is present but any
    /// of the subsequent tokens is not of the `<type>-<value>` form.
    pub fn parse(raw: &str) -> Result<Option<Self>, VersionError> {
        let Some(first) = raw.find(SRC_VERSION_INFIX) else {
            return Ok(None);
        };

        let mut elements = Vec::new();
        let mut rest = &raw[first + SRC_VERSION_INFIX.len()..];
        loop {
            // Further `-SRC-` occurrences introduce further elements.
            let (token, next) = match rest.find(SRC_VERSION_INFIX) {
                Some(pos) => (&rest[..pos], Some(&rest[pos + SRC_VERSION_INFIX.len()..])),
                None => (rest, None),
            };
            elements.push(Self::parse_element(raw, token)?);
            match next {
                Some(n) => rest = n,
                None => break,
            }
        }

        Ok(Some(Self {
            raw: raw.to_string(),
            elements,
        }))
    }

    fn parse_element(raw: &str, token: &str) -> Result<VersionElement, VersionError> {
        let malformed = || VersionError::MalformedVersion {
            raw: raw.to_string(),
        };
        let delimiter = token.find(SRC_VERSION_DELIMITER).ok_or_else(malformed)?;
        if delimiter == 0 {
            return Err(malformed());
        }
        let version_value = &token[delimiter + 1..];
        if version_value.is_empty() {
            return Err(malformed());
        }
        Ok(VersionElement {
            version_type: token[..delimiter].to_string(),
            version_value: version_value.to_string(),
        })
    }

    /// All `(type, value)` elements, in the order they appear in the raw
    /// string. Guaranteed non-empty.
    #[must_use]
    pub fn elements(&self) -> &[VersionElement] {
        &self.elements
    }

    /// The primary (first) element. Providers that understand a single SCM
    /// coordinate act on this one.
    #[must_use]
    pub fn primary(&self) -> &VersionElement {
        &self.elements[0]
    }

    /// The primary element's type mapped onto [`WellKnownType`].
    ///
    /// # Errors
    ///
    /// [`VersionError::UnknownVersionType`] if the primary type is not
    /// well-known.
    pub fn well_known_type(&self) -> Result<WellKnownType, VersionError> {
        self.primary().well_known_type(&self.raw)
    }
}

impl fmt::Display for SrcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for SrcVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for SrcVersion {}

impl Hash for SrcVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
