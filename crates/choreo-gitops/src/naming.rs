//! Release names: `<component>-<YYYYMMDD>-<version>`.

use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static DATE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}$").expect("valid date regex"));

static VERSION_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|[1-9]\d*)$").expect("valid version regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseNameError {
    #[error("Release name '{0}' must have the form <component>-<YYYYMMDD>-<version>")]
    TooFewSegments(String),

    #[error("Release name '{name}' has an invalid date segment '{segment}'")]
    InvalidDate { name: String, segment: String },

    #[error("Release name '{name}' has an invalid version segment '{segment}'")]
    InvalidVersion { name: String, segment: String },

    #[error("No version left after release '{0}'")]
    VersionExhausted(String),
}

/// A parsed release name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseName {
    pub component: String,
    /// Eight digits, `YYYYMMDD`.
    pub date: String,
    pub version: u64,
}

impl ReleaseName {
    pub fn new(component: impl Into<String>, date: NaiveDate, version: u64) -> Self {
        Self {
            component: component.into(),
            date: format_date(date),
            version,
        }
    }

    /// Splits on the last two hyphens; the component part may contain hyphens.
    pub fn parse(name: &str) -> Result<Self, ReleaseNameError> {
        let mut segments = name.rsplitn(3, '-');
        let (Some(version), Some(date), Some(component)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(ReleaseNameError::TooFewSegments(name.to_string()));
        };
        if component.is_empty() {
            return Err(ReleaseNameError::TooFewSegments(name.to_string()));
        }

        if !DATE_SEGMENT.is_match(date) {
            return Err(ReleaseNameError::InvalidDate {
                name: name.to_string(),
                segment: date.to_string(),
            });
        }

        let version = VERSION_SEGMENT
            .is_match(version)
            .then(|| version.parse::<u64>().ok())
            .flatten()
            .ok_or_else(|| ReleaseNameError::InvalidVersion {
                name: name.to_string(),
                segment: version.to_string(),
            })?;

        Ok(Self {
            component: component.to_string(),
            date: date.to_string(),
            version,
        })
    }

    /// The same release with the version bumped by one.
    pub fn next(&self) -> Result<Self, ReleaseNameError> {
        let version = self
            .version
            .checked_add(1)
            .ok_or_else(|| ReleaseNameError::VersionExhausted(self.to_string()))?;
        Ok(Self {
            version,
            ..self.clone()
        })
    }

    /// Orders releases of one component chronologically: by date, then version.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then(self.version.cmp(&other.version))
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.component, self.date, self.version)
    }
}

impl FromStr for ReleaseName {
    type Err = ReleaseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Compares two release names so that the later release sorts greater.
///
/// Names that parse are ordered by date and then numeric version; anything
/// else falls back to plain string order.
pub fn compare_release_names(a: &str, b: &str) -> Ordering {
    match (ReleaseName::parse(a), ReleaseName::parse(b)) {
        (Ok(a_name), Ok(b_name)) => a_name
            .chronological_cmp(&b_name)
            .then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

/// The version the next release of `component` on `date` should use:
/// one more than the highest existing version, or 0.
pub fn next_version<'a, I>(
    component: &str,
    date: &str,
    existing: I,
) -> Result<u64, ReleaseNameError>
where
    I: IntoIterator<Item = &'a str>,
{
    let latest = existing
        .into_iter()
        .filter_map(|name| ReleaseName::parse(name).ok())
        .filter(|parsed| parsed.component == component && parsed.date == date)
        .max_by_key(|parsed| parsed.version);

    match latest {
        Some(parsed) => Ok(parsed.next()?.version),
        None => Ok(0),
    }
}
