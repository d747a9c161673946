use crate::{MigrationError, MigrationResult};
use std::{cmp::Ordering, fmt};
use versions::Versioning;

/// A migration version, ordered by Semantic Versioning precedence.
///
/// The original string is kept, so that ledger entries are returned exactly as they were
/// recorded.
#[derive(Debug, Clone)]
pub struct MigrationVersion {
    raw: String,
    parsed: Versioning,
}

impl MigrationVersion {
    /// Parse a version string. A leading `v` is accepted, strings that do not start with a digit
    /// are not versions.
    pub fn parse(raw: &str) -> MigrationResult<Self> {
        let trimmed = raw.trim();
        let candidate = trimmed.strip_prefix('v').unwrap_or(trimmed);

        if !candidate.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(MigrationError::invalid_version(raw));
        }

        let parsed = Versioning::new(candidate).ok_or_else(|| MigrationError::invalid_version(raw))?;

        Ok(MigrationVersion {
            raw: raw.to_owned(),
            parsed,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for MigrationVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MigrationVersion {}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed.cmp(&other.parsed)
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> MigrationResult<Ordering> {
    Ok(MigrationVersion::parse(a)?.cmp(&MigrationVersion::parse(b)?))
}

/// Sort version strings ascending. The sort is stable, so equal versions keep their relative
/// order.
pub fn sort_versions<I, S>(versions: I) -> MigrationResult<Vec<MigrationVersion>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = versions
        .into_iter()
        .map(|version| MigrationVersion::parse(version.as_ref()))
        .collect::<MigrationResult<Vec<_>>>()?;

    parsed.sort();

    Ok(parsed)
}

/// The highest of the given versions, `None` if there are none.
pub fn latest_version<I, S>(versions: I) -> MigrationResult<Option<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(sort_versions(versions)?.pop().map(MigrationVersion::into_string))
}
