//! Version stamps for specs.
//!
//! Each stamp's id is derived from a SHA-256 of the spec's JSON at the time
//! it was taken, and points at the previous stamp, so the history forms a
//! hash chain.

use crate::diff::{compute_diff, format_cost_delta};
use crate::model::{ArchSpec, ArchVersion};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a version id in hex characters.
pub const VERSION_ID_LEN: usize = 12;
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to serialize spec: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("History entry {index} ({version_id}) has parent {found:?}, expected {expected:?}")]
    BrokenChain {
        index: usize,
        version_id: String,
        expected: String,
        found: String,
    },
}

/// Full SHA-256 hex digest of the spec's compact JSON form.
pub fn content_hash(spec: &ArchSpec) -> Result<String, HistoryError> {
    let content = serde_json::to_string(spec)?;
    Ok(hex::encode(Sha256::digest(content.as_bytes())))
}

/// First `VERSION_ID_LEN` hex characters of the content hash.
pub fn version_id(spec: &ArchSpec) -> Result<String, HistoryError> {
    let mut hash = content_hash(spec)?;
    hash.truncate(VERSION_ID_LEN);
    Ok(hash)
}

/// Stamp the spec with a new version taken now.
pub fn create_version(
    spec: &ArchSpec,
    description: &str,
    author: &str,
) -> Result<(ArchSpec, String), HistoryError> {
    create_version_at(spec, description, author, Utc::now())
}

/// Return a copy of `spec` with one more history entry, and the new id.
pub fn create_version_at(
    spec: &ArchSpec,
    description: &str,
    author: &str,
    timestamp: DateTime<Utc>,
) -> Result<(ArchSpec, String), HistoryError> {
    let id = version_id(spec)?;
    let parent_version = spec
        .current_version()
        .map(|v| v.version_id.clone())
        .unwrap_or_default();

    let mut stamped = spec.clone();
    stamped.history.push(ArchVersion {
        version_id: id.clone(),
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        author: author.to_string(),
        description: description.to_string(),
        parent_version,
    });

    Ok((stamped, id))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub version: String,
    pub timestamp: String,
    pub author: String,
    pub description: String,
    pub parent: String,
}

pub fn timeline(spec: &ArchSpec) -> Vec<TimelineEntry> {
    spec.history
        .iter()
        .map(|v| TimelineEntry {
            version: v.version_id.clone(),
            timestamp: v.timestamp.clone(),
            author: v.author.clone(),
            description: v.description.clone(),
            parent: v.parent_version.clone(),
        })
        .collect()
}

/// Condensed diff between two versioned specs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDiff {
    pub from_version: String,
    pub to_version: String,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub connection_changes: usize,
    pub cost_delta: f64,
    pub summary: String,
}

pub fn diff_versions(v1: &ArchSpec, v2: &ArchSpec) -> VersionDiff {
    let diff = compute_diff(v1, v2);
    let latest = |spec: &ArchSpec| {
        spec.current_version()
            .map(|v| v.version_id.clone())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    };

    VersionDiff {
        from_version: latest(v1),
        to_version: latest(v2),
        added: diff.added.len(),
        removed: diff.removed.len(),
        changed: diff.changed.len(),
        connection_changes: diff.connection_changes.len(),
        cost_delta: diff.cost_delta,
        summary: diff.summary,
    }
}

/// Every entry after the first must name its predecessor as parent, and the
/// first must have none.
pub fn verify_chain(history: &[ArchVersion]) -> Result<(), HistoryError> {
    let mut expected = String::new();
    for (index, entry) in history.iter().enumerate() {
        if entry.parent_version != expected {
            return Err(HistoryError::BrokenChain {
                index,
                version_id: entry.version_id.clone(),
                expected,
                found: entry.parent_version.clone(),
            });
        }
        expected = entry.version_id.clone();
    }
    Ok(())
}

pub fn format_timeline_markdown(spec: &ArchSpec) -> String {
    let mut output = String::new();

    output.push_str(&format!("# History: {}\n\n", spec.name));

    if spec.history.is_empty() {
        output.push_str("*No versions recorded. Use `cloudwright version` to stamp one.*\n");
        return output;
    }

    match verify_chain(&spec.history) {
        Ok(()) => output.push_str(&format!(
            "**{}** version(s), chain intact\n\n",
            spec.history.len()
        )),
        Err(e) => output.push_str(&format!("**Chain broken**: {}\n\n", e)),
    }

    output.push_str("| Version | Timestamp | Author | Description |\n");
    output.push_str("|---|---|---|---|\n");
    for entry in timeline(spec).iter().rev() {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            entry.version,
            entry.timestamp,
            if entry.author.is_empty() { "-" } else { entry.author.as_str() },
            entry.description
        ));
    }

    output
}

pub fn format_timeline_json(spec: &ArchSpec) -> String {
    let output = json!({
        "name": spec.name,
        "chain_intact": verify_chain(&spec.history).is_ok(),
        "timeline": timeline(spec),
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_version_diff_markdown(diff: &VersionDiff) -> String {
    format!(
        "# {} -> {}\n\n- **Added**: {}\n- **Removed**: {}\n- **Changed**: {}\n- **Connection changes**: {}\n- **Cost delta**: {}/mo\n\n{}\n",
        diff.from_version,
        diff.to_version,
        diff.added,
        diff.removed,
        diff.changed,
        diff.connection_changes,
        format_cost_delta(diff.cost_delta),
        diff.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Provider};
    use chrono::TimeZone;

    fn spec() -> ArchSpec {
        ArchSpec::new("Versioned")
            .with_component(Component::new("web", "ec2", Provider::Aws, "Web").unwrap())
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_version_id_deterministic() {
        let a = version_id(&spec()).unwrap();
        let b = version_id(&spec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), VERSION_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(content_hash(&spec()).unwrap().len(), 64);
        assert!(content_hash(&spec()).unwrap().starts_with(&a));
    }

    #[test]
    fn test_version_id_tracks_content() {
        let changed = spec().with_component(Component::new("db", "rds", Provider::Aws, "DB").unwrap());
        assert_ne!(version_id(&spec()).unwrap(), version_id(&changed).unwrap());
    }

    #[test]
    fn test_create_version_chains() {
        let (v1, id1) = create_version_at(&spec(), "initial", "ops", at(9)).unwrap();
        assert_eq!(v1.history.len(), 1);
        assert_eq!(v1.history[0].parent_version, "");
        assert_eq!(v1.history[0].timestamp, "2026-03-01T09:00:00Z");
        assert!(spec().history.is_empty());

        let (v2, id2) = create_version_at(&v1, "second", "", at(10)).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(v2.history[1].parent_version, id1);
        assert!(verify_chain(&v2.history).is_ok());

        let entries = timeline(&v2);
        assert_eq!(entries[1].version, id2);
        assert_eq!(entries[1].parent, id1);
    }

    #[test]
    fn test_broken_chain_detected() {
        let (v1, _) = create_version_at(&spec(), "a", "", at(9)).unwrap();
        let (mut v2, _) = create_version_at(&v1, "b", "", at(10)).unwrap();
        v2.history[1].parent_version = "deadbeef0000".to_string();
        let err = verify_chain(&v2.history).unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain { index: 1, .. }));
    }

    #[test]
    fn test_diff_versions() {
        let (v1, id1) = create_version_at(&spec(), "a", "", at(9)).unwrap();
        let grown = v1
            .clone()
            .with_component(Component::new("db", "rds", Provider::Aws, "DB").unwrap());
        let (v2, id2) = create_version_at(&grown, "b", "", at(10)).unwrap();

        let diff = diff_versions(&v1, &v2);
        assert_eq!(diff.from_version, id1);
        assert_eq!(diff.to_version, id2);
        assert_eq!(diff.added, 1);
        assert_eq!(diff.removed, 0);

        let unversioned = diff_versions(&spec(), &spec());
        assert_eq!(unversioned.from_version, UNKNOWN_VERSION);
        assert_eq!(unversioned.added, 0);
    }

    #[test]
    fn test_timeline_markdown() {
        let (v1, id1) = create_version_at(&spec(), "initial", "ops", at(9)).unwrap();
        let md = format_timeline_markdown(&v1);
        assert!(md.contains("chain intact"));
        assert!(md.contains(&format!("`{}`", id1)));
        assert!(format_timeline_markdown(&spec()).contains("No versions recorded"));
    }
}
