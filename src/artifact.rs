//! The closed artifact registry.
//!
//! Every file that constitutes a run is named here: artifact name, filename,
//! and contract version. Writers and readers go through this registry so the
//! set cannot drift, and `run.status.json.artifactVersions` is generated from
//! it for reader self-validation.

use std::collections::BTreeMap;

use crate::error::ArtifactError;

/// The closed set of JSON artifacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Learn,
    Observe,
    Findings,
    Summary,
    RunStatus,
    RunMeta,
    Project,
    Traces,
    IntegrityManifest,
}

impl ArtifactId {
    /// All artifacts, in emission order.
    pub const ALL: [ArtifactId; 9] = [
        Self::Learn,
        Self::Observe,
        Self::Findings,
        Self::Summary,
        Self::RunStatus,
        Self::RunMeta,
        Self::Project,
        Self::Traces,
        Self::IntegrityManifest,
    ];

    /// Registry name used in `artifactVersions` keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Learn => "learn",
            Self::Observe => "observe",
            Self::Findings => "findings",
            Self::Summary => "summary",
            Self::RunStatus => "run.status",
            Self::RunMeta => "run.meta",
            Self::Project => "project",
            Self::Traces => "traces",
            Self::IntegrityManifest => "integrity.manifest",
        }
    }

    /// On-disk filename inside the run directory.
    #[must_use]
    pub const fn filename(self) -> &'static str {
        match self {
            Self::Learn => "learn.json",
            Self::Observe => "observe.json",
            Self::Findings => "findings.json",
            Self::Summary => "summary.json",
            Self::RunStatus => "run.status.json",
            Self::RunMeta => "run.meta.json",
            Self::Project => "project.json",
            Self::Traces => "traces.json",
            Self::IntegrityManifest => "integrity.manifest.json",
        }
    }

    /// Contract version. Single-versioned today; the registry keeps the
    /// per-artifact granularity so versions can diverge later.
    #[must_use]
    pub const fn contract_version(self) -> u32 {
        crate::types::CONTRACT_VERSION
    }

    /// Resolve a registry name back to its artifact.
    pub fn from_name(name: &str) -> Result<Self, ArtifactError> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| ArtifactError::UnknownArtifact {
                name: name.to_string(),
            })
    }
}

/// The `artifactVersions` map persisted in `run.status.json`.
#[must_use]
pub fn artifact_versions() -> BTreeMap<String, u32> {
    ArtifactId::ALL
        .into_iter()
        .map(|id| (id.name().to_string(), id.contract_version()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_closed_and_consistent() {
        for id in ArtifactId::ALL {
            assert!(id.filename().ends_with(".json"));
            assert_eq!(id.contract_version(), 1);
            assert_eq!(ArtifactId::from_name(id.name()).unwrap(), id);
        }
    }

    #[test]
    fn unknown_artifact_name_is_rejected() {
        let err = ArtifactId::from_name("doctor").unwrap_err();
        assert!(matches!(err, ArtifactError::UnknownArtifact { .. }));
    }

    #[test]
    fn artifact_versions_covers_every_artifact() {
        let versions = artifact_versions();
        assert_eq!(versions.len(), ArtifactId::ALL.len());
        assert_eq!(versions.get("learn"), Some(&1));
        assert_eq!(versions.get("run.status"), Some(&1));
        assert_eq!(versions.get("integrity.manifest"), Some(&1));
    }

    #[test]
    fn filenames_match_registry_names() {
        assert_eq!(ArtifactId::RunStatus.filename(), "run.status.json");
        assert_eq!(ArtifactId::RunMeta.filename(), "run.meta.json");
        assert_eq!(
            ArtifactId::IntegrityManifest.filename(),
            "integrity.manifest.json"
        );
    }
}
