use crate::version::VersionRange;
use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Maven-style `group:artifact[:version]` coordinate
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactCoordinate {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: Option<String>,
    ) -> ArtifactCoordinate {
        ArtifactCoordinate {
            group: group.into(),
            artifact: artifact.into(),
            version,
        }
    }

    pub fn parse(source: &str) -> Result<ArtifactCoordinate, Error> {
        let parts: Vec<&str> = source.split(':').collect();
        let valid = |part: &&str| !part.is_empty() && !part.contains(char::is_whitespace);
        match parts.as_slice() {
            [group, artifact] if parts.iter().all(valid) => {
                Ok(ArtifactCoordinate::new(*group, *artifact, None))
            }
            [group, artifact, version] if parts.iter().all(valid) => Ok(ArtifactCoordinate::new(
                *group,
                *artifact,
                Some((*version).to_owned()),
            )),
            _ => Err(Error::InvalidCoordinate(source.to_owned())),
        }
    }

    /// Same coordinate, pinned to a version
    pub fn with_version(&self, version: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new(
            self.group.clone(),
            self.artifact.clone(),
            Some(version.to_owned()),
        )
    }

    /// Does this coordinate (used as a pattern) cover the other one?
    ///
    /// A pattern without a version covers every version of the artifact.
    pub fn matches(&self, other: &ArtifactCoordinate) -> bool {
        self.group == other.group
            && self.artifact == other.artifact
            && (self.version.is_none() || self.version == other.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = Error;

    fn from_str(source: &str) -> Result<ArtifactCoordinate, Error> {
        ArtifactCoordinate::parse(source)
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        Ok(())
    }
}

/// Artifact bytes (a jar or a class file), tagged with where they came from
#[derive(Clone, Debug)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub bytes: Vec<u8>,
}

/// Error reported by an [`ArtifactResolver`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverFailure {
    message: String,
}

impl ResolverFailure {
    pub fn new(message: impl Into<String>) -> ResolverFailure {
        ResolverFailure {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ResolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ResolverFailure {}

/// Source of library versions and their bytes (eg. a Maven repository)
///
/// Implementations are shared between the threads that verify different versions.
pub trait ArtifactResolver: Sync {
    /// Every published version of the artifact that falls in the range
    fn resolve_candidate_versions(
        &self,
        group: &str,
        artifact: &str,
        range: &VersionRange,
    ) -> Result<Vec<String>, ResolverFailure>;

    /// The artifact itself, followed by its runtime dependencies
    fn fetch_artifact_bytes(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Vec<ResolvedArtifact>, ResolverFailure>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coordinates() {
        let pinned = ArtifactCoordinate::parse("com.example:client:1.2").unwrap();
        assert_eq!(pinned.group, "com.example");
        assert_eq!(pinned.version.as_deref(), Some("1.2"));
        assert_eq!(pinned.to_string(), "com.example:client:1.2");

        let any: ArtifactCoordinate = "com.example:client".parse().unwrap();
        assert_eq!(any.version, None);
        assert!(any.matches(&pinned));
        assert!(!pinned.matches(&any));
        assert!(pinned.matches(&any.with_version("1.2")));
        assert!(!any.matches(&ArtifactCoordinate::new("com.example", "server", None)));
    }

    #[test]
    fn malformed_coordinates() {
        for bad in ["", "client", "com.example:", ":client", "a:b:c:d", "a b:c"] {
            assert!(
                matches!(ArtifactCoordinate::parse(bad), Err(Error::InvalidCoordinate(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
