use super::ArtifactCoordinate;
use crate::version::{DraftMarkers, DraftVersionFilter, VersionRange};
use crate::Error;
use std::collections::BTreeSet;
use std::fmt;

/// What the declaration claims about the versions in its range
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expectation {
    /// Every reference resolves
    Pass,

    /// At least one reference fails to resolve
    Fail,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expectation::Pass => "pass",
            Expectation::Fail => "fail",
        })
    }
}

/// Claim about which versions of a library an instrumentation is compatible with
///
/// ```
/// use refguard::assertion::{Declaration, Expectation};
///
/// # fn declare() -> Result<(), refguard::Error> {
/// let declaration = Declaration::pass("com.example", "client")
///     .versions("[1.0,2.0)")?
///     .skip("1.3.1")
///     .assert_inverse(true)
///     .extra_dependency("com.example:client-extras:1.0")?;
///
/// assert_eq!(declaration.expectation, Expectation::Pass);
/// assert!(declaration.versions.contains("1.9"));
/// assert!(!declaration.version_filter().accept("1.3.1"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Declaration {
    pub expectation: Expectation,
    pub group: String,
    pub artifact: String,

    /// Defaults to every version
    pub versions: VersionRange,
    pub skip: BTreeSet<String>,

    /// Only meaningful for [`Expectation::Pass`]
    pub assert_inverse: bool,
    pub extra_dependencies: Vec<ArtifactCoordinate>,
    pub excluded_dependencies: Vec<ArtifactCoordinate>,
    pub excluded_instrumentation_names: BTreeSet<String>,
    pub name: Option<String>,
    pub draft_markers: DraftMarkers,
}

impl Declaration {
    pub fn new(
        expectation: Expectation,
        group: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Declaration {
        Declaration {
            expectation,
            group: group.into(),
            artifact: artifact.into(),
            versions: VersionRange::unbounded(),
            skip: BTreeSet::new(),
            assert_inverse: false,
            extra_dependencies: vec![],
            excluded_dependencies: vec![],
            excluded_instrumentation_names: BTreeSet::new(),
            name: None,
            draft_markers: DraftMarkers::default(),
        }
    }

    pub fn pass(group: impl Into<String>, artifact: impl Into<String>) -> Declaration {
        Declaration::new(Expectation::Pass, group, artifact)
    }

    pub fn fail(group: impl Into<String>, artifact: impl Into<String>) -> Declaration {
        Declaration::new(Expectation::Fail, group, artifact)
    }

    /// Set the range from a Maven-style range expression (eg. `[1.0,2.0)`)
    pub fn versions(mut self, range: &str) -> Result<Declaration, Error> {
        self.versions = VersionRange::parse(range)?;
        Ok(self)
    }

    pub fn skip(mut self, version: &str) -> Declaration {
        self.skip.insert(version.to_owned());
        self
    }

    pub fn assert_inverse(mut self, assert_inverse: bool) -> Declaration {
        self.assert_inverse = assert_inverse;
        self
    }

    /// Add an artifact to every version's classpath
    pub fn extra_dependency(mut self, coordinate: &str) -> Result<Declaration, Error> {
        self.extra_dependencies
            .push(ArtifactCoordinate::parse(coordinate)?);
        Ok(self)
    }

    /// Drop matching artifacts from every version's classpath (a coordinate without a version
    /// drops every version)
    pub fn exclude_dependency(mut self, coordinate: &str) -> Result<Declaration, Error> {
        self.excluded_dependencies
            .push(ArtifactCoordinate::parse(coordinate)?);
        Ok(self)
    }

    /// Leave the references of this instrumentation module out of the check
    pub fn exclude_instrumentation_name(mut self, name: &str) -> Declaration {
        self.excluded_instrumentation_names.insert(name.to_owned());
        self
    }

    pub fn name(mut self, name: &str) -> Declaration {
        self.name = Some(name.to_owned());
        self
    }

    pub fn draft_markers(mut self, draft_markers: DraftMarkers) -> Declaration {
        self.draft_markers = draft_markers;
        self
    }

    pub fn version_filter(&self) -> DraftVersionFilter {
        DraftVersionFilter::new(self.draft_markers.clone()).skip(&self.skip)
    }

    pub fn is_excluded_dependency(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.excluded_dependencies
            .iter()
            .any(|excluded| excluded.matches(coordinate))
    }

    pub fn includes_module(&self, module_name: &str) -> bool {
        !self.excluded_instrumentation_names.contains(module_name)
    }
}

/// Either the explicit name or something like `pass com.example:client [1.0,2.0)`
impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(
                f,
                "{} {}:{} {}",
                self.expectation, self.group, self.artifact, self.versions
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder() {
        let declaration = Declaration::fail("com.example", "client")
            .versions("[3.0,)")
            .unwrap()
            .exclude_dependency("com.example:logging")
            .unwrap()
            .exclude_instrumentation_name("client-2.0");

        assert_eq!(declaration.expectation, Expectation::Fail);
        assert!(!declaration.assert_inverse);
        assert!(declaration.is_excluded_dependency(
            &ArtifactCoordinate::parse("com.example:logging:1.1").unwrap()
        ));
        assert!(!declaration.is_excluded_dependency(
            &ArtifactCoordinate::parse("com.example:client:3.0").unwrap()
        ));
        assert!(!declaration.includes_module("client-2.0"));
        assert!(declaration.includes_module("client-3.0"));
        assert_eq!(declaration.to_string(), "fail com.example:client [3.0,)");
        assert_eq!(declaration.name("client-3.0").to_string(), "client-3.0");
    }

    #[test]
    fn bad_configuration() {
        assert!(matches!(
            Declaration::pass("g", "a").versions("[2.0,1.0)"),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            Declaration::pass("g", "a").extra_dependency("nope"),
            Err(Error::InvalidCoordinate(_))
        ));
    }
}
