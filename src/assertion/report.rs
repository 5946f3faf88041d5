use super::Expectation;
use crate::matcher::MismatchReport;
use std::fmt;

/// How a single version fared, independent of what was expected of it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    AllResolved,
    HasMismatches,

    /// The artifacts for the version could not be read
    MalformedArtifact(String),
}

/// Why a version was checked at all
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Inside the declared range
    Inside,

    /// Outside the declared range, checked because the declaration asserts the inverse
    Inverse,
}

/// Verdict for one (declaration, version) pair
#[derive(Clone, Debug)]
pub struct Verdict {
    pub version: String,
    pub expectation: Expectation,
    pub scope: Scope,
    pub resolution: Resolution,

    /// Does the resolution agree with what the declaration claims for this scope?
    pub consistent: bool,
    pub report: MismatchReport,
}

impl Verdict {
    pub fn new(
        version: String,
        expectation: Expectation,
        scope: Scope,
        resolution: Resolution,
        report: MismatchReport,
    ) -> Verdict {
        let consistent = match (&resolution, scope, expectation) {
            (Resolution::MalformedArtifact(_), _, _) => false,
            (Resolution::AllResolved, Scope::Inside, Expectation::Pass) => true,
            (Resolution::HasMismatches, Scope::Inside, Expectation::Fail) => true,
            (Resolution::HasMismatches, Scope::Inverse, _) => true,
            _ => false,
        };
        Verdict {
            version,
            expectation,
            scope,
            resolution,
            consistent,
            report,
        }
    }

    /// Failure this verdict amounts to, if it is inconsistent
    pub fn failure(&self) -> Option<AssertionFailure> {
        if self.consistent {
            return None;
        }
        let version = self.version.clone();
        Some(match (&self.resolution, self.scope) {
            (Resolution::MalformedArtifact(message), _) => AssertionFailure::MalformedArtifact {
                version,
                message: message.clone(),
            },
            (_, Scope::Inverse) => AssertionFailure::InverseAssertionViolated { version },
            (_, Scope::Inside) => match self.expectation {
                Expectation::Pass => AssertionFailure::InsideRangeMismatch { version },
                Expectation::Fail => AssertionFailure::UnexpectedResolution { version },
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertionFailure {
    /// A version inside the range of a `Pass` declaration has unresolved references
    InsideRangeMismatch { version: String },

    /// A version outside the range resolved, although the declaration asserts it shouldn't
    InverseAssertionViolated { version: String },

    /// A version inside the range of a `Fail` declaration resolved after all
    UnexpectedResolution { version: String },

    MalformedArtifact { version: String, message: String },

    /// No accepted version falls inside the range
    NoVersionsInRange,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionFailure::InsideRangeMismatch { version } => {
                write!(f, "version {} is in range but has unresolved references", version)
            }
            AssertionFailure::InverseAssertionViolated { version } => write!(
                f,
                "inverse assertion violated: version {} is out of range but resolves",
                version
            ),
            AssertionFailure::UnexpectedResolution { version } => write!(
                f,
                "version {} is expected to fail but every reference resolves",
                version
            ),
            AssertionFailure::MalformedArtifact { version, message } => {
                write!(f, "version {} has a malformed artifact: {}", version, message)
            }
            AssertionFailure::NoVersionsInRange => f.write_str("no accepted versions in range"),
        }
    }
}

/// Everything learned from evaluating one declaration
#[derive(Clone, Debug)]
pub struct DeclarationReport {
    /// Display name of the declaration
    pub declaration: String,

    /// In ascending version order
    pub verdicts: Vec<Verdict>,
    pub failures: Vec<AssertionFailure>,
}

impl DeclarationReport {
    pub fn new(declaration: String, verdicts: Vec<Verdict>) -> DeclarationReport {
        let mut failures: Vec<AssertionFailure> =
            verdicts.iter().filter_map(Verdict::failure).collect();
        if !verdicts.iter().any(|verdict| verdict.scope == Scope::Inside) {
            failures.push(AssertionFailure::NoVersionsInRange);
        }
        DeclarationReport {
            declaration,
            verdicts,
            failures,
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn verdict(&self, version: &str) -> Option<&Verdict> {
        self.verdicts
            .iter()
            .find(|verdict| verdict.version == version)
    }
}

impl fmt::Display for DeclarationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return writeln!(
                f,
                "PASSED {} ({} versions)",
                self.declaration,
                self.verdicts.len()
            );
        }

        writeln!(f, "FAILED {}", self.declaration)?;
        for failure in &self.failures {
            writeln!(f, "  {}", failure)?;
        }
        for verdict in self.verdicts.iter().filter(|verdict| !verdict.consistent) {
            for mismatch in verdict.report.mismatches() {
                writeln!(
                    f,
                    "    {}: {}: {}",
                    verdict.version, mismatch.outcome, mismatch.reference
                )?;
            }
        }
        Ok(())
    }
}

/// Reports for several declarations (eg. everything declared for one build)
#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub reports: Vec<DeclarationReport>,
}

impl Summary {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(DeclarationReport::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeclarationReport> + '_ {
        self.reports.iter().filter(|report| !report.passed())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed().count();
        if failed == 0 {
            return writeln!(f, "All {} declarations passed", self.reports.len());
        }
        writeln!(
            f,
            "{} of {} declarations failed",
            failed,
            self.reports.len()
        )?;
        for report in self.failed() {
            write!(f, "{}", report)?;
        }
        Ok(())
    }
}
