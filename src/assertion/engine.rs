use super::{
    ArtifactCoordinate, ArtifactResolver, Declaration, DeclarationReport, Expectation,
    ResolvedArtifact, Resolution, Scope, Summary, Verdict,
};
use crate::matcher::{MismatchReport, ReferenceMatcher};
use crate::reference::{
    InstrumentationModule, ModuleConfig, ReferenceCollector, ReferenceManifest,
};
use crate::resolve::ResolutionContext;
use crate::version::{ComparableVersion, VersionRange};
use crate::Error;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Evaluates declarations against every candidate version of a library
///
/// The references of each instrumentation module are collected once, up front. Every version
/// then gets its own [`ResolutionContext`], so nothing one version defines can leak into the
/// verification of another.
pub struct AssertionEngine<R> {
    resolver: R,
    config: ModuleConfig,

    /// Module names along with their references
    manifests: Vec<(String, ReferenceManifest)>,
    parallel: bool,
}

impl<R: ArtifactResolver> AssertionEngine<R> {
    pub fn new(
        resolver: R,
        config: ModuleConfig,
        modules: &[InstrumentationModule],
    ) -> Result<AssertionEngine<R>, Error> {
        let collector = ReferenceCollector::new(config);
        let manifests = modules
            .iter()
            .map(|module| Ok((module.name().to_owned(), collector.collect(module)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(AssertionEngine {
            resolver,
            config: collector.config().clone(),
            manifests,
            parallel: true,
        })
    }

    /// Verify versions one after another instead of on the rayon thread pool
    pub fn with_parallelism(mut self, parallel: bool) -> AssertionEngine<R> {
        self.parallel = parallel;
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// References of every module that the declaration doesn't exclude, merged
    pub fn manifest_for(&self, declaration: &Declaration) -> ReferenceManifest {
        let mut manifest = ReferenceManifest::new();
        for (name, module_manifest) in &self.manifests {
            if declaration.includes_module(name) {
                manifest.merge(module_manifest);
            } else {
                log::debug!("Excluding references of module '{}'", name);
            }
        }
        manifest
    }

    pub fn evaluate_all(&self, declarations: &[Declaration]) -> Result<Summary, Error> {
        let reports = declarations
            .iter()
            .map(|declaration| self.evaluate(declaration))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Summary { reports })
    }

    pub fn evaluate(&self, declaration: &Declaration) -> Result<DeclarationReport, Error> {
        let candidates = self.resolver.resolve_candidate_versions(
            &declaration.group,
            &declaration.artifact,
            &VersionRange::unbounded(),
        )?;
        let selected = select_versions(declaration, candidates);
        let manifest = self.manifest_for(declaration);
        log::debug!(
            "Checking {} references of '{}' against {} versions",
            manifest.len(),
            declaration,
            selected.len()
        );

        let mut verdicts = if self.parallel {
            selected
                .par_iter()
                .map(|(version, scope)| self.verify(declaration, &manifest, version, *scope))
                .collect::<Result<Vec<_>, Error>>()?
        } else {
            selected
                .iter()
                .map(|(version, scope)| self.verify(declaration, &manifest, version, *scope))
                .collect::<Result<Vec<_>, Error>>()?
        };
        verdicts.sort_by_cached_key(|verdict| ComparableVersion::new(&verdict.version));

        let report = DeclarationReport::new(declaration.to_string(), verdicts);
        if report.passed() {
            log::info!("{}: passed ({} versions)", declaration, report.verdicts.len());
        } else {
            log::info!(
                "{}: failed ({} failures)",
                declaration,
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Verify the manifest against one version of the library
    fn verify(
        &self,
        declaration: &Declaration,
        manifest: &ReferenceManifest,
        version: &str,
        scope: Scope,
    ) -> Result<Verdict, Error> {
        let coordinate = ArtifactCoordinate::new(
            &declaration.group,
            &declaration.artifact,
            Some(version.to_owned()),
        );
        let artifacts = self.classpath(declaration, &coordinate)?;
        let bytes: Vec<&[u8]> = artifacts
            .iter()
            .map(|artifact| artifact.bytes.as_slice())
            .collect();

        let (resolution, report) = match ResolutionContext::from_artifacts(&bytes) {
            Ok(context) => {
                let matcher = ReferenceMatcher::new(&context, &self.config.platform);
                let report = matcher.check_all(manifest);
                let resolution = if report.all_resolved() {
                    Resolution::AllResolved
                } else {
                    Resolution::HasMismatches
                };
                (resolution, report)
            }
            Err(err @ (Error::MalformedArtifact(_) | Error::MalformedClass(_))) => {
                log::warn!("{}: {}", coordinate, err);
                (
                    Resolution::MalformedArtifact(err.to_string()),
                    MismatchReport::default(),
                )
            }
            Err(err) => return Err(err),
        };

        let verdict = Verdict::new(
            version.to_owned(),
            declaration.expectation,
            scope,
            resolution,
            report,
        );
        log::debug!(
            "{}: {:?} ({} mismatches, {})",
            coordinate,
            verdict.resolution,
            verdict.report.mismatches().count(),
            if verdict.consistent { "consistent" } else { "inconsistent" }
        );
        Ok(verdict)
    }

    /// The artifact, its dependencies, and the declared extra dependencies, minus exclusions
    fn classpath(
        &self,
        declaration: &Declaration,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Vec<ResolvedArtifact>, Error> {
        let mut artifacts = self.resolver.fetch_artifact_bytes(coordinate)?;
        for extra in &declaration.extra_dependencies {
            artifacts.extend(self.resolver.fetch_artifact_bytes(extra)?);
        }
        artifacts.retain(|artifact| {
            let excluded = declaration.is_excluded_dependency(&artifact.coordinate);
            if excluded {
                log::trace!("Excluding {} from {}", artifact.coordinate, coordinate);
            }
            !excluded
        });
        Ok(artifacts)
    }
}

/// Candidate versions worth verifying, along with why
///
/// Versions rejected by the declaration's filter are dropped, as are versions outside the range
/// (unless the declaration asserts the inverse).
fn select_versions(declaration: &Declaration, candidates: Vec<String>) -> Vec<(String, Scope)> {
    let filter = declaration.version_filter();
    let mut seen = BTreeSet::new();
    candidates
        .into_iter()
        .filter(|version| seen.insert(version.clone()))
        .filter(|version| filter.accept(version))
        .filter_map(|version| {
            if declaration.versions.contains(&version) {
                Some((version, Scope::Inside))
            } else if declaration.expectation == Expectation::Pass && declaration.assert_inverse {
                Some((version, Scope::Inverse))
            } else {
                None
            }
        })
        .collect()
}
