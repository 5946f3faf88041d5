use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// Run of hex characters after a separator, at the very end of a version
static TRAILING_HEX: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"[-+_]([0-9a-f]+)$")
        .case_insensitive(true)
        .build()
        .expect("trailing hex pattern must compile")
});

/// Lexical markers that identify pre-release, snapshot, and otherwise unofficial builds
///
/// Publishers don't agree on any one versioning scheme, so this is only ever a list of
/// substrings observed in practice, plus one pattern for builds identified by a commit hash
/// (`1.4.0-3f9ac21`). The defaults can be extended with [`DraftMarkers::with_marker`] or
/// replaced entirely with [`DraftMarkers::empty`].
#[derive(Clone, Debug)]
pub struct DraftMarkers {
    /// Lowercase substrings, any one of which marks a version as a draft
    markers: Vec<String>,

    /// Minimum number of hex characters in a trailing commit hash (`0` disables the rule)
    commit_hash_len: usize,
}

impl DraftMarkers {
    pub const DEFAULT_MARKERS: [&'static str; 13] = [
        "rc",
        ".cr",
        "alpha",
        "beta",
        "-b",
        ".m",
        "-m",
        "-dev",
        "-ea",
        "-atlassian-",
        "public_draft",
        "snapshot",
        "preview",
    ];

    pub const DEFAULT_COMMIT_HASH_LEN: usize = 6;

    /// No markers at all, and no commit hash rule
    pub fn empty() -> DraftMarkers {
        DraftMarkers {
            markers: vec![],
            commit_hash_len: 0,
        }
    }

    pub fn with_marker(mut self, marker: &str) -> DraftMarkers {
        self.markers.push(marker.to_lowercase());
        self
    }

    /// Treat a separator (`-`, `+`, or `_`) followed by at least `len` hex characters at the end
    /// of a version as a commit hash (`0` disables the rule)
    pub fn with_commit_hash_len(mut self, len: usize) -> DraftMarkers {
        self.commit_hash_len = len;
        self
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn commit_hash_len(&self) -> usize {
        self.commit_hash_len
    }

    /// Which marker (if any) makes this version a draft
    pub fn matching_marker(&self, version: &str) -> Option<&str> {
        let lowered = version.to_lowercase();
        if let Some(marker) = self
            .markers
            .iter()
            .find(|marker| lowered.contains(marker.as_str()))
        {
            return Some(marker.as_str());
        }
        if self.has_commit_hash(&lowered) {
            Some("commit hash")
        } else {
            None
        }
    }

    fn has_commit_hash(&self, version: &str) -> bool {
        if self.commit_hash_len == 0 {
            return false;
        }
        TRAILING_HEX
            .captures(version)
            .and_then(|captures| captures.get(1))
            .map_or(false, |hash| hash.as_str().len() >= self.commit_hash_len)
    }

    pub fn is_draft(&self, version: &str) -> bool {
        self.matching_marker(version).is_some()
    }
}

impl Default for DraftMarkers {
    fn default() -> DraftMarkers {
        DraftMarkers::DEFAULT_MARKERS
            .iter()
            .fold(DraftMarkers::empty(), |markers, marker| {
                markers.with_marker(marker)
            })
            .with_commit_hash_len(DraftMarkers::DEFAULT_COMMIT_HASH_LEN)
    }
}

/// Decides which candidate versions are worth verifying at all
///
/// A version is rejected when it is explicitly skipped (compared case-insensitively), when it is
/// a draft build, or when it doesn't look like a version in the first place (empty, containing
/// whitespace or control characters, or without a single digit).
#[derive(Clone, Debug, Default)]
pub struct DraftVersionFilter {
    markers: DraftMarkers,
    skip: BTreeSet<String>,
}

impl DraftVersionFilter {
    pub fn new(markers: DraftMarkers) -> DraftVersionFilter {
        DraftVersionFilter {
            markers,
            skip: BTreeSet::new(),
        }
    }

    pub fn skip<S: AsRef<str>>(mut self, versions: impl IntoIterator<Item = S>) -> Self {
        self.skip.extend(
            versions
                .into_iter()
                .map(|version| version.as_ref().to_lowercase()),
        );
        self
    }

    pub fn accept(&self, version: &str) -> bool {
        if !is_well_formed(version) {
            log::trace!("Rejecting malformed version {:?}", version);
            return false;
        }
        if self.skip.contains(&version.to_lowercase()) {
            log::trace!("Skipping version {}", version);
            return false;
        }
        if let Some(marker) = self.markers.matching_marker(version) {
            log::trace!("Rejecting draft version {} (matched {})", version, marker);
            return false;
        }
        true
    }
}

fn is_well_formed(version: &str) -> bool {
    !version.is_empty()
        && !version
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        && version.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn releases_are_accepted() {
        let filter = DraftVersionFilter::default();
        for version in ["1.0", "2.3.4", "5.0.0.Final", "1.2.3.RELEASE", "4.1.68", "0.9-1"] {
            assert!(filter.accept(version), "expected {} to be accepted", version);
        }
    }

    #[test]
    fn drafts_are_rejected() {
        let filter = DraftVersionFilter::default();
        for version in [
            "1.0-rc1",
            "1.0-RC2",
            "2.0.0-beta",
            "2.0.0-alpha-3",
            "3.0-SNAPSHOT",
            "1.5.0-M1",
            "1.5.0.m2",
            "6.0.0.CR1",
            "1.0-b12",
            "9-ea",
            "1.2-dev",
            "2.1.0-atlassian-4",
            "4.0.0-preview2",
            "1.4.0-3f9ac21",
            "1.4.0+deadbeef",
        ] {
            assert!(!filter.accept(version), "expected {} to be rejected", version);
        }
    }

    #[test]
    fn commit_hash_length() {
        let markers = DraftMarkers::default();
        assert!(!markers.is_draft("1.0-abc12"));
        assert!(markers.is_draft("1.0-abc123"));
        assert!(!markers.is_draft("1.0.abcdef"));

        let markers = DraftMarkers::default().with_commit_hash_len(8);
        assert!(!markers.is_draft("1.0-abc1234"));
        assert!(markers.is_draft("1.0-abc12345"));

        let markers = DraftMarkers::default().with_commit_hash_len(0);
        assert!(!markers.is_draft("1.0-abcdef1234"));

        // Long minimums are honoured rather than switching the rule off
        let markers = DraftMarkers::default().with_commit_hash_len(100_000);
        assert_eq!(markers.commit_hash_len(), 100_000);
        assert!(!markers.is_draft("1.0-abcdef1234"));
        let hash = "a".repeat(100_000);
        assert!(markers.is_draft(&format!("1.0-{}", hash)));
        assert_eq!(
            DraftMarkers::default().matching_marker("2.0-ABCDEF12"),
            Some("commit hash")
        );
    }

    #[test]
    fn custom_markers() {
        let markers = DraftMarkers::empty().with_marker("-Nightly");
        assert!(markers.is_draft("1.0-nightly"));
        assert!(!markers.is_draft("1.0-rc1"));
        assert_eq!(markers.matching_marker("2.0-NIGHTLY"), Some("-nightly"));
    }

    #[test]
    fn skipped_versions() {
        let filter = DraftVersionFilter::default().skip(["1.3.0", "1.4.0.Final"]);
        assert!(!filter.accept("1.3.0"));
        assert!(!filter.accept("1.4.0.FINAL"));
        assert!(filter.accept("1.3.1"));
    }

    #[test]
    fn malformed_versions() {
        let filter = DraftVersionFilter::default();
        for version in ["", "latest", "1.0 final", "1.0\n", "\u{7}1"] {
            assert!(!filter.accept(version), "expected {:?} to be rejected", version);
        }
    }
}
