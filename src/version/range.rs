use super::ComparableVersion;
use crate::Error;
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

/// Union of version intervals, written in the usual Maven notation
///
///   - `[1.0,2.0)` is versions from `1.0` (inclusive) up to `2.0` (exclusive)
///   - `(,1.5]` has no lower bound, `[3.0,)` has no upper bound, and `(,)` matches everything
///   - `[1.2]` and a bare `1.2` both match exactly version `1.2`
///   - `[1.0,2.0),[3.0,)` is the union of the two intervals
///
/// ```
/// use refguard::version::VersionRange;
///
/// let range: VersionRange = "[1.0,2.0),[3.0,)".parse().unwrap();
/// assert!(range.contains("1.6"));
/// assert!(!range.contains("2.0"));
/// assert!(range.contains("3.1.4"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionRange {
    intervals: Vec<Interval>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    pub lower: Bound<ComparableVersion>,
    pub upper: Bound<ComparableVersion>,
}

impl Interval {
    pub fn contains(&self, version: &ComparableVersion) -> bool {
        let above_lower = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(lower) => version >= lower,
            Bound::Excluded(lower) => version > lower,
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(upper) => version <= upper,
            Bound::Excluded(upper) => version < upper,
        };
        above_lower && below_upper
    }

    /// Is this an exact `[v]` interval?
    fn exact(&self) -> Option<&ComparableVersion> {
        match (&self.lower, &self.upper) {
            (Bound::Included(lower), Bound::Included(upper)) if lower == upper => Some(lower),
            _ => None,
        }
    }

    fn check_not_empty(&self, source: &str) -> Result<(), Error> {
        let (lower, lower_inclusive) = match &self.lower {
            Bound::Included(lower) => (lower, true),
            Bound::Excluded(lower) => (lower, false),
            Bound::Unbounded => return Ok(()),
        };
        let (upper, upper_inclusive) = match &self.upper {
            Bound::Included(upper) => (upper, true),
            Bound::Excluded(upper) => (upper, false),
            Bound::Unbounded => return Ok(()),
        };
        if lower > upper || (lower == upper && !(lower_inclusive && upper_inclusive)) {
            Err(Error::InvalidRange(format!(
                "'{}' has a lower bound above its upper bound",
                source
            )))
        } else {
            Ok(())
        }
    }
}

impl VersionRange {
    /// Range matching every version (`(,)`)
    pub fn unbounded() -> VersionRange {
        VersionRange {
            intervals: vec![Interval {
                lower: Bound::Unbounded,
                upper: Bound::Unbounded,
            }],
        }
    }

    pub fn parse(source: &str) -> Result<VersionRange, Error> {
        let invalid = |msg: &str| Error::InvalidRange(format!("'{}': {}", source, msg));
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty range"));
        }

        // Bare version, meaning exactly that version
        if !trimmed.starts_with(&['[', '('][..]) {
            if trimmed.contains(&[',', '[', ']', '(', ')'][..]) {
                return Err(invalid("unions must use bracketed intervals"));
            }
            let version = ComparableVersion::new(trimmed);
            return Ok(VersionRange {
                intervals: vec![Interval {
                    lower: Bound::Included(version.clone()),
                    upper: Bound::Included(version),
                }],
            });
        }

        let mut intervals = vec![];
        let mut rest = trimmed;
        loop {
            let open = rest.chars().next().ok_or_else(|| invalid("trailing comma"))?;
            if open != '[' && open != '(' {
                return Err(invalid("expected '[' or '('"));
            }
            let close_idx = rest
                .find(&[']', ')'][..])
                .ok_or_else(|| invalid("unterminated interval"))?;
            let close = rest[close_idx..].chars().next().unwrap_or(')');
            let body = &rest[1..close_idx];
            if body.contains(&['[', '('][..]) {
                return Err(invalid("nested brackets"));
            }

            let interval = match body.split_once(',') {
                None => {
                    let version = body.trim();
                    if open != '[' || close != ']' || version.is_empty() {
                        return Err(invalid("exact versions must be written as '[v]'"));
                    }
                    let version = ComparableVersion::new(version);
                    Interval {
                        lower: Bound::Included(version.clone()),
                        upper: Bound::Included(version),
                    }
                }
                Some((lower, upper)) => {
                    if upper.contains(',') {
                        return Err(invalid("intervals have at most two bounds"));
                    }
                    let bound = |version: &str, inclusive: bool| {
                        let version = version.trim();
                        if version.is_empty() {
                            Bound::Unbounded
                        } else if inclusive {
                            Bound::Included(ComparableVersion::new(version))
                        } else {
                            Bound::Excluded(ComparableVersion::new(version))
                        }
                    };
                    Interval {
                        lower: bound(lower, open == '['),
                        upper: bound(upper, close == ']'),
                    }
                }
            };
            interval.check_not_empty(source)?;
            intervals.push(interval);

            rest = rest[close_idx + 1..].trim_start();
            match rest.strip_prefix(',') {
                None if rest.is_empty() => break,
                None => return Err(invalid("expected ',' between intervals")),
                Some(after) => rest = after.trim_start(),
            }
        }

        Ok(VersionRange { intervals })
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn contains_version(&self, version: &ComparableVersion) -> bool {
        self.intervals
            .iter()
            .any(|interval| interval.contains(version))
    }

    pub fn contains(&self, version: &str) -> bool {
        self.contains_version(&ComparableVersion::new(version))
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(source: &str) -> Result<VersionRange, Error> {
        VersionRange::parse(source)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if let Some(exact) = interval.exact() {
                write!(f, "[{}]", exact)?;
                continue;
            }
            match &interval.lower {
                Bound::Unbounded => f.write_str("(")?,
                Bound::Included(lower) => write!(f, "[{}", lower)?,
                Bound::Excluded(lower) => write!(f, "({}", lower)?,
            }
            f.write_str(",")?;
            match &interval.upper {
                Bound::Unbounded => f.write_str(")")?,
                Bound::Included(upper) => write!(f, "{}]", upper)?,
                Bound::Excluded(upper) => write!(f, "{})", upper)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn range(source: &str) -> VersionRange {
        VersionRange::parse(source).unwrap()
    }

    #[test]
    fn half_open() {
        let r = range("[1.0,2.0)");
        assert!(r.contains("1.0"));
        assert!(r.contains("1"));
        assert!(r.contains("1.9.9"));
        assert!(!r.contains("2.0"));
        assert!(!r.contains("0.9"));

        // Pre-releases of the upper bound sort before it
        assert!(r.contains("2.0-rc1"));
    }

    #[test]
    fn open_and_unbounded() {
        let r = range("(1.0,)");
        assert!(!r.contains("1.0"));
        assert!(r.contains("1.0.1"));
        assert!(r.contains("100"));

        let r = range("(,1.5]");
        assert!(r.contains("0.0.1"));
        assert!(r.contains("1.5"));
        assert!(!r.contains("1.5.1"));

        assert!(range("(,)").contains("0"));
        assert_eq!(range("(,)"), VersionRange::unbounded());
    }

    #[test]
    fn exact_versions() {
        let r = range("[1.2]");
        assert!(r.contains("1.2.0"));
        assert!(!r.contains("1.2.1"));
        assert_eq!(range("1.2"), r);
    }

    #[test]
    fn unions() {
        let r = range("[1.0,2.0), [3.0,)");
        assert_eq!(r.intervals().len(), 2);
        assert!(r.contains("1.5"));
        assert!(!r.contains("2.5"));
        assert!(r.contains("3.0"));
    }

    #[test]
    fn display() {
        assert_eq!(range("[1.0, 2.0)").to_string(), "[1.0,2.0)");
        assert_eq!(range("(,)").to_string(), "(,)");
        assert_eq!(range("3.1").to_string(), "[3.1]");
        assert_eq!(range("(,1.0],[1.2,)").to_string(), "(,1.0],[1.2,)");
    }

    #[test]
    fn malformed() {
        for source in [
            "",
            "[2.0,1.0)",
            "(1.0,1.0)",
            "[1.0,1.0)",
            "[1.0,2.0",
            "[1.0,2.0),",
            "[1.0,2.0)[3.0,4.0)",
            "(1.0)",
            "[1,2,3]",
            "1.0,2.0",
            "[[1.0,2.0)",
        ] {
            assert!(
                matches!(VersionRange::parse(source), Err(Error::InvalidRange(_))),
                "expected '{}' to be rejected",
                source
            );
        }
        assert!(VersionRange::parse("[1.0,1.0]").is_ok());
    }
}
