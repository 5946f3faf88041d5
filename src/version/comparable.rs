use std::cmp::Ordering;
use std::fmt;

/// Version string with the ordering conventionally used by Maven repositories
///
/// The string is lowercased and split into items at `.` and `-`, as well as at every transition
/// between digits and letters. A `-` (or a digit/letter transition) starts a nested list, so
/// `1.0-rc1` is `[1, 0, [rc, [1]]]`. Comparison is item-wise:
///
///   - numbers compare numerically (with no upper bound on their size)
///   - qualifiers compare by their position in `alpha < beta < milestone < rc < snapshot <
///     (release) < sp`, where `cr` is an alias for `rc` and `ga`, `final`, and `release` are
///     aliases for a plain release. Unknown qualifiers come after `sp`, in lexical order.
///   - a number beats a qualifier or a nested list, and a nested list beats a qualifier
///   - missing items compare like `0` or like a plain release, so trailing zeroes don't matter
///     (`1.0` and `1` are equal)
#[derive(Clone)]
pub struct ComparableVersion {
    original: String,
    items: Vec<Item>,
}

#[derive(Clone, Debug)]
enum Item {
    /// Decimal digits, without leading zeroes
    Int(String),

    /// Qualifier key (see [`qualifier_key`])
    Str(String),

    List(Vec<Item>),
}

const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];
const RELEASE_INDEX: usize = 5;

/// Key under which a qualifier sorts (a string so unknown qualifiers can sort lexically)
fn qualifier_key(qualifier: &str, followed_by_digit: bool) -> String {
    let qualifier = match qualifier {
        "a" if followed_by_digit => "alpha",
        "b" if followed_by_digit => "beta",
        "m" if followed_by_digit => "milestone",
        "ga" | "final" | "release" => "",
        "cr" => "rc",
        other => other,
    };
    match QUALIFIERS.iter().position(|known| *known == qualifier) {
        Some(idx) => idx.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), qualifier),
    }
}

impl Item {
    fn int(digits: &str) -> Item {
        let trimmed = digits.trim_start_matches('0');
        Item::Int(trimmed.to_owned())
    }

    fn is_null(&self) -> bool {
        match self {
            Item::Int(digits) => digits.is_empty(),
            Item::Str(key) => *key == RELEASE_INDEX.to_string(),
            Item::List(items) => items.is_empty(),
        }
    }

    /// Drop null items from the end of the list, looking past nested lists but stopping at the
    /// last other non-null item
    fn normalize(items: &mut Vec<Item>) {
        for item in items.iter_mut() {
            if let Item::List(nested) = item {
                Item::normalize(nested);
            }
        }
        let mut idx = items.len();
        while idx > 0 {
            idx -= 1;
            if items[idx].is_null() {
                items.remove(idx);
            } else if !matches!(items[idx], Item::List(_)) {
                break;
            }
        }
    }

    fn compare(this: Option<&Item>, other: Option<&Item>) -> Ordering {
        match (this, other) {
            (None, None) => Ordering::Equal,
            (Some(item), None) => item.compare_to_null(),
            (None, Some(item)) => item.compare_to_null().reverse(),
            (Some(Item::Int(a)), Some(Item::Int(b))) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Some(Item::Int(_)), Some(_)) => Ordering::Greater,
            (Some(Item::Str(_)), Some(Item::Int(_))) => Ordering::Less,
            (Some(Item::Str(a)), Some(Item::Str(b))) => a.cmp(b),
            (Some(Item::Str(_)), Some(Item::List(_))) => Ordering::Less,
            (Some(Item::List(_)), Some(Item::Int(_))) => Ordering::Less,
            (Some(Item::List(_)), Some(Item::Str(_))) => Ordering::Greater,
            (Some(Item::List(a)), Some(Item::List(b))) => Item::compare_lists(a, b),
        }
    }

    fn compare_lists(a: &[Item], b: &[Item]) -> Ordering {
        for idx in 0..a.len().max(b.len()) {
            let ordering = Item::compare(a.get(idx), b.get(idx));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn compare_to_null(&self) -> Ordering {
        match self {
            Item::Int(digits) if digits.is_empty() => Ordering::Equal,
            Item::Int(_) => Ordering::Greater,
            Item::Str(key) => key.as_str().cmp(RELEASE_INDEX.to_string().as_str()),
            Item::List(items) => match items.first() {
                None => Ordering::Equal,
                Some(first) => first.compare_to_null(),
            },
        }
    }
}

impl ComparableVersion {
    pub fn new(version: &str) -> ComparableVersion {
        let lowered = version.to_lowercase();

        // Stack of lists being built (the last one is the innermost, currently being appended to)
        let mut stack: Vec<Vec<Item>> = vec![vec![]];
        let chars: Vec<char> = lowered.chars().collect();
        let mut start = 0;
        let mut is_digit = false;

        let token = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };
        let parse_item = |is_digit: bool, followed_by_digit: bool, text: String| -> Item {
            if is_digit {
                Item::int(&text)
            } else {
                Item::Str(qualifier_key(&text, followed_by_digit))
            }
        };
        fn current(stack: &mut [Vec<Item>]) -> &mut Vec<Item> {
            let last = stack.len() - 1;
            &mut stack[last]
        }

        for (idx, c) in chars.iter().copied().enumerate() {
            if c == '.' || c == '-' {
                let item = if idx == start {
                    Item::Int(String::new())
                } else {
                    parse_item(is_digit, false, token(start, idx))
                };
                current(&mut stack).push(item);
                start = idx + 1;
                if c == '-' {
                    stack.push(vec![]);
                }
            } else if c.is_ascii_digit() {
                if !is_digit && idx > start {
                    current(&mut stack).push(parse_item(false, true, token(start, idx)));
                    start = idx;
                    stack.push(vec![]);
                }
                is_digit = true;
            } else {
                if is_digit && idx > start {
                    current(&mut stack).push(parse_item(true, false, token(start, idx)));
                    start = idx;
                    stack.push(vec![]);
                }
                is_digit = false;
            }
        }
        if chars.len() > start {
            current(&mut stack).push(parse_item(is_digit, false, token(start, chars.len())));
        }

        // Fold nested lists back into their parents
        while stack.len() > 1 {
            if let Some(nested) = stack.pop() {
                current(&mut stack).push(Item::List(nested));
            }
        }
        let mut items = stack.pop().unwrap_or_default();
        Item::normalize(&mut items);

        ComparableVersion {
            original: version.to_owned(),
            items,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl From<&str> for ComparableVersion {
    fn from(version: &str) -> ComparableVersion {
        ComparableVersion::new(version)
    }
}

impl Ord for ComparableVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        Item::compare_lists(&self.items, &other.items)
    }
}

impl PartialOrd for ComparableVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ComparableVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ComparableVersion {}

impl fmt::Display for ComparableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl fmt::Debug for ComparableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.original, self.items)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn v(version: &str) -> ComparableVersion {
        ComparableVersion::new(version)
    }

    fn assert_ascending(versions: &[&str]) {
        for pair in versions.windows(2) {
            assert!(
                v(pair[0]) < v(pair[1]),
                "expected {} < {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn trailing_zeroes_are_insignificant() {
        assert_eq!(v("1"), v("1.0"));
        assert_eq!(v("1"), v("1.0.0"));
        assert_eq!(v("1.0"), v("1-0"));
        assert_eq!(v("2.0.0.RELEASE"), v("2.0"));
        assert_eq!(v("1.0-ga"), v("1.0-final"));
    }

    #[test]
    fn numeric_items() {
        assert_ascending(&["1", "1.1", "1.2", "1.9", "1.10", "1.10.1", "2", "10"]);
        assert!(v("99999999999999999999999.1") > v("99999999999999999999999"));
        assert_eq!(v("1.01"), v("1.1"));
    }

    #[test]
    fn qualifiers() {
        assert_ascending(&[
            "1-alpha",
            "1-alpha2",
            "1-beta",
            "1-milestone",
            "1-rc",
            "1-snapshot",
            "1",
            "1-sp",
            "1-abc",
            "1-xyz",
            "1.1",
        ]);
        assert_eq!(v("1-cr1"), v("1-rc1"));
        assert_eq!(v("1a1"), v("1-alpha-1"));
        assert_eq!(v("1.5.0-M1"), v("1.5.0-milestone1"));
        assert!(v("1.5.0-M1") < v("1.5.0"));
        assert_eq!(v("1.5-m1"), v("1.5.0-m1"));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(v("1.0-SNAPSHOT"), v("1.0-snapshot"));
        assert_eq!(v("1.0.Final"), v("1.0"));
    }

    #[test]
    fn original_is_kept() {
        assert_eq!(v("1.0.Final").to_string(), "1.0.Final");
    }
}
