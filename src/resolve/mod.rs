//! Isolated, per-version views of a library's classes

mod artifact;
mod context;
mod descriptor;

pub use artifact::*;
pub use context::*;
pub use descriptor::*;

use crate::jvm::BinaryName;

/// Package prefixes of classes provided by the Java platform itself
///
/// Platform classes are never part of a resolution context, so references to them are not
/// collected, and lookups that wander into them are given the benefit of the doubt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    prefixes: Vec<String>,
}

impl Platform {
    pub const DEFAULT_PREFIXES: [&'static str; 5] = ["java/", "javax/", "jdk/", "sun/", "com/sun/"];

    /// Platform with the given internal-form package prefixes (eg. `java/`)
    pub fn new<S: Into<String>>(prefixes: impl IntoIterator<Item = S>) -> Platform {
        Platform {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Platform {
        self.prefixes.push(prefix.to_owned());
        self
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Is this class provided by the platform?
    pub fn provides(&self, class: &BinaryName) -> bool {
        class.has_prefix(self.prefixes.as_slice())
    }
}

impl Default for Platform {
    fn default() -> Platform {
        Platform::new(Platform::DEFAULT_PREFIXES)
    }
}
