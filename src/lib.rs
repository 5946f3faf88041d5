//! Static verification that instrumentation modules link against the library versions they
//! claim to support
//!
//! An instrumentation module patches classes of some third-party library, so its own bytecode is
//! full of symbolic references into that library: classes it instantiates, methods it calls,
//! fields it reads. Every one of those has to exist (with the right shape and accessibility) in
//! any library version the module gets applied to. The pieces here check that without ever
//! loading or running any code:
//!
//!   - [`reference::ReferenceCollector`] extracts the references a module makes
//!   - [`resolve::ResolutionContext`] is a closed world of classes parsed from one set of
//!     library artifacts
//!   - [`matcher::ReferenceMatcher`] resolves references against such a context
//!   - [`assertion::AssertionEngine`] drives all of the above over every released version of a
//!     library and checks the outcome against a [`assertion::Declaration`]

pub mod assertion;
mod errors;
pub mod jvm;
pub mod matcher;
pub mod reference;
pub mod resolve;
pub mod util;
pub mod version;

pub use errors::*;
