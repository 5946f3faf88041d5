//! Pass/fail declarations over library version ranges, and their evaluation
//!
//! A [`Declaration`] claims that the instrumentation modules either link (`pass`) or don't link
//! (`fail`) against every version of a library within a range. The [`AssertionEngine`] asks an
//! [`ArtifactResolver`] for the candidate versions, drops the draft and skipped ones, and checks
//! each remaining version in isolation. With `assert_inverse`, versions outside of the range of
//! a `pass` declaration are checked too, and are expected *not* to link.

mod declaration;
mod engine;
mod report;
mod resolver;

pub use declaration::*;
pub use engine::*;
pub use report::*;
pub use resolver::*;
