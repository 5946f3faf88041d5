//! Version strings: ordering, ranges, and telling releases apart from everything else

mod comparable;
mod filter;
mod range;

pub use comparable::*;
pub use filter::*;
pub use range::*;
