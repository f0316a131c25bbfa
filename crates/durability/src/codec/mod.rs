//! Range codec abstraction
//!
//! Token ranges are the one element of a dependency graph whose layout the
//! host system chooses. `TokenRangeCodec` is the self-describing default;
//! `SimpleRangeCodec` is a compact codec for single-table harnesses.

mod simple;
mod token_range;
mod traits;

pub use simple::SimpleRangeCodec;
pub use token_range::TokenRangeCodec;
pub use traits::RangeCodec;
