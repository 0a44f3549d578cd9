//! Comparison-key driven merging of ordered legs: union and intersection.

mod cursor;
mod key;
mod leg;

pub use cursor::{MergeCursor, SetOperation};
pub use key::{ComparisonKeyFunction, KeyFn};
