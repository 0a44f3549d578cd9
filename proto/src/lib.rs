pub mod continuation;
pub mod entry;
pub mod error;
pub mod position;
pub mod range;
pub mod tuple;

pub use continuation::*;
pub use entry::*;
pub use error::*;
pub use position::*;
pub use range::*;
pub use tuple::*;
