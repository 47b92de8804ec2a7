//! Input parameters for the various functions within certwatch.

mod certificate;
pub use certificate::*;

mod duration;
pub use duration::*;
