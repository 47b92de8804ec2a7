pub mod certificate;
pub mod certificate_id;

pub use certificate::*;
pub use certificate_id::*;
