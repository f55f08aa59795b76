pub mod alert;
pub mod insight;

pub use alert::*;
pub use insight::*;
