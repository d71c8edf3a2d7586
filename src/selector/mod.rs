pub mod cascade;
pub mod level;
pub mod source;

pub use cascade::*;
pub use level::*;
pub use source::*;
