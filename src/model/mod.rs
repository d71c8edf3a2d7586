pub mod academic;
pub mod backup;
pub mod common;
pub mod institute;
pub mod question;
pub mod settings;
pub mod user;
pub mod user_context;

pub use academic::*;
pub use backup::*;
pub use common::*;
pub use institute::*;
pub use question::*;
pub use settings::*;
pub use user::*;
pub use user_context::*;
