pub mod auth;
pub mod backup;
pub mod institutes;
pub mod questions;
pub mod sessions;
pub mod settings;
pub mod users;

pub use auth::*;
pub use backup::*;
pub use institutes::*;
pub use questions::*;
pub use sessions::*;
pub use settings::*;
pub use users::*;
