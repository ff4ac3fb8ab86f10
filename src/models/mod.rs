pub mod user;
pub mod workspace;
pub mod workspace_member;

pub use user::*;
pub use workspace::*;
pub use workspace_member::*;
