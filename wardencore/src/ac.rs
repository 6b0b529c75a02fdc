pub mod event;
pub mod permission;
pub mod predicate;
pub mod privilege;
pub mod resource;
pub mod role;
pub mod traits;
pub mod user;
pub mod value;

pub use self::permission::Permission;
pub use self::privilege::{Privilege, ResourceClass};
pub use self::resource::{AccessControlled, Record};
pub use self::role::{Role, RoleAssignment};
pub use self::user::User;
pub use self::value::Value;
