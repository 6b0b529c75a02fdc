use crate::ac::traits::{
    PermissionBackend,
    RoleAssignmentBackend,
    RoleBackend,
    UserBackend,
};

pub trait PlatformUrl {
    fn url(&self) -> &str;
}

/// AccessPlatform - persistence of users, roles, role assignments and
/// permissions.
///
/// This trait is applicable to everything that correctly implements the
/// relevant backends that compose this trait.
pub trait AccessPlatform: UserBackend
    + RoleBackend
    + RoleAssignmentBackend
    + PermissionBackend

    + PlatformUrl

    + Send
    + Sync
{
    fn as_dyn(&self) -> &dyn AccessPlatform;
}

pub trait DefaultAccessPlatform: AccessPlatform {}

impl<P: UserBackend
    + RoleBackend
    + RoleAssignmentBackend
    + PermissionBackend

    + PlatformUrl

    + DefaultAccessPlatform

    + Send
    + Sync
> AccessPlatform for P {
    fn as_dyn(&self) -> &(dyn AccessPlatform) {
        self
    }
}

#[derive(Default)]
pub struct ConnectorOption {
    pub create_db: bool,
    pub url: String,
}

impl ConnectorOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_db(mut self, create_db: bool) -> Self {
        self.create_db = create_db;
        self
    }

    pub fn url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

impl<T> From<T> for ConnectorOption
where
    T: ToString
{
    fn from(v: T) -> Self {
        Self::new().url(v.to_string())
    }
}
