use async_trait::async_trait;
use crate::error::BackendError;
use super::{
    permission::Permission,
    privilege::ResourceClass,
    role::{Role, RoleAssignment},
    user::User,
};

#[async_trait]
pub trait UserBackend {
    async fn add_user(
        &self,
        name: &str,
        firm_id: Option<i64>,
    ) -> Result<i64, BackendError>;
    async fn get_user_by_id(
        &self,
        id: i64,
    ) -> Result<Option<User>, BackendError>;
    async fn get_user_by_name(
        &self,
        name: &str,
    ) -> Result<Option<User>, BackendError>;
}

#[async_trait]
pub trait RoleBackend {
    async fn add_role(
        &self,
        name: &str,
        parent_role_id: Option<i64>,
        owner_firm_id: Option<i64>,
    ) -> Result<i64, BackendError>;
    async fn get_role_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Role>, BackendError>;
    async fn set_role_parent(
        &self,
        id: i64,
        parent_role_id: Option<i64>,
    ) -> Result<bool, BackendError>;
    /// The complete role forest.
    async fn list_roles(
        &self,
    ) -> Result<Vec<Role>, BackendError>;
}

#[async_trait]
pub trait RoleAssignmentBackend {
    async fn add_role_assignment(
        &self,
        user_id: i64,
        role_id: i64,
        invalid_after: Option<i64>,
    ) -> Result<i64, BackendError>;
    async fn get_role_assignment(
        &self,
        id: i64,
    ) -> Result<Option<RoleAssignment>, BackendError>;
    async fn set_role_assignment_invalid_after(
        &self,
        id: i64,
        invalid_after: Option<i64>,
    ) -> Result<bool, BackendError>;
    async fn remove_role_assignment(
        &self,
        id: i64,
    ) -> Result<bool, BackendError>;
    /// Every assignment of the user, lapsed ones included.
    async fn list_role_assignments_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<RoleAssignment>, BackendError>;
    /// Every assignment to any of the roles, lapsed ones included.
    async fn list_role_assignments_for_roles(
        &self,
        role_ids: &[i64],
    ) -> Result<Vec<RoleAssignment>, BackendError>;
}

#[async_trait]
pub trait PermissionBackend {
    async fn add_permission(
        &self,
        permission: &Permission,
    ) -> Result<i64, BackendError>;
    async fn get_permission(
        &self,
        id: i64,
    ) -> Result<Option<Permission>, BackendError>;
    async fn update_permission(
        &self,
        permission: &Permission,
    ) -> Result<bool, BackendError>;
    async fn remove_permission(
        &self,
        id: i64,
    ) -> Result<bool, BackendError>;
    async fn list_permissions_for_roles(
        &self,
        role_ids: &[i64],
    ) -> Result<Vec<Permission>, BackendError>;
    /// Permissions whose class is `class_name` or the wildcard.
    async fn list_permissions_for_class(
        &self,
        class_name: &ResourceClass,
    ) -> Result<Vec<Permission>, BackendError>;
}
