use async_trait::async_trait;

use crate::directory::{
    error::DirectoryError,
    types::{
        CloudDesktop, CloudDesktopQuery, DirectoryGroup, DirectoryUser, GroupQuery,
        PolicyAssignment, ProvisioningPolicy, SubscribedSku, UserQuery,
    },
};

/// Remote directory and device management capability.
///
/// Every call is a single remote round trip. Implementations never retry.
#[async_trait]
pub trait DirectoryPort: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<DirectoryUser, DirectoryError>;

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<DirectoryUser>, DirectoryError>;

    async fn list_groups(&self, query: &GroupQuery)
    -> Result<Vec<DirectoryGroup>, DirectoryError>;

    async fn get_group(&self, group_id: &str) -> Result<DirectoryGroup, DirectoryError>;

    /// Creates a membership reference. Existing memberships surface as `Conflict`.
    async fn add_group_member(&self, group_id: &str, user_id: &str)
    -> Result<(), DirectoryError>;

    async fn list_subscribed_skus(&self) -> Result<Vec<SubscribedSku>, DirectoryError>;

    async fn assign_license(&self, user_id: &str, sku_id: &str) -> Result<(), DirectoryError>;

    async fn remove_license(&self, user_id: &str, sku_id: &str) -> Result<(), DirectoryError>;

    async fn list_provisioning_policies(&self) -> Result<Vec<ProvisioningPolicy>, DirectoryError>;

    async fn get_provisioning_policy(
        &self,
        policy_id: &str,
        expand_assignments: bool,
    ) -> Result<ProvisioningPolicy, DirectoryError>;

    async fn list_policy_assignments(
        &self,
        policy_id: &str,
    ) -> Result<Vec<PolicyAssignment>, DirectoryError>;

    async fn list_cloud_desktops(
        &self,
        query: &CloudDesktopQuery,
    ) -> Result<Vec<CloudDesktop>, DirectoryError>;

    async fn get_cloud_desktop(&self, cloud_desktop_id: &str)
    -> Result<CloudDesktop, DirectoryError>;

    async fn reboot_cloud_desktop(&self, cloud_desktop_id: &str) -> Result<(), DirectoryError>;

    async fn end_grace_period(&self, cloud_desktop_id: &str) -> Result<(), DirectoryError>;
}
