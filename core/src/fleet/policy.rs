use std::sync::Arc;

use crate::{
    directory::{DirectoryPort, ProvisioningPolicy},
    fleet::error::FleetError,
};

pub struct PolicyResolver {
    directory: Arc<dyn DirectoryPort>,
}

impl PolicyResolver {
    pub fn new(directory: Arc<dyn DirectoryPort>) -> Self {
        Self { directory }
    }

    /// First policy, in listing order, with a group assignment for `group_id`.
    ///
    /// Assignments are fetched one policy at a time and the scan stops at the
    /// first match.
    pub async fn find_policy_for_group(
        &self,
        group_id: &str,
    ) -> Result<Option<ProvisioningPolicy>, FleetError> {
        let policies = self.directory.list_provisioning_policies().await.inspect_err(|err| {
            tracing::warn!(target: "policies", group_id = group_id, error = %err, "policy_listing_failed");
        })?;

        for policy in policies {
            let assignments = self
                .directory
                .list_policy_assignments(&policy.id)
                .await
                .inspect_err(|err| {
                    tracing::warn!(
                        target: "policies",
                        group_id = group_id,
                        policy_id = %policy.id,
                        error = %err,
                        "policy_assignments_failed"
                    );
                })?;

            if assignments
                .iter()
                .any(|assignment| assignment.target.targets_group(group_id))
            {
                tracing::debug!(
                    target: "policies",
                    group_id = group_id,
                    policy_id = %policy.id,
                    "policy_matched_group"
                );
                return Ok(Some(policy));
            }
        }

        Ok(None)
    }

    pub async fn list_policies(&self) -> Result<Vec<ProvisioningPolicy>, FleetError> {
        Ok(self.directory.list_provisioning_policies().await?)
    }

    pub async fn get_policy(
        &self,
        policy_id: &str,
        include_assignments: bool,
    ) -> Result<ProvisioningPolicy, FleetError> {
        Ok(self
            .directory
            .get_provisioning_policy(policy_id, include_assignments)
            .await?)
    }
}
