//! Deterministic directory backed by process memory.
//!
//! Used by tests and dry runs. Every call is journaled, and any operation can be
//! made to fail with a chosen error. Raw OData filters on cloud desktop queries
//! are journaled but not evaluated.

use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockWriteGuard},
};

use async_trait::async_trait;

use crate::directory::{
    error::{DirectoryError, conflict, invalid_request, not_found},
    ports::DirectoryPort,
    types::{
        AssignedLicense, CloudDesktop, CloudDesktopQuery, DirectoryGroup, DirectoryUser,
        GroupQuery, PolicyAssignment, ProvisioningPolicy, SubscribedSku, UserQuery,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectoryOperation {
    GetUser,
    ListUsers,
    ListGroups,
    GetGroup,
    AddGroupMember,
    ListSubscribedSkus,
    AssignLicense,
    RemoveLicense,
    ListProvisioningPolicies,
    GetProvisioningPolicy,
    ListPolicyAssignments,
    ListCloudDesktops,
    GetCloudDesktop,
    RebootCloudDesktop,
    EndGracePeriod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCall {
    pub operation: DirectoryOperation,
    pub args: Vec<String>,
}

#[derive(Default)]
struct DirectoryState {
    users: Vec<DirectoryUser>,
    groups: Vec<DirectoryGroup>,
    members: BTreeMap<String, Vec<String>>,
    skus: Vec<SubscribedSku>,
    policies: Vec<ProvisioningPolicy>,
    assignments: BTreeMap<String, Vec<PolicyAssignment>>,
    desktops: Vec<CloudDesktop>,
    failures: BTreeMap<DirectoryOperation, DirectoryError>,
    calls: Vec<DirectoryCall>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: DirectoryUser) -> Self {
        self.state_mut().users.push(user);
        self
    }

    pub fn with_group(mut self, group: DirectoryGroup) -> Self {
        self.state_mut().groups.push(group);
        self
    }

    pub fn with_member(mut self, group_id: &str, user_id: &str) -> Self {
        self.state_mut()
            .members
            .entry(group_id.to_string())
            .or_default()
            .push(user_id.to_string());
        self
    }

    pub fn with_sku(mut self, sku: SubscribedSku) -> Self {
        self.state_mut().skus.push(sku);
        self
    }

    /// Adds a policy together with its assignments, replacing any inline `assignments`.
    pub fn with_policy(
        mut self,
        mut policy: ProvisioningPolicy,
        assignments: Vec<PolicyAssignment>,
    ) -> Self {
        policy.assignments = None;
        let state = self.state_mut();
        state.assignments.insert(policy.id.clone(), assignments);
        state.policies.push(policy);
        self
    }

    pub fn with_cloud_desktop(mut self, desktop: CloudDesktop) -> Self {
        self.state_mut().desktops.push(desktop);
        self
    }

    pub fn fail_on(&self, operation: DirectoryOperation, error: DirectoryError) {
        self.state
            .write()
            .expect("lock poisoned")
            .failures
            .insert(operation, error);
    }

    pub fn clear_failure(&self, operation: DirectoryOperation) {
        self.state
            .write()
            .expect("lock poisoned")
            .failures
            .remove(&operation);
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state.read().expect("lock poisoned").calls.clone()
    }

    pub fn calls_to(&self, operation: DirectoryOperation) -> usize {
        self.state
            .read()
            .expect("lock poisoned")
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    pub fn group_members(&self, group_id: &str) -> Vec<String> {
        self.state
            .read()
            .expect("lock poisoned")
            .members
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user(&self, user_id: &str) -> Option<DirectoryUser> {
        self.state
            .read()
            .expect("lock poisoned")
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
    }

    pub fn sku(&self, sku_id: &str) -> Option<SubscribedSku> {
        self.state
            .read()
            .expect("lock poisoned")
            .skus
            .iter()
            .find(|sku| sku.sku_id == sku_id)
            .cloned()
    }

    fn state_mut(&mut self) -> &mut DirectoryState {
        self.state.get_mut().expect("lock poisoned")
    }

    fn enter(
        &self,
        operation: DirectoryOperation,
        args: &[&str],
    ) -> Result<RwLockWriteGuard<'_, DirectoryState>, DirectoryError> {
        let mut guard = self.state.write().expect("lock poisoned");
        guard.calls.push(DirectoryCall {
            operation,
            args: args.iter().map(|arg| arg.to_string()).collect(),
        });
        if let Some(err) = guard.failures.get(&operation) {
            return Err(err.clone());
        }
        Ok(guard)
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn user_not_found(user_id: &str) -> DirectoryError {
    not_found(format!("Resource '{user_id}' does not exist"))
}

#[async_trait]
impl DirectoryPort for InMemoryDirectory {
    async fn get_user(&self, user_id: &str) -> Result<DirectoryUser, DirectoryError> {
        let state = self.enter(DirectoryOperation::GetUser, &[user_id])?;
        state
            .users
            .iter()
            .find(|user| user.id == user_id || user.user_principal_name.as_deref() == Some(user_id))
            .cloned()
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let search = query.search.clone().unwrap_or_default();
        let state = self.enter(DirectoryOperation::ListUsers, &[&search])?;
        Ok(state
            .users
            .iter()
            .filter(|user| {
                search.is_empty()
                    || contains_ignore_case(user.display_name.as_deref(), &search)
                    || contains_ignore_case(user.user_principal_name.as_deref(), &search)
            })
            .take(query.top as usize)
            .cloned()
            .collect())
    }

    /// Markers and search terms match as case-insensitive substrings anywhere in
    /// the display name. Graph `$search` only matches token prefixes, so a name
    /// like "ContosoCloudPC" is found here but not by `GraphDirectory`.
    async fn list_groups(
        &self,
        query: &GroupQuery,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let search = query.search.clone().unwrap_or_default();
        let markers = query.display_name_contains.join(",");
        let state = self.enter(DirectoryOperation::ListGroups, &[&search, &markers])?;
        Ok(state
            .groups
            .iter()
            .filter(|group| {
                let name = group.display_name.as_deref();
                if !search.is_empty() {
                    return contains_ignore_case(name, &search);
                }
                query.display_name_contains.is_empty()
                    || query
                        .display_name_contains
                        .iter()
                        .any(|marker| contains_ignore_case(name, marker))
            })
            .take(query.top as usize)
            .cloned()
            .collect())
    }

    async fn get_group(&self, group_id: &str) -> Result<DirectoryGroup, DirectoryError> {
        let state = self.enter(DirectoryOperation::GetGroup, &[group_id])?;
        state
            .groups
            .iter()
            .find(|group| group.id == group_id)
            .cloned()
            .ok_or_else(|| not_found(format!("Resource '{group_id}' does not exist")))
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        let mut state = self.enter(DirectoryOperation::AddGroupMember, &[group_id, user_id])?;
        if !state.groups.iter().any(|group| group.id == group_id) {
            return Err(not_found(format!("Resource '{group_id}' does not exist")));
        }
        if !state.users.iter().any(|user| user.id == user_id) {
            return Err(user_not_found(user_id));
        }

        let members = state.members.entry(group_id.to_string()).or_default();
        if members.iter().any(|member| member == user_id) {
            return Err(conflict(
                "One or more added object references already exist for the following modified properties: 'members'.",
            ));
        }
        members.push(user_id.to_string());
        Ok(())
    }

    async fn list_subscribed_skus(&self) -> Result<Vec<SubscribedSku>, DirectoryError> {
        let state = self.enter(DirectoryOperation::ListSubscribedSkus, &[])?;
        Ok(state.skus.clone())
    }

    async fn assign_license(&self, user_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        let mut state = self.enter(DirectoryOperation::AssignLicense, &[user_id, sku_id])?;
        let state = &mut *state;
        let Some(sku) = state.skus.iter_mut().find(|sku| sku.sku_id == sku_id) else {
            return Err(invalid_request(format!(
                "License {sku_id} does not correspond to a valid company License."
            )));
        };
        let Some(user) = state.users.iter_mut().find(|user| user.id == user_id) else {
            return Err(user_not_found(user_id));
        };

        if user
            .assigned_licenses
            .iter()
            .any(|license| license.sku_id == sku_id)
        {
            return Ok(());
        }
        user.assigned_licenses.push(AssignedLicense {
            sku_id: sku_id.to_string(),
            disabled_plans: Vec::new(),
        });
        sku.consumed_units += 1;
        Ok(())
    }

    async fn remove_license(&self, user_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        let mut state = self.enter(DirectoryOperation::RemoveLicense, &[user_id, sku_id])?;
        let state = &mut *state;
        let Some(user) = state.users.iter_mut().find(|user| user.id == user_id) else {
            return Err(user_not_found(user_id));
        };

        let before = user.assigned_licenses.len();
        user.assigned_licenses
            .retain(|license| license.sku_id != sku_id);
        if user.assigned_licenses.len() == before {
            return Err(invalid_request(format!(
                "User does not have a corresponding license {sku_id}."
            )));
        }
        if let Some(sku) = state.skus.iter_mut().find(|sku| sku.sku_id == sku_id) {
            sku.consumed_units -= 1;
        }
        Ok(())
    }

    async fn list_provisioning_policies(&self) -> Result<Vec<ProvisioningPolicy>, DirectoryError> {
        let state = self.enter(DirectoryOperation::ListProvisioningPolicies, &[])?;
        Ok(state.policies.clone())
    }

    async fn get_provisioning_policy(
        &self,
        policy_id: &str,
        expand_assignments: bool,
    ) -> Result<ProvisioningPolicy, DirectoryError> {
        let state = self.enter(DirectoryOperation::GetProvisioningPolicy, &[policy_id])?;
        let mut policy = state
            .policies
            .iter()
            .find(|policy| policy.id == policy_id)
            .cloned()
            .ok_or_else(|| not_found(format!("Resource '{policy_id}' does not exist")))?;
        if expand_assignments {
            policy.assignments = Some(
                state
                    .assignments
                    .get(policy_id)
                    .cloned()
                    .unwrap_or_default(),
            );
        }
        Ok(policy)
    }

    async fn list_policy_assignments(
        &self,
        policy_id: &str,
    ) -> Result<Vec<PolicyAssignment>, DirectoryError> {
        let state = self.enter(DirectoryOperation::ListPolicyAssignments, &[policy_id])?;
        state
            .assignments
            .get(policy_id)
            .cloned()
            .ok_or_else(|| not_found(format!("Resource '{policy_id}' does not exist")))
    }

    async fn list_cloud_desktops(
        &self,
        query: &CloudDesktopQuery,
    ) -> Result<Vec<CloudDesktop>, DirectoryError> {
        let filter = query.filter.clone().unwrap_or_default();
        let upn = query.user_principal_name.clone().unwrap_or_default();
        let state = self.enter(DirectoryOperation::ListCloudDesktops, &[&filter, &upn])?;
        Ok(state
            .desktops
            .iter()
            .filter(|desktop| {
                upn.is_empty()
                    || desktop
                        .user_principal_name
                        .as_deref()
                        .map(|value| value.eq_ignore_ascii_case(&upn))
                        .unwrap_or(false)
            })
            .take(query.top as usize)
            .cloned()
            .collect())
    }

    async fn get_cloud_desktop(
        &self,
        cloud_desktop_id: &str,
    ) -> Result<CloudDesktop, DirectoryError> {
        let state = self.enter(DirectoryOperation::GetCloudDesktop, &[cloud_desktop_id])?;
        state
            .desktops
            .iter()
            .find(|desktop| desktop.id == cloud_desktop_id)
            .cloned()
            .ok_or_else(|| not_found(format!("Resource '{cloud_desktop_id}' does not exist")))
    }

    async fn reboot_cloud_desktop(&self, cloud_desktop_id: &str) -> Result<(), DirectoryError> {
        let state = self.enter(DirectoryOperation::RebootCloudDesktop, &[cloud_desktop_id])?;
        if state.desktops.iter().any(|desktop| desktop.id == cloud_desktop_id) {
            Ok(())
        } else {
            Err(not_found(format!("Resource '{cloud_desktop_id}' does not exist")))
        }
    }

    async fn end_grace_period(&self, cloud_desktop_id: &str) -> Result<(), DirectoryError> {
        let state = self.enter(DirectoryOperation::EndGracePeriod, &[cloud_desktop_id])?;
        if state.desktops.iter().any(|desktop| desktop.id == cloud_desktop_id) {
            Ok(())
        } else {
            Err(not_found(format!("Resource '{cloud_desktop_id}' does not exist")))
        }
    }
}
