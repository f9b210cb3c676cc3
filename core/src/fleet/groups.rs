use std::{collections::BTreeMap, sync::Arc};

use futures_util::future::join_all;

use crate::{
    config::{MembershipConflictPolicy, ProvisioningConfig},
    directory::{
        DirectoryErrorKind, DirectoryGroup, DirectoryPort, DirectoryUser, GroupQuery, UserQuery,
    },
    fleet::error::FleetError,
};

/// How a membership request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    Added,
    AlreadyMember,
}

pub struct GroupMembershipManager {
    directory: Arc<dyn DirectoryPort>,
    markers: Vec<String>,
    lookup_limit: u32,
    conflict_policy: MembershipConflictPolicy,
}

impl GroupMembershipManager {
    pub fn new(directory: Arc<dyn DirectoryPort>, config: &ProvisioningConfig) -> Self {
        Self {
            directory,
            markers: config.default_group_markers.clone(),
            lookup_limit: config.default_group_lookup_limit.max(1),
            conflict_policy: config.membership_conflict,
        }
    }

    /// First group, in directory listing order, whose name carries a marker.
    ///
    /// How a marker matches is up to the directory: Graph `$search` matches
    /// token prefixes while `InMemoryDirectory` matches any substring.
    ///
    /// Lookup failures are logged and reported as no group.
    pub async fn resolve_default_group(&self) -> Option<String> {
        let query = GroupQuery {
            search: None,
            display_name_contains: self.markers.clone(),
            top: self.lookup_limit,
        };

        match self.directory.list_groups(&query).await {
            Ok(groups) => groups.into_iter().next().map(|group| group.id),
            Err(err) => {
                tracing::warn!(
                    target: "groups",
                    markers = ?self.markers,
                    error = %err,
                    "default_group_lookup_failed"
                );
                None
            }
        }
    }

    pub async fn add_user_to_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> Result<MembershipOutcome, FleetError> {
        match self.directory.add_group_member(group_id, user_id).await {
            Ok(()) => {
                tracing::info!(
                    target: "groups",
                    user_id = user_id,
                    group_id = group_id,
                    "group_member_added"
                );
                Ok(MembershipOutcome::Added)
            }
            Err(err)
                if err.kind == DirectoryErrorKind::Conflict
                    && self.conflict_policy == MembershipConflictPolicy::TreatAsMember =>
            {
                tracing::info!(
                    target: "groups",
                    user_id = user_id,
                    group_id = group_id,
                    "group_member_already_present"
                );
                Ok(MembershipOutcome::AlreadyMember)
            }
            Err(err) => {
                tracing::warn!(
                    target: "groups",
                    user_id = user_id,
                    group_id = group_id,
                    error = %err,
                    "group_member_add_failed"
                );
                Err(err.into())
            }
        }
    }

    /// Display names for `group_ids`, looked up concurrently.
    ///
    /// Groups that cannot be read map to `Unknown Group (<id>)`.
    pub async fn resolve_group_names(&self, group_ids: &[String]) -> BTreeMap<String, String> {
        let lookups = group_ids.iter().map(|group_id| async move {
            let name = match self.directory.get_group(group_id).await {
                Ok(group) => group
                    .display_name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| unknown_group(group_id)),
                Err(err) => {
                    tracing::debug!(
                        target: "groups",
                        group_id = %group_id,
                        error = %err,
                        "group_name_lookup_failed"
                    );
                    unknown_group(group_id)
                }
            };
            (group_id.clone(), name)
        });

        join_all(lookups).await.into_iter().collect()
    }

    pub async fn search_users(
        &self,
        search: Option<&str>,
        top: u32,
    ) -> Result<Vec<DirectoryUser>, FleetError> {
        let query = UserQuery {
            search: search.map(str::to_string),
            top,
        };
        Ok(self.directory.list_users(&query).await?)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<DirectoryUser, FleetError> {
        Ok(self.directory.get_user(user_id).await?)
    }

    pub async fn search_groups(
        &self,
        search: Option<&str>,
        top: u32,
    ) -> Result<Vec<DirectoryGroup>, FleetError> {
        let query = GroupQuery {
            search: search.map(str::to_string),
            display_name_contains: Vec::new(),
            top,
        };
        Ok(self.directory.list_groups(&query).await?)
    }
}

fn unknown_group(group_id: &str) -> String {
    format!("Unknown Group ({group_id})")
}
