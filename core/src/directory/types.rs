use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const GROUP_ASSIGNMENT_TARGET_TYPE: &str = "#microsoft.graph.cloudPcManagementGroupAssignmentTarget";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedLicense {
    pub sku_id: String,
    #[serde(default)]
    pub disabled_plans: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub assigned_licenses: Vec<AssignedLicense>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryGroup {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_types: Vec<String>,
    #[serde(default)]
    pub mail_enabled: Option<bool>,
    #[serde(default)]
    pub security_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SkuServicePlan {
    pub service_plan_id: String,
    #[serde(default)]
    pub service_plan_name: String,
    #[serde(default)]
    pub provisioning_status: String,
    #[serde(default)]
    pub applies_to: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SkuPrepaidUnits {
    #[serde(default)]
    pub enabled: i64,
    #[serde(default)]
    pub suspended: i64,
    #[serde(default)]
    pub warning: i64,
}

/// Tenant-level license catalog entry as the directory reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedSku {
    pub sku_id: String,
    #[serde(default)]
    pub sku_part_number: String,
    #[serde(default)]
    pub capability_status: String,
    #[serde(default)]
    pub consumed_units: i64,
    #[serde(default)]
    pub prepaid_units: SkuPrepaidUnits,
    #[serde(default)]
    pub service_plans: Vec<SkuServicePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AssignmentTarget {
    #[serde(rename = "@odata.type", default)]
    pub odata_type: String,
    #[serde(rename = "groupId", default)]
    pub group_id: Option<String>,
}

impl AssignmentTarget {
    pub fn group(group_id: impl Into<String>) -> Self {
        Self {
            odata_type: GROUP_ASSIGNMENT_TARGET_TYPE.to_string(),
            group_id: Some(group_id.into()),
        }
    }

    pub fn is_group_target(&self) -> bool {
        self.odata_type
            .to_ascii_lowercase()
            .ends_with("cloudpcmanagementgroupassignmenttarget")
    }

    pub fn targets_group(&self, group_id: &str) -> bool {
        self.is_group_target() && self.group_id.as_deref() == Some(group_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PolicyAssignment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub target: AssignmentTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningPolicy {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provisioning_type: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub image_display_name: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub grace_period_in_hours: Option<i64>,
    #[serde(default)]
    pub local_admin_enabled: Option<bool>,
    #[serde(default)]
    pub enable_single_sign_on: Option<bool>,
    #[serde(default)]
    pub cloud_pc_group_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignments: Option<Vec<PolicyAssignment>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudDesktop {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub image_display_name: Option<String>,
    #[serde(default)]
    pub provisioning_policy_id: Option<String>,
    #[serde(default)]
    pub provisioning_policy_name: Option<String>,
    #[serde(default)]
    pub on_premises_connection_name: Option<String>,
    #[serde(default)]
    pub service_plan_id: Option<String>,
    #[serde(default)]
    pub service_plan_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified_date_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub managed_device_id: Option<String>,
    #[serde(default)]
    pub managed_device_name: Option<String>,
    #[serde(default)]
    pub aad_device_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub grace_period_end_date_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub provisioning_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Free-text user lookup. `search` matches display name or principal name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub top: u32,
}

/// Group lookup. Groups match when their display name contains the free-text
/// `search`, or when no search is given, any of `display_name_contains`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupQuery {
    pub search: Option<String>,
    pub display_name_contains: Vec<String>,
    pub top: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudDesktopQuery {
    /// Raw OData filter, forwarded as is.
    pub filter: Option<String>,
    pub user_principal_name: Option<String>,
    pub top: u32,
}
