use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::directory::{CloudDesktop, SubscribedSku};

pub const ESTIMATED_COMPLETION_TIME: &str = "30-60 minutes";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlan {
    pub service_plan_id: String,
    pub service_plan_name: String,
    pub provisioning_status: String,
    pub applies_to: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PrepaidUnits {
    pub enabled: i64,
    pub suspended: i64,
    pub warning: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub sku_id: String,
    pub sku_part_number: String,
    pub service_plans: Vec<ServicePlan>,
    pub capability_status: String,
    pub consumed_units: i64,
    pub prepaid_units: PrepaidUnits,
}

impl LicenseInfo {
    /// Enabled minus consumed. Over-consumed SKUs go negative.
    pub fn available(&self) -> i64 {
        self.prepaid_units.enabled - self.consumed_units
    }
}

impl From<&SubscribedSku> for LicenseInfo {
    fn from(sku: &SubscribedSku) -> Self {
        Self {
            sku_id: sku.sku_id.clone(),
            sku_part_number: sku.sku_part_number.clone(),
            service_plans: sku
                .service_plans
                .iter()
                .map(|plan| ServicePlan {
                    service_plan_id: plan.service_plan_id.clone(),
                    service_plan_name: plan.service_plan_name.clone(),
                    provisioning_status: plan.provisioning_status.clone(),
                    applies_to: plan.applies_to.clone(),
                })
                .collect(),
            capability_status: sku.capability_status.clone(),
            consumed_units: sku.consumed_units,
            prepaid_units: PrepaidUnits {
                enabled: sku.prepaid_units.enabled,
                suspended: sku.prepaid_units.suspended,
                warning: sku.prepaid_units.warning,
            },
        }
    }
}

/// A catalog entry together with its derived availability, as shown to callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseAvailability {
    #[serde(flatten)]
    pub license: LicenseInfo,
    pub available_units: i64,
}

impl From<LicenseInfo> for LicenseAvailability {
    fn from(license: LicenseInfo) -> Self {
        let available_units = license.available();
        Self {
            license,
            available_units,
        }
    }
}

/// Outcome of a successful assign or unassign call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseChange {
    pub user_id: String,
    pub sku_id: String,
    pub sku_part_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StageName {
    #[serde(rename = "License Assignment")]
    LicenseAssignment,
    #[serde(rename = "Group Membership")]
    GroupMembership,
    #[serde(rename = "Policy Verification")]
    PolicyVerification,
    #[serde(rename = "Auto-Provisioning Initiated")]
    AutoProvisioningInitiated,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LicenseAssignment => "License Assignment",
            Self::GroupMembership => "Group Membership",
            Self::PolicyVerification => "Policy Verification",
            Self::AutoProvisioningInitiated => "Auto-Provisioning Initiated",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningStep {
    pub step_name: StageName,
    pub status: StepStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl ProvisioningStep {
    pub fn pending(step_name: StageName) -> Self {
        Self {
            step_name,
            status: StepStatus::Pending,
            message: String::new(),
            error: None,
            started_at: OffsetDateTime::now_utc(),
            completed_at: None,
        }
    }

    pub fn begin(&mut self, message: impl Into<String>) {
        self.status = StepStatus::InProgress;
        self.message = message.into();
        self.started_at = OffsetDateTime::now_utc();
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.status = StepStatus::Completed;
        self.message = message.into();
        self.completed_at = Some(OffsetDateTime::now_utc());
    }

    pub fn fail(&mut self, message: impl Into<String>, error: Option<String>) {
        self.status = StepStatus::Failed;
        self.message = message.into();
        self.error = error;
        self.completed_at = Some(OffsetDateTime::now_utc());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningResult {
    pub user_id: String,
    pub success: bool,
    pub message: String,
    pub steps: Vec<ProvisioningStep>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub license_assigned: bool,
    pub group_membership_added: bool,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub estimated_completion_time: Option<String>,
}

impl ProvisioningResult {
    pub fn failed_step(&self) -> Option<&ProvisioningStep> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub total_count: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudDesktopStatus {
    pub id: String,
    pub display_name: Option<String>,
    pub status: Option<String>,
    pub provisioning_type: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified_date_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub grace_period_end_date_time: Option<OffsetDateTime>,
}

impl From<&CloudDesktop> for CloudDesktopStatus {
    fn from(desktop: &CloudDesktop) -> Self {
        Self {
            id: desktop.id.clone(),
            display_name: desktop.display_name.clone(),
            status: desktop.status.clone(),
            provisioning_type: desktop.provisioning_type.clone(),
            last_modified_date_time: desktop.last_modified_date_time,
            grace_period_end_date_time: desktop.grace_period_end_date_time,
        }
    }
}
