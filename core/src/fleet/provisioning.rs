//! Cloud desktop provisioning workflow.
//!
//! The workflow is an ordered list of stages over a shared [`ProvisioningContext`].
//! Every stage yields one step in the result. The first failing stage ends the run;
//! nothing is rolled back, so a failure in group membership leaves any license that
//! was assigned earlier in place.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::fleet::{
    error::{FleetError, no_default_group_found, not_found},
    groups::{GroupMembershipManager, MembershipOutcome},
    license::LicenseAssigner,
    policy::PolicyResolver,
    types::{
        ESTIMATED_COMPLETION_TIME, ProvisioningResult, ProvisioningStep, StageName, StepStatus,
    },
};

pub const SUCCESS_MESSAGE: &str =
    "Provisioning initiated successfully. Cloud PC will be available in 30-60 minutes.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub user_id: String,
    pub group_id: Option<String>,
    pub sku_id: Option<String>,
}

impl ProvisioningRequest {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: None,
            sku_id: None,
        }
    }
}

/// State shared by the stages of one run.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningContext {
    pub user_id: String,
    pub requested_group_id: Option<String>,
    pub requested_sku_id: Option<String>,
    pub license_assigned: bool,
    pub group_membership_added: bool,
    pub group_id: Option<String>,
    pub policy_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StageOutcome {
    Completed {
        message: String,
    },
    Failed {
        step_message: String,
        result_message: String,
        error: FleetError,
    },
}

impl StageOutcome {
    fn completed(message: impl Into<String>) -> Self {
        Self::Completed {
            message: message.into(),
        }
    }

    /// A failure from an unexpected directory error.
    fn unexpected(step_message: impl Into<String>, error: FleetError) -> Self {
        Self::Failed {
            step_message: step_message.into(),
            result_message: format!("Error during provisioning: {}", error.message),
            error,
        }
    }
}

#[async_trait]
pub trait ProvisioningStage: Send + Sync {
    fn name(&self) -> StageName;

    fn start_message(&self) -> &'static str;

    async fn run(&self, context: &mut ProvisioningContext) -> StageOutcome;
}

pub struct LicenseAssignmentStage {
    licenses: Arc<LicenseAssigner>,
}

impl LicenseAssignmentStage {
    pub fn new(licenses: Arc<LicenseAssigner>) -> Self {
        Self { licenses }
    }
}

#[async_trait]
impl ProvisioningStage for LicenseAssignmentStage {
    fn name(&self) -> StageName {
        StageName::LicenseAssignment
    }

    fn start_message(&self) -> &'static str {
        "Checking existing licenses"
    }

    async fn run(&self, context: &mut ProvisioningContext) -> StageOutcome {
        let licensed = match self.licenses.has_product_license(&context.user_id).await {
            Ok(licensed) => licensed,
            Err(err) => return StageOutcome::unexpected("Failed to verify existing licenses", err),
        };
        if licensed {
            return StageOutcome::completed("License already assigned");
        }

        match self
            .licenses
            .assign_license(&context.user_id, context.requested_sku_id.as_deref())
            .await
        {
            Ok(_) => {
                context.license_assigned = true;
                StageOutcome::completed("License assigned successfully")
            }
            Err(err) => StageOutcome::Failed {
                step_message: "License assignment failed".to_string(),
                result_message: format!("Failed to assign Windows 365 license: {}", err.message),
                error: err,
            },
        }
    }
}

pub struct GroupMembershipStage {
    groups: Arc<GroupMembershipManager>,
}

impl GroupMembershipStage {
    pub fn new(groups: Arc<GroupMembershipManager>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl ProvisioningStage for GroupMembershipStage {
    fn name(&self) -> StageName {
        StageName::GroupMembership
    }

    fn start_message(&self) -> &'static str {
        "Resolving provisioning group"
    }

    async fn run(&self, context: &mut ProvisioningContext) -> StageOutcome {
        let requested = context
            .requested_group_id
            .clone()
            .filter(|group_id| !group_id.trim().is_empty());
        let group_id = match requested {
            Some(group_id) => Some(group_id),
            None => self.groups.resolve_default_group().await,
        };
        let Some(group_id) = group_id else {
            return StageOutcome::Failed {
                step_message: "No provisioning group available".to_string(),
                result_message: "Failed to find provisioning group".to_string(),
                error: no_default_group_found(
                    "No provisioning group ID provided and no default group found",
                ),
            };
        };

        match self
            .groups
            .add_user_to_group(&context.user_id, &group_id)
            .await
        {
            Ok(outcome) => {
                context.group_membership_added = true;
                context.group_id = Some(group_id);
                StageOutcome::completed(match outcome {
                    MembershipOutcome::Added => "Added to provisioning group successfully",
                    MembershipOutcome::AlreadyMember => {
                        "User is already a member of the provisioning group"
                    }
                })
            }
            Err(err) => StageOutcome::unexpected("Failed to add user to provisioning group", err),
        }
    }
}

pub struct PolicyVerificationStage {
    policies: Arc<PolicyResolver>,
}

impl PolicyVerificationStage {
    pub fn new(policies: Arc<PolicyResolver>) -> Self {
        Self { policies }
    }
}

#[async_trait]
impl ProvisioningStage for PolicyVerificationStage {
    fn name(&self) -> StageName {
        StageName::PolicyVerification
    }

    fn start_message(&self) -> &'static str {
        "Looking up provisioning policy for group"
    }

    async fn run(&self, context: &mut ProvisioningContext) -> StageOutcome {
        let Some(group_id) = context.group_id.clone() else {
            return StageOutcome::Failed {
                step_message: "No provisioning group resolved".to_string(),
                result_message: "Failed to find provisioning group".to_string(),
                error: no_default_group_found("No provisioning group resolved before policy verification"),
            };
        };

        match self.policies.find_policy_for_group(&group_id).await {
            Ok(Some(policy)) => {
                context.policy_id = Some(policy.id);
                StageOutcome::completed("Provisioning policy verified")
            }
            Ok(None) => {
                let message = format!("No provisioning policy found for group {group_id}");
                StageOutcome::Failed {
                    step_message: "No matching provisioning policy".to_string(),
                    result_message: message.clone(),
                    error: not_found(message),
                }
            }
            Err(err) => StageOutcome::unexpected("Failed to verify provisioning policy", err),
        }
    }
}

/// Marks the hand-off to the service's own asynchronous provisioning.
pub struct AutoProvisioningStage;

#[async_trait]
impl ProvisioningStage for AutoProvisioningStage {
    fn name(&self) -> StageName {
        StageName::AutoProvisioningInitiated
    }

    fn start_message(&self) -> &'static str {
        "Handing off to automatic provisioning"
    }

    async fn run(&self, _context: &mut ProvisioningContext) -> StageOutcome {
        StageOutcome::completed("Cloud PC auto-provisioning has been initiated")
    }
}

pub struct ProvisioningOrchestrator {
    stages: Vec<Box<dyn ProvisioningStage>>,
}

impl ProvisioningOrchestrator {
    pub fn new(stages: Vec<Box<dyn ProvisioningStage>>) -> Self {
        Self { stages }
    }

    /// License, group membership, policy verification, then hand-off.
    pub fn standard(
        licenses: Arc<LicenseAssigner>,
        groups: Arc<GroupMembershipManager>,
        policies: Arc<PolicyResolver>,
    ) -> Self {
        Self::new(vec![
            Box::new(LicenseAssignmentStage::new(licenses)),
            Box::new(GroupMembershipStage::new(groups)),
            Box::new(PolicyVerificationStage::new(policies)),
            Box::new(AutoProvisioningStage),
        ])
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    #[tracing::instrument(
        name = "provision_for_user",
        target = "provisioning",
        skip(self, request),
        fields(user_id = %request.user_id)
    )]
    pub async fn provision(&self, request: ProvisioningRequest) -> ProvisioningResult {
        let mut context = ProvisioningContext {
            user_id: request.user_id,
            requested_group_id: request.group_id,
            requested_sku_id: request.sku_id,
            ..ProvisioningContext::default()
        };
        let mut steps = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let mut step = ProvisioningStep::pending(stage.name());
            step.begin(stage.start_message());
            tracing::debug!(target: "provisioning", stage = %stage.name(), "stage_started");

            match stage.run(&mut context).await {
                StageOutcome::Completed { message } => {
                    step.complete(message);
                    steps.push(step);
                    tracing::info!(target: "provisioning", stage = %stage.name(), "stage_completed");
                }
                StageOutcome::Failed {
                    step_message,
                    result_message,
                    error,
                } => {
                    tracing::warn!(
                        target: "provisioning",
                        stage = %stage.name(),
                        kind = error.kind.as_str(),
                        error = %error,
                        "stage_failed"
                    );
                    step.fail(step_message, Some(error.message));
                    steps.push(step);
                    return build_result(context, steps, false, result_message);
                }
            }
        }

        debug_assert!(steps.iter().all(|step| step.status == StepStatus::Completed));
        build_result(context, steps, true, SUCCESS_MESSAGE.to_string())
    }
}

fn build_result(
    context: ProvisioningContext,
    steps: Vec<ProvisioningStep>,
    success: bool,
    message: String,
) -> ProvisioningResult {
    ProvisioningResult {
        user_id: context.user_id,
        success,
        message,
        steps,
        timestamp: OffsetDateTime::now_utc(),
        license_assigned: context.license_assigned,
        group_membership_added: context.group_membership_added,
        group_id: context.group_id,
        policy_id: context.policy_id,
        estimated_completion_time: success.then(|| ESTIMATED_COMPLETION_TIME.to_string()),
    }
}
