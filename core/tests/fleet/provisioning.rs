use std::sync::Arc;

use deskfleet::{
    config::{Config, MembershipConflictPolicy},
    directory::{DirectoryOperation, InMemoryDirectory, error::transport},
    fleet::{StageName, StepStatus, provisioning::SUCCESS_MESSAGE},
};

use crate::support::{
    ADA, BOB, CLOUD_GROUP, CLOUD_POLICY, SKU_E3_FULL, SKU_E8, STAFF_GROUP, fleet_over, fleet_with,
    group, sku, tenant, user,
};

#[tokio::test]
async fn unlicensed_user_runs_every_stage() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(ADA, None, None).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, SUCCESS_MESSAGE);
    assert_eq!(result.estimated_completion_time.as_deref(), Some("30-60 minutes"));
    assert_eq!(
        result
            .steps
            .iter()
            .map(|step| step.step_name)
            .collect::<Vec<_>>(),
        vec![
            StageName::LicenseAssignment,
            StageName::GroupMembership,
            StageName::PolicyVerification,
            StageName::AutoProvisioningInitiated,
        ]
    );
    assert!(result.steps.iter().all(|step| step.status == StepStatus::Completed));
    assert!(result.steps.iter().all(|step| step.completed_at.is_some()));
    assert!(result.license_assigned);
    assert!(result.group_membership_added);
    assert_eq!(result.group_id.as_deref(), Some(CLOUD_GROUP));
    assert_eq!(result.policy_id.as_deref(), Some(CLOUD_POLICY));

    let ada = directory.user(ADA).expect("ada exists");
    assert_eq!(ada.assigned_licenses.len(), 1);
    assert_eq!(ada.assigned_licenses[0].sku_id, SKU_E8);
    assert_eq!(directory.group_members(CLOUD_GROUP), vec![ADA.to_string()]);
    assert_eq!(directory.sku(SKU_E8).expect("sku exists").consumed_units, 3);
}

#[tokio::test]
async fn licensed_user_keeps_existing_license() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(BOB, Some(CLOUD_GROUP), None).await;

    assert!(result.success);
    assert!(!result.license_assigned);
    assert_eq!(result.steps[0].message, "License already assigned");
    assert_eq!(directory.calls_to(DirectoryOperation::AssignLicense), 0);
}

#[tokio::test]
async fn exhausted_catalog_stops_before_group_membership() {
    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_user(user(ADA, "ada@contoso.com", &[]))
            .with_sku(sku(SKU_E3_FULL, "CPC_E_2C_8GB_128GB", 5, 5))
            .with_group(group(CLOUD_GROUP, "CloudPC Users")),
    );
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(ADA, None, None).await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(
        result.message,
        "Failed to assign Windows 365 license: No available Windows 365 licenses found"
    );
    assert!(result.estimated_completion_time.is_none());
    assert_eq!(directory.calls_to(DirectoryOperation::AddGroupMember), 0);
    assert_eq!(directory.calls_to(DirectoryOperation::ListGroups), 0);
}

#[tokio::test]
async fn missing_default_group_keeps_assigned_license() {
    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_user(user(ADA, "ada@contoso.com", &[]))
            .with_sku(sku(SKU_E8, "CPC_E_8C_32GB_512GB", 10, 0))
            .with_group(group(STAFF_GROUP, "All Staff")),
    );
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(ADA, None, None).await;

    assert!(!result.success);
    assert_eq!(result.message, "Failed to find provisioning group");
    assert_eq!(result.steps.len(), 2);
    let failed = result.failed_step().expect("a failed step is recorded");
    assert_eq!(failed.step_name, StageName::GroupMembership);
    assert_eq!(
        failed.error.as_deref(),
        Some("No provisioning group ID provided and no default group found")
    );
    assert!(result.license_assigned, "no rollback of the license stage");
    assert_eq!(
        directory.user(ADA).expect("ada exists").assigned_licenses.len(),
        1
    );
}

#[tokio::test]
async fn group_without_policy_fails_verification() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(ADA, Some(STAFF_GROUP), None).await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 3);
    assert_eq!(result.steps[2].step_name, StageName::PolicyVerification);
    assert_eq!(result.steps[2].status, StepStatus::Failed);
    assert_eq!(
        result.message,
        format!("No provisioning policy found for group {STAFF_GROUP}")
    );
    assert!(result.group_membership_added);
    assert!(result.policy_id.is_none());
}

#[tokio::test]
async fn existing_membership_fails_under_default_policy() {
    let directory = Arc::new(tenant().with_member(CLOUD_GROUP, ADA));
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(ADA, Some(CLOUD_GROUP), None).await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 2);
    assert!(result.message.starts_with("Error during provisioning:"));
}

#[tokio::test]
async fn existing_membership_is_accepted_when_configured() {
    let directory = Arc::new(tenant().with_member(CLOUD_GROUP, ADA));
    let mut config = Config::default();
    config.provisioning.membership_conflict = MembershipConflictPolicy::TreatAsMember;
    let fleet = fleet_with(config, &directory);

    let result = fleet.provision_for_user(ADA, Some(CLOUD_GROUP), None).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(
        result.steps[1].message,
        "User is already a member of the provisioning group"
    );
}

#[tokio::test]
async fn directory_outage_is_recorded_on_the_license_step() {
    let directory = Arc::new(tenant());
    directory.fail_on(
        DirectoryOperation::ListSubscribedSkus,
        transport("connection reset by peer"),
    );
    let fleet = fleet_over(&directory);

    let result = fleet.provision_for_user(ADA, None, None).await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert!(
        result
            .message
            .starts_with("Failed to assign Windows 365 license: Error assigning license:"),
        "{}",
        result.message
    );
    assert!(
        result.steps[0]
            .error
            .as_deref()
            .is_some_and(|error| error.contains("connection reset by peer"))
    );
}
