use std::sync::Arc;

use deskfleet::{
    directory::{AssignmentTarget, DirectoryOperation, PolicyAssignment, error::transport},
    fleet::FleetErrorKind,
};

use crate::support::{
    CLOUD_GROUP, CLOUD_POLICY, STAFF_GROUP, fleet_over, group_assignment, policy, tenant,
};

#[tokio::test]
async fn first_policy_targeting_the_group_wins() {
    let directory = Arc::new(tenant().with_policy(
        policy("policy-late", "Late duplicate"),
        vec![group_assignment("assignment-9", CLOUD_GROUP)],
    ));
    let fleet = fleet_over(&directory);

    let found = fleet
        .policies()
        .find_policy_for_group(CLOUD_GROUP)
        .await
        .expect("lookup succeeds")
        .expect("a policy targets the group");
    assert_eq!(found.id, CLOUD_POLICY);
    assert_eq!(
        directory.calls_to(DirectoryOperation::ListPolicyAssignments),
        1,
        "the scan stops at the first match"
    );
}

#[tokio::test]
async fn non_group_targets_are_ignored() {
    let directory = Arc::new(tenant().with_policy(
        policy("policy-all-users", "All users"),
        vec![PolicyAssignment {
            id: "assignment-2".to_string(),
            target: AssignmentTarget {
                odata_type: "#microsoft.graph.allLicensedUsersAssignmentTarget".to_string(),
                group_id: Some(STAFF_GROUP.to_string()),
            },
        }],
    ));
    let fleet = fleet_over(&directory);

    let found = fleet
        .policies()
        .find_policy_for_group(STAFF_GROUP)
        .await
        .expect("lookup succeeds");
    assert!(found.is_none());
    assert_eq!(directory.calls_to(DirectoryOperation::ListPolicyAssignments), 2);
}

#[tokio::test]
async fn policy_lookup_propagates_directory_failures() {
    let directory = Arc::new(tenant());
    directory.fail_on(
        DirectoryOperation::ListPolicyAssignments,
        transport("service unavailable"),
    );
    let fleet = fleet_over(&directory);

    let err = fleet
        .policies()
        .find_policy_for_group(CLOUD_GROUP)
        .await
        .expect_err("assignment read fails");
    assert_eq!(err.kind, FleetErrorKind::TransportError);
}

#[tokio::test]
async fn get_policy_expands_assignments_on_request() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let bare = fleet
        .policies()
        .get_policy(CLOUD_POLICY, false)
        .await
        .expect("policy exists");
    assert!(bare.assignments.is_none());

    let expanded = fleet
        .policies()
        .get_policy(CLOUD_POLICY, true)
        .await
        .expect("policy exists");
    let assignments = expanded.assignments.expect("assignments are expanded");
    assert_eq!(assignments.len(), 1);
    assert!(assignments[0].target.targets_group(CLOUD_GROUP));

    let missing = fleet
        .policies()
        .get_policy("policy-missing", true)
        .await
        .expect_err("unknown policy");
    assert_eq!(missing.kind, FleetErrorKind::NotFound);
}
