use std::sync::Arc;

use deskfleet::{
    config::Config,
    directory::{DirectoryOperation, error::transport},
    fleet::{FleetErrorKind, MembershipOutcome},
};

use crate::support::{ADA, CLOUD_GROUP, STAFF_GROUP, fleet_over, fleet_with, group, tenant};

#[tokio::test]
async fn default_group_is_first_marker_match_in_listing_order() {
    let directory = Arc::new(tenant().with_group(group("group-w365", "Windows365 Pilot")));
    let fleet = fleet_over(&directory);

    let resolved = fleet.groups().resolve_default_group().await;
    assert_eq!(resolved.as_deref(), Some(CLOUD_GROUP));
}

#[tokio::test]
async fn custom_markers_drive_default_group_lookup() {
    let directory = Arc::new(tenant());
    let mut config = Config::default();
    config.provisioning.default_group_markers = vec!["staff".to_string()];
    let fleet = fleet_with(config, &directory);

    let resolved = fleet.groups().resolve_default_group().await;
    assert_eq!(resolved.as_deref(), Some(STAFF_GROUP));
}

#[tokio::test]
async fn default_group_lookup_failure_reads_as_no_group() {
    let directory = Arc::new(tenant());
    directory.fail_on(DirectoryOperation::ListGroups, transport("throttled"));
    let fleet = fleet_over(&directory);

    assert!(fleet.groups().resolve_default_group().await.is_none());
}

#[tokio::test]
async fn membership_is_added_once() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let outcome = fleet
        .groups()
        .add_user_to_group(ADA, CLOUD_GROUP)
        .await
        .expect("first add succeeds");
    assert_eq!(outcome, MembershipOutcome::Added);

    let err = fleet
        .groups()
        .add_user_to_group(ADA, CLOUD_GROUP)
        .await
        .expect_err("second add conflicts under the default policy");
    assert_eq!(err.kind, FleetErrorKind::TransportError);
    assert_eq!(directory.group_members(CLOUD_GROUP).len(), 1);
}

#[tokio::test]
async fn group_names_resolve_concurrently_with_fallback() {
    let directory = Arc::new(tenant().with_group(deskfleet::directory::DirectoryGroup {
        id: "group-unnamed".to_string(),
        ..Default::default()
    }));
    let fleet = fleet_over(&directory);

    let names = fleet
        .groups()
        .resolve_group_names(&[
            CLOUD_GROUP.to_string(),
            "group-missing".to_string(),
            "group-unnamed".to_string(),
        ])
        .await;

    assert_eq!(names.len(), 3);
    assert_eq!(names[CLOUD_GROUP], "CloudPC Users");
    assert_eq!(names["group-missing"], "Unknown Group (group-missing)");
    assert_eq!(names["group-unnamed"], "Unknown Group (group-unnamed)");
    assert_eq!(directory.calls_to(DirectoryOperation::GetGroup), 3);
}

#[tokio::test]
async fn user_and_group_search_match_names() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let users = fleet
        .groups()
        .search_users(Some("ADA"), 10)
        .await
        .expect("search succeeds");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, ADA);

    let by_upn = fleet
        .groups()
        .get_user("ada@contoso.com")
        .await
        .expect("principal name resolves");
    assert_eq!(by_upn.id, ADA);

    let groups = fleet
        .groups()
        .search_groups(Some("staff"), 10)
        .await
        .expect("search succeeds");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, STAFF_GROUP);
}
