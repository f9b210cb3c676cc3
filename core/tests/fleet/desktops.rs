use std::sync::Arc;

use deskfleet::{
    directory::{DirectoryCall, DirectoryOperation, error::transport},
    fleet::FleetErrorKind,
};

use crate::support::{desktop, fleet_over, tenant};

#[tokio::test]
async fn listing_clamps_top_and_forwards_filter() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let desktops = fleet
        .desktops()
        .list(Some("status eq 'provisioned'"), Some(5_000))
        .await
        .expect("listing succeeds");
    assert_eq!(desktops.len(), 2, "raw filters are not evaluated in memory");
    assert!(directory.calls().contains(&DirectoryCall {
        operation: DirectoryOperation::ListCloudDesktops,
        args: vec!["status eq 'provisioned'".to_string(), String::new()],
    }));
}

#[tokio::test]
async fn user_lookup_matches_principal_name_ignoring_case() {
    let directory = Arc::new(
        tenant().with_cloud_desktop(desktop("cpc-3", "BOB@contoso.com", "provisioned")),
    );
    let fleet = fleet_over(&directory);

    let bobs = fleet
        .desktops()
        .for_user("bob@contoso.com")
        .await
        .expect("lookup succeeds");
    let ids: Vec<_> = bobs.iter().map(|desktop| desktop.id.as_str()).collect();
    assert_eq!(ids, vec!["cpc-1", "cpc-3"]);
}

#[tokio::test]
async fn status_summarizes_a_single_desktop() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let status = fleet.desktops().status("cpc-2").await.expect("desktop exists");
    assert_eq!(status.id, "cpc-2");
    assert_eq!(status.status.as_deref(), Some("inGracePeriod"));

    let missing = fleet
        .desktops()
        .status("cpc-404")
        .await
        .expect_err("unknown desktop");
    assert_eq!(missing.kind, FleetErrorKind::NotFound);
}

#[tokio::test]
async fn grace_period_and_reboot_reach_the_directory() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    fleet.end_grace_period("cpc-2").await.expect("grace period ends");
    fleet.desktops().reboot("cpc-1").await.expect("reboot accepted");

    assert_eq!(directory.calls_to(DirectoryOperation::EndGracePeriod), 1);
    assert_eq!(directory.calls_to(DirectoryOperation::RebootCloudDesktop), 1);

    let missing = fleet
        .end_grace_period("cpc-404")
        .await
        .expect_err("unknown desktop");
    assert_eq!(missing.kind, FleetErrorKind::NotFound);
}

#[tokio::test]
async fn grace_period_failures_are_transport_errors() {
    let directory = Arc::new(tenant());
    directory.fail_on(DirectoryOperation::EndGracePeriod, transport("bad gateway"));
    let fleet = fleet_over(&directory);

    let err = fleet
        .end_grace_period("cpc-2")
        .await
        .expect_err("directory failure surfaces");
    assert_eq!(err.kind, FleetErrorKind::TransportError);
    assert_eq!(err.message, "bad gateway");
}
