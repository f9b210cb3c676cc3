use std::sync::Arc;

use deskfleet::{
    directory::{DirectoryOperation, InMemoryDirectory, error::transport},
    fleet::FleetErrorKind,
};

use crate::support::{ADA, BOB, SKU_E2, SKU_E8, SKU_OFFICE, fleet_over, sku, tenant, user};

#[tokio::test]
async fn check_user_licenses_joins_assignments_with_catalog() {
    let directory = Arc::new(tenant().with_user(user(
        "user-dan",
        "dan@contoso.com",
        &[SKU_OFFICE, "sku-retired"],
    )));
    let fleet = fleet_over(&directory);

    let bob = fleet.check_user_licenses(BOB).await.expect("bob is readable");
    let skus: Vec<_> = bob.iter().map(|license| license.sku_id.as_str()).collect();
    assert_eq!(skus, vec![SKU_E2, SKU_OFFICE]);

    let dan = fleet
        .check_user_licenses("user-dan")
        .await
        .expect("dan is readable");
    assert_eq!(dan.len(), 1, "ids missing from the catalog are dropped");

    let ada = fleet.check_user_licenses(ADA).await.expect("ada is readable");
    assert!(ada.is_empty());
    assert_eq!(
        directory.calls_to(DirectoryOperation::ListSubscribedSkus),
        2,
        "the catalog is skipped for users without licenses"
    );
}

#[tokio::test]
async fn check_user_licenses_reports_unknown_user() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let err = fleet
        .check_user_licenses("user-ghost")
        .await
        .expect_err("unknown user must fail");
    assert_eq!(err.kind, FleetErrorKind::NotFound);
}

#[tokio::test]
async fn automatic_assignment_skips_exhausted_and_foreign_skus() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let change = fleet.assign_license(ADA, None).await.expect("a seat is free");
    assert_eq!(change.sku_id, SKU_E8);
    assert_eq!(change.sku_part_number.as_deref(), Some("CPC_E_8C_32GB_512GB"));
    assert_eq!(directory.sku(SKU_E8).expect("sku exists").consumed_units, 3);
}

#[tokio::test]
async fn explicit_sku_is_assigned_without_catalog_lookup() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let change = fleet
        .assign_license(ADA, Some(SKU_OFFICE))
        .await
        .expect("explicit sku assigns");
    assert_eq!(change.sku_id, SKU_OFFICE);
    assert!(change.sku_part_number.is_none());
    assert_eq!(directory.calls_to(DirectoryOperation::ListSubscribedSkus), 0);
}

#[tokio::test]
async fn assignment_without_free_seats_is_reported() {
    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_user(user(ADA, "ada@contoso.com", &[]))
            .with_sku(sku(SKU_OFFICE, "ENTERPRISEPACK", 25, 0))
            .with_sku(sku(SKU_E8, "CPC_E_8C_32GB_512GB", 2, 2)),
    );
    let fleet = fleet_over(&directory);

    let err = fleet
        .assign_license(ADA, None)
        .await
        .expect_err("no product seats are free");
    assert_eq!(err.kind, FleetErrorKind::NoLicenseAvailable);
    assert_eq!(err.message, "No available Windows 365 licenses found");
    assert_eq!(directory.calls_to(DirectoryOperation::AssignLicense), 0);
}

#[tokio::test]
async fn assignment_transport_errors_name_the_operation() {
    let directory = Arc::new(tenant());
    directory.fail_on(DirectoryOperation::AssignLicense, transport("gateway timeout"));
    let fleet = fleet_over(&directory);

    let err = fleet
        .assign_license(ADA, Some(SKU_E8))
        .await
        .expect_err("directory failure surfaces");
    assert_eq!(err.kind, FleetErrorKind::TransportError);
    assert_eq!(err.message, "Error assigning license: gateway timeout");
}

#[tokio::test]
async fn unassign_picks_first_product_license() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let change = fleet.unassign_license(BOB, None).await.expect("bob has a product sku");
    assert_eq!(change.sku_id, SKU_E2);

    let bob = directory.user(BOB).expect("bob exists");
    let remaining: Vec<_> = bob
        .assigned_licenses
        .iter()
        .map(|license| license.sku_id.as_str())
        .collect();
    assert_eq!(remaining, vec![SKU_OFFICE]);
    assert_eq!(directory.sku(SKU_E2).expect("sku exists").consumed_units, 0);
}

#[tokio::test]
async fn unassign_distinguishes_no_licenses_from_no_product_license() {
    let directory = Arc::new(tenant().with_user(user(
        "user-dan",
        "dan@contoso.com",
        &[SKU_OFFICE],
    )));
    let fleet = fleet_over(&directory);

    let none = fleet
        .unassign_license(ADA, None)
        .await
        .expect_err("ada holds nothing");
    assert_eq!(none.kind, FleetErrorKind::NoLicenseAssigned);
    assert_eq!(none.message, "User does not have any licenses assigned");

    let foreign = fleet
        .unassign_license("user-dan", None)
        .await
        .expect_err("dan holds no product sku");
    assert_eq!(foreign.kind, FleetErrorKind::NoLicenseAssigned);
    assert_eq!(
        foreign.message,
        "User does not have any Windows 365 licenses assigned. Found 1 total licenses."
    );
    assert_eq!(directory.calls_to(DirectoryOperation::RemoveLicense), 0);
}

#[tokio::test]
async fn product_catalog_lists_only_cloud_desktop_skus() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let products = fleet
        .licenses()
        .product_licenses()
        .await
        .expect("catalog is readable");
    assert_eq!(products.len(), 3);
    assert!(products.iter().all(|license| license.sku_id != SKU_OFFICE));

    let available = fleet
        .licenses()
        .available_product_licenses()
        .await
        .expect("catalog is readable");
    let ids: Vec<_> = available.iter().map(|license| license.sku_id.as_str()).collect();
    assert_eq!(ids, vec![SKU_E8]);
}
