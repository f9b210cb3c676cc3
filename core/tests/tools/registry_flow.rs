use std::sync::Arc;

use deskfleet::{
    config::Config,
    directory::{
        AssignedLicense, AssignmentTarget, CloudDesktop, DirectoryGroup, DirectoryOperation,
        DirectoryUser, InMemoryDirectory, PolicyAssignment, ProvisioningPolicy, SkuPrepaidUnits,
        SubscribedSku,
    },
    fleet::Fleet,
    tools::{ToolRegistry, build_registry},
};
use serde_json::{Value, json};

const EXPECTED_TOOLS: [&str; 16] = [
    "assign_license",
    "check_user_licenses",
    "discover_cloud_desktops",
    "end_grace_period",
    "get_cloud_desktop",
    "get_cloud_desktop_status",
    "get_product_licenses",
    "get_provisioning_policy",
    "get_user_cloud_desktops",
    "get_user_details",
    "list_provisioning_policies",
    "provision_for_user",
    "reboot_cloud_desktop",
    "search_groups",
    "search_users",
    "unassign_license",
];

fn directory() -> InMemoryDirectory {
    let mut directory = InMemoryDirectory::new()
        .with_user(DirectoryUser {
            id: "user-ada".to_string(),
            user_principal_name: Some("ada@contoso.com".to_string()),
            display_name: Some("Ada".to_string()),
            ..Default::default()
        })
        .with_user(DirectoryUser {
            id: "user-bob".to_string(),
            user_principal_name: Some("bob@contoso.com".to_string()),
            display_name: Some("Bob".to_string()),
            assigned_licenses: vec![AssignedLicense {
                sku_id: "sku-cpc".to_string(),
                disabled_plans: Vec::new(),
            }],
            ..Default::default()
        })
        .with_sku(SubscribedSku {
            sku_id: "sku-cpc".to_string(),
            sku_part_number: "CPC_E_2C_8GB_128GB".to_string(),
            consumed_units: 1,
            prepaid_units: SkuPrepaidUnits {
                enabled: 10,
                ..Default::default()
            },
            ..Default::default()
        })
        .with_group(DirectoryGroup {
            id: "group-cloudpc".to_string(),
            display_name: Some("CloudPC Users".to_string()),
            ..Default::default()
        })
        .with_policy(
            ProvisioningPolicy {
                id: "policy-1".to_string(),
                display_name: Some("Standard".to_string()),
                ..Default::default()
            },
            vec![PolicyAssignment {
                id: "assignment-1".to_string(),
                target: AssignmentTarget::group("group-cloudpc"),
            }],
        );
    for index in 0..7 {
        directory = directory.with_cloud_desktop(CloudDesktop {
            id: format!("cpc-{index}"),
            user_principal_name: Some("bob@contoso.com".to_string()),
            status: Some("provisioned".to_string()),
            ..Default::default()
        });
    }
    directory
}

fn registry_over(directory: &Arc<InMemoryDirectory>) -> ToolRegistry {
    let fleet = Arc::new(Fleet::from_config(
        &Config::default(),
        Arc::clone(directory) as _,
    ));
    build_registry(fleet).expect("registry should build")
}

#[test]
fn registry_exposes_every_tool_with_object_schemas() {
    let directory = Arc::new(directory());
    let registry = registry_over(&directory);

    let descriptors = registry.descriptors();
    let names: Vec<_> = descriptors.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(names, EXPECTED_TOOLS);
    for descriptor in &descriptors {
        assert_eq!(
            descriptor.input_schema["type"],
            json!("object"),
            "{} should take an object",
            descriptor.name
        );
    }

    let destructive: Vec<_> = descriptors
        .iter()
        .filter(|tool| tool.destructive)
        .map(|tool| tool.name.as_str())
        .collect();
    assert_eq!(
        destructive,
        vec![
            "assign_license",
            "end_grace_period",
            "provision_for_user",
            "reboot_cloud_desktop",
            "unassign_license",
        ]
    );
}

#[tokio::test]
async fn provisioning_tool_reports_the_workflow_result() {
    let directory = Arc::new(directory());
    let registry = registry_over(&directory);

    let response = registry
        .call("provision_for_user", json!({ "user_id": "user-ada" }))
        .await;
    assert!(response.success, "{:?}", response.error);
    let data = response.data.expect("result is attached");
    assert_eq!(data["success"], json!(true));
    assert_eq!(data["groupId"], json!("group-cloudpc"));
    assert_eq!(data["steps"].as_array().map(Vec::len), Some(4));
    assert_eq!(data["steps"][0]["stepName"], json!("License Assignment"));

    let again = registry
        .call("provision_for_user", json!({ "user_id": "user-ada" }))
        .await;
    assert!(!again.success, "second membership conflicts by default");
    assert!(again.error.is_some());
    let data = again.data.expect("result is attached");
    assert_eq!(data["steps"][0]["message"], json!("License already assigned"));
}

#[tokio::test]
async fn listing_tools_page_with_cursors() {
    let directory = Arc::new(directory());
    let registry = registry_over(&directory);

    let first = registry
        .call("discover_cloud_desktops", json!({ "page_size": 3 }))
        .await;
    let first = first.data.expect("page is attached");
    assert_eq!(first["items"].as_array().map(Vec::len), Some(3));
    assert_eq!(first["totalCount"], json!(7));
    let cursor = first["nextCursor"].as_str().expect("more pages").to_string();

    let second = registry
        .call("discover_cloud_desktops", json!({ "cursor": cursor }))
        .await;
    let second = second.data.expect("page is attached");
    assert_eq!(second["items"][0]["id"], json!("cpc-3"));
    assert_eq!(second["currentPage"], json!(2));

    let invalid = registry
        .call("discover_cloud_desktops", json!({ "cursor": "%%%" }))
        .await;
    assert!(!invalid.success);
    assert_eq!(invalid.error_kind.as_deref(), Some("invalid_cursor"));
}

#[tokio::test]
async fn policy_tool_resolves_group_names() {
    let directory = Arc::new(directory());
    let registry = registry_over(&directory);

    let response = registry
        .call("get_provisioning_policy", json!({ "policy_id": "policy-1" }))
        .await;
    let data = response.data.expect("policy is attached");
    assert_eq!(data["policy"]["id"], json!("policy-1"));
    assert_eq!(data["assignedGroups"]["group-cloudpc"], json!("CloudPC Users"));
}

#[tokio::test]
async fn license_tools_surface_domain_errors() {
    let directory = Arc::new(directory());
    let registry = registry_over(&directory);

    let check = registry
        .call("check_user_licenses", json!({ "user_id": "user-bob" }))
        .await;
    let check = check.data.expect("licenses are attached");
    assert_eq!(check["hasCloudDesktopLicense"], json!(true));

    let unassign = registry
        .call("unassign_license", json!({ "user_id": "user-ada" }))
        .await;
    assert!(!unassign.success);
    assert_eq!(unassign.error_kind.as_deref(), Some("no_license_assigned"));

    let missing_user = registry
        .call("get_user_details", json!({ "user_id": "user-ghost" }))
        .await;
    assert_eq!(missing_user.error_kind.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_directory() {
    let directory = Arc::new(directory());
    let registry = registry_over(&directory);

    for (tool, arguments) in [
        ("assign_license", json!({})),
        ("assign_license", json!({ "user_id": "" })),
        ("search_users", json!({ "top": 0 })),
        ("end_grace_period", json!({ "cloud_desktop_id": "cpc-1", "force": true })),
        ("get_cloud_desktop", Value::Null),
    ] {
        let response = registry.call(tool, arguments).await;
        assert_eq!(
            response.error_kind.as_deref(),
            Some("invalid_arguments"),
            "{tool} should reject its arguments"
        );
    }
    assert!(directory.calls().is_empty());
    assert_eq!(directory.calls_to(DirectoryOperation::AssignLicense), 0);
}
