use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    fleet::{Fleet, LicenseAvailability},
    tools::{error::ToolError, registry::ToolRegistry, types::ToolOutput},
};

const DEFAULT_SEARCH_TOP: u32 = 50;

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    /// Free text matched against names and principal names.
    #[serde(default)]
    pub search: Option<String>,
    /// Upper bound on records fetched from the directory.
    #[serde(default)]
    #[validate(range(min = 1, max = 999))]
    pub top: Option<u32>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 999))]
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserArgs {
    /// Object id or user principal name.
    #[validate(length(min = 1))]
    pub user_id: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct LicenseArgs {
    #[validate(length(min = 1))]
    pub user_id: String,
    /// Explicit SKU; picked automatically when omitted.
    #[serde(default)]
    pub sku_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProvisionArgs {
    #[validate(length(min = 1))]
    pub user_id: String,
    /// Provisioning group; the configured default group is used when omitted.
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub sku_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct PageArgs {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 999))]
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct PolicyArgs {
    #[validate(length(min = 1))]
    pub policy_id: String,
    #[serde(default = "default_include_assignments")]
    pub include_assignments: bool,
}

fn default_include_assignments() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct DesktopListArgs {
    /// OData filter passed through to the directory.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 999))]
    pub top: Option<u32>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 999))]
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct DesktopArgs {
    #[validate(length(min = 1))]
    pub cloud_desktop_id: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserDesktopsArgs {
    #[validate(length(min = 1))]
    pub user_principal_name: String,
}

pub fn build_registry(fleet: Arc<Fleet>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    register_directory_tools(&mut registry, &fleet)?;
    register_license_tools(&mut registry, &fleet)?;
    register_provisioning_tools(&mut registry, &fleet)?;
    register_desktop_tools(&mut registry, &fleet)?;
    tracing::info!(target: "tools", tools = registry.len(), "tool_registry_built");
    Ok(registry)
}

fn register_directory_tools(
    registry: &mut ToolRegistry,
    fleet: &Arc<Fleet>,
) -> Result<(), ToolError> {
    let shared = Arc::clone(fleet);
    registry.register_typed(
        "search_users",
        "Search directory users by name or principal name",
        false,
        move |args: SearchArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let users = fleet
                    .groups()
                    .search_users(
                        args.search.as_deref(),
                        args.top.unwrap_or(DEFAULT_SEARCH_TOP),
                    )
                    .await?;
                let page = fleet.paginate(users, args.cursor.as_deref(), args.page_size)?;
                let message = format!("Found {} users", page.total_count);
                Ok(ToolOutput::data(page)?.with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "get_user_details",
        "Fetch one directory user with assigned licenses",
        false,
        move |args: UserArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let user = fleet.groups().get_user(&args.user_id).await?;
                ToolOutput::data(user)
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "search_groups",
        "Search directory groups by display name",
        false,
        move |args: SearchArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let groups = fleet
                    .groups()
                    .search_groups(
                        args.search.as_deref(),
                        args.top.unwrap_or(DEFAULT_SEARCH_TOP),
                    )
                    .await?;
                let page = fleet.paginate(groups, args.cursor.as_deref(), args.page_size)?;
                let message = format!("Found {} groups", page.total_count);
                Ok(ToolOutput::data(page)?.with_message(message))
            }
        },
    )?;

    Ok(())
}

fn register_license_tools(
    registry: &mut ToolRegistry,
    fleet: &Arc<Fleet>,
) -> Result<(), ToolError> {
    let shared = Arc::clone(fleet);
    registry.register_typed(
        "check_user_licenses",
        "List a user's licenses and whether one is a cloud desktop license",
        false,
        move |args: UserArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let licenses = fleet.check_user_licenses(&args.user_id).await?;
                let classifier = fleet.licenses().classifier();
                let has_product_license = licenses
                    .iter()
                    .any(|license| classifier.is_product_sku(&license.sku_part_number));
                let message = format!("User has {} licenses", licenses.len());
                Ok(ToolOutput::data(json!({
                    "userId": args.user_id,
                    "hasCloudDesktopLicense": has_product_license,
                    "licenses": licenses,
                }))?
                .with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "get_product_licenses",
        "List tenant cloud desktop licenses with available seats",
        false,
        move |args: PageArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let licenses: Vec<LicenseAvailability> = fleet
                    .licenses()
                    .product_licenses()
                    .await?
                    .into_iter()
                    .map(LicenseAvailability::from)
                    .collect();
                let page = fleet.paginate(licenses, args.cursor.as_deref(), args.page_size)?;
                let message = format!("Found {} cloud desktop licenses", page.total_count);
                Ok(ToolOutput::data(page)?.with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "assign_license",
        "Assign a cloud desktop license to a user",
        true,
        move |args: LicenseArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let change = fleet
                    .assign_license(&args.user_id, args.sku_id.as_deref())
                    .await?;
                let message = format!("License {} assigned to {}", change.sku_id, change.user_id);
                Ok(ToolOutput::data(change)?.with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "unassign_license",
        "Remove a cloud desktop license from a user",
        true,
        move |args: LicenseArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let change = fleet
                    .unassign_license(&args.user_id, args.sku_id.as_deref())
                    .await?;
                let message = format!("License {} removed from {}", change.sku_id, change.user_id);
                Ok(ToolOutput::data(change)?.with_message(message))
            }
        },
    )?;

    Ok(())
}

fn register_provisioning_tools(
    registry: &mut ToolRegistry,
    fleet: &Arc<Fleet>,
) -> Result<(), ToolError> {
    let shared = Arc::clone(fleet);
    registry.register_typed(
        "provision_for_user",
        "Run the cloud desktop provisioning workflow for a user",
        true,
        move |args: ProvisionArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let result = fleet
                    .provision_for_user(
                        &args.user_id,
                        args.group_id.as_deref(),
                        args.sku_id.as_deref(),
                    )
                    .await;
                let success = result.success;
                let message = result.message.clone();
                let failure = result.failed_step().and_then(|step| step.error.clone());
                let output = ToolOutput::data(result)?.with_message(message);
                if success {
                    Ok(output)
                } else {
                    Ok(output.unsuccessful(failure))
                }
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "list_provisioning_policies",
        "List cloud desktop provisioning policies",
        false,
        move |args: PageArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let policies = fleet.policies().list_policies().await?;
                let page = fleet.paginate(policies, args.cursor.as_deref(), args.page_size)?;
                let message = format!("Found {} provisioning policies", page.total_count);
                Ok(ToolOutput::data(page)?.with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "get_provisioning_policy",
        "Fetch a provisioning policy with its assigned group names",
        false,
        move |args: PolicyArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let policy = fleet
                    .policies()
                    .get_policy(&args.policy_id, args.include_assignments)
                    .await?;
                let group_ids: Vec<String> = policy
                    .assignments
                    .iter()
                    .flatten()
                    .filter(|assignment| assignment.target.is_group_target())
                    .filter_map(|assignment| assignment.target.group_id.clone())
                    .collect();
                let group_names = fleet.groups().resolve_group_names(&group_ids).await;
                ToolOutput::data(json!({
                    "policy": policy,
                    "assignedGroups": group_names,
                }))
            }
        },
    )?;

    Ok(())
}

fn register_desktop_tools(
    registry: &mut ToolRegistry,
    fleet: &Arc<Fleet>,
) -> Result<(), ToolError> {
    let shared = Arc::clone(fleet);
    registry.register_typed(
        "discover_cloud_desktops",
        "List provisioned cloud desktops",
        false,
        move |args: DesktopListArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let desktops = fleet
                    .desktops()
                    .list(args.filter.as_deref(), args.top)
                    .await?;
                let page = fleet.paginate(desktops, args.cursor.as_deref(), args.page_size)?;
                let message = format!("Found {} cloud desktops", page.total_count);
                Ok(ToolOutput::data(page)?.with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "get_cloud_desktop",
        "Fetch one cloud desktop",
        false,
        move |args: DesktopArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let desktop = fleet.desktops().get(&args.cloud_desktop_id).await?;
                ToolOutput::data(desktop)
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "get_user_cloud_desktops",
        "List the cloud desktops owned by a user principal name",
        false,
        move |args: UserDesktopsArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let desktops = fleet
                    .desktops()
                    .for_user(&args.user_principal_name)
                    .await?;
                let message = format!(
                    "Found {} cloud desktops for {}",
                    desktops.len(),
                    args.user_principal_name
                );
                Ok(ToolOutput::data(desktops)?.with_message(message))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "get_cloud_desktop_status",
        "Summarize the state of one cloud desktop",
        false,
        move |args: DesktopArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                let status = fleet.desktops().status(&args.cloud_desktop_id).await?;
                ToolOutput::data(status)
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "reboot_cloud_desktop",
        "Reboot a cloud desktop",
        true,
        move |args: DesktopArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                fleet.desktops().reboot(&args.cloud_desktop_id).await?;
                Ok(ToolOutput::data(json!({ "cloudDesktopId": args.cloud_desktop_id }))?
                    .with_message(format!("Reboot requested for {}", args.cloud_desktop_id)))
            }
        },
    )?;

    let shared = Arc::clone(fleet);
    registry.register_typed(
        "end_grace_period",
        "End the grace period of an unlicensed cloud desktop",
        true,
        move |args: DesktopArgs| {
            let fleet = Arc::clone(&shared);
            async move {
                fleet.end_grace_period(&args.cloud_desktop_id).await?;
                Ok(ToolOutput::data(json!({ "cloudDesktopId": args.cloud_desktop_id }))?
                    .with_message(format!("Grace period ended for {}", args.cloud_desktop_id)))
            }
        },
    )?;

    Ok(())
}
