use std::{collections::HashMap, sync::Arc};

use crate::{
    directory::{DirectoryPort, DirectoryUser},
    fleet::{
        error::{FleetError, FleetErrorKind, no_license_assigned, no_license_available},
        sku::SkuClassifier,
        types::{LicenseChange, LicenseInfo},
    },
};

/// Assigns and removes product licenses on directory users.
pub struct LicenseAssigner {
    directory: Arc<dyn DirectoryPort>,
    classifier: SkuClassifier,
}

impl LicenseAssigner {
    pub fn new(directory: Arc<dyn DirectoryPort>, classifier: SkuClassifier) -> Self {
        Self {
            directory,
            classifier,
        }
    }

    pub fn classifier(&self) -> &SkuClassifier {
        &self.classifier
    }

    async fn catalog(&self) -> Result<Vec<LicenseInfo>, FleetError> {
        let skus = self.directory.list_subscribed_skus().await?;
        Ok(skus.iter().map(LicenseInfo::from).collect())
    }

    /// Licenses assigned to `user_id`, in assignment order.
    ///
    /// Assigned SKU ids with no catalog entry are dropped.
    pub async fn check_user_licenses(&self, user_id: &str) -> Result<Vec<LicenseInfo>, FleetError> {
        let (user, catalog) = self.user_and_catalog(user_id).await.inspect_err(|err| {
            tracing::warn!(
                target: "licensing",
                user_id = user_id,
                error = %err,
                "check_user_licenses_failed"
            );
        })?;

        let by_sku = index_by_sku(&catalog);
        Ok(user
            .assigned_licenses
            .iter()
            .filter_map(|assigned| by_sku.get(assigned.sku_id.as_str()))
            .map(|license| (*license).clone())
            .collect())
    }

    /// The catalog is only fetched when the user holds at least one license.
    async fn user_and_catalog(
        &self,
        user_id: &str,
    ) -> Result<(DirectoryUser, Vec<LicenseInfo>), FleetError> {
        let user = self.directory.get_user(user_id).await?;
        if user.assigned_licenses.is_empty() {
            return Ok((user, Vec::new()));
        }
        let catalog = self.catalog().await?;
        Ok((user, catalog))
    }

    pub async fn has_product_license(&self, user_id: &str) -> Result<bool, FleetError> {
        let licenses = self.check_user_licenses(user_id).await?;
        Ok(licenses
            .iter()
            .any(|license| self.classifier.is_product_sku(&license.sku_part_number)))
    }

    /// Every product SKU in the catalog, whether or not units are free.
    pub async fn product_licenses(&self) -> Result<Vec<LicenseInfo>, FleetError> {
        let catalog = self.catalog().await.inspect_err(|err| {
            tracing::warn!(target: "licensing", error = %err, "product_catalog_failed");
        })?;
        Ok(catalog
            .into_iter()
            .filter(|license| self.classifier.is_product_sku(&license.sku_part_number))
            .collect())
    }

    pub async fn available_product_licenses(&self) -> Result<Vec<LicenseInfo>, FleetError> {
        Ok(self
            .product_licenses()
            .await?
            .into_iter()
            .filter(|license| license.available() > 0)
            .collect())
    }

    /// Adds a license to the user. Without `sku_id`, the first product SKU with
    /// free units in catalog order is chosen.
    #[tracing::instrument(name = "assign_license", target = "licensing", skip(self))]
    pub async fn assign_license(
        &self,
        user_id: &str,
        sku_id: Option<&str>,
    ) -> Result<LicenseChange, FleetError> {
        let (sku_id, sku_part_number) = match sku_id.filter(|id| !id.trim().is_empty()) {
            Some(sku_id) => (sku_id.to_string(), None),
            None => {
                let catalog = self.catalog().await.map_err(|err| {
                    log_transport_failure("assign_license", user_id, &err);
                    wrap_transport("Error assigning license", err)
                })?;
                let selected = self
                    .classifier
                    .select_available(&catalog)
                    .ok_or_else(|| no_license_available("No available Windows 365 licenses found"))?;
                (
                    selected.sku_id.clone(),
                    Some(selected.sku_part_number.clone()),
                )
            }
        };

        self.directory
            .assign_license(user_id, &sku_id)
            .await
            .map_err(|err| {
                let err = FleetError::from(err);
                log_transport_failure("assign_license", user_id, &err);
                wrap_transport("Error assigning license", err)
            })?;

        tracing::info!(
            target: "licensing",
            user_id = user_id,
            sku_id = %sku_id,
            "license_assigned"
        );
        Ok(LicenseChange {
            user_id: user_id.to_string(),
            sku_id,
            sku_part_number,
        })
    }

    /// Removes a license from the user. Without `sku_id`, the first assigned
    /// license whose catalog entry is a product SKU is chosen.
    #[tracing::instrument(name = "unassign_license", target = "licensing", skip(self))]
    pub async fn unassign_license(
        &self,
        user_id: &str,
        sku_id: Option<&str>,
    ) -> Result<LicenseChange, FleetError> {
        let (sku_id, sku_part_number) = match sku_id.filter(|id| !id.trim().is_empty()) {
            Some(sku_id) => (sku_id.to_string(), None),
            None => self.select_assigned_product_sku(user_id).await?,
        };

        self.directory
            .remove_license(user_id, &sku_id)
            .await
            .map_err(|err| {
                let err = FleetError::from(err);
                log_transport_failure("unassign_license", user_id, &err);
                wrap_transport("Error unassigning license", err)
            })?;

        tracing::info!(
            target: "licensing",
            user_id = user_id,
            sku_id = %sku_id,
            "license_unassigned"
        );
        Ok(LicenseChange {
            user_id: user_id.to_string(),
            sku_id,
            sku_part_number,
        })
    }

    async fn select_assigned_product_sku(
        &self,
        user_id: &str,
    ) -> Result<(String, Option<String>), FleetError> {
        let (user, catalog) = self.user_and_catalog(user_id).await.map_err(|err| {
            log_transport_failure("unassign_license", user_id, &err);
            wrap_transport("Error unassigning license", err)
        })?;

        if user.assigned_licenses.is_empty() {
            return Err(no_license_assigned("User does not have any licenses assigned"));
        }

        let by_sku = index_by_sku(&catalog);
        user.assigned_licenses
            .iter()
            .filter_map(|assigned| by_sku.get(assigned.sku_id.as_str()))
            .find(|license| self.classifier.is_product_sku(&license.sku_part_number))
            .map(|license| {
                (
                    license.sku_id.clone(),
                    Some(license.sku_part_number.clone()),
                )
            })
            .ok_or_else(|| {
                no_license_assigned(format!(
                    "User does not have any Windows 365 licenses assigned. Found {} total licenses.",
                    user.assigned_licenses.len()
                ))
            })
    }
}

fn index_by_sku(catalog: &[LicenseInfo]) -> HashMap<&str, &LicenseInfo> {
    catalog
        .iter()
        .map(|license| (license.sku_id.as_str(), license))
        .collect()
}

fn log_transport_failure(operation: &'static str, user_id: &str, err: &FleetError) {
    tracing::warn!(
        target: "licensing",
        operation = operation,
        user_id = user_id,
        kind = err.kind.as_str(),
        error = %err,
        "license_operation_failed"
    );
}

/// Prefixes directory failures with the operation while keeping `NotFound` distinguishable.
fn wrap_transport(operation: &str, err: FleetError) -> FleetError {
    match err.kind {
        FleetErrorKind::NotFound | FleetErrorKind::TransportError => {
            FleetError::new(err.kind, format!("{operation}: {}", err.message))
        }
        _ => err,
    }
}
