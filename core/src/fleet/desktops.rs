use std::sync::Arc;

use crate::{
    directory::{CloudDesktop, CloudDesktopQuery, DirectoryPort},
    fleet::{error::FleetError, types::CloudDesktopStatus},
};

pub const DEFAULT_TOP: u32 = 50;
pub const MAX_TOP: u32 = 999;

pub struct CloudDesktopService {
    directory: Arc<dyn DirectoryPort>,
}

impl CloudDesktopService {
    pub fn new(directory: Arc<dyn DirectoryPort>) -> Self {
        Self { directory }
    }

    pub async fn list(
        &self,
        filter: Option<&str>,
        top: Option<u32>,
    ) -> Result<Vec<CloudDesktop>, FleetError> {
        let query = CloudDesktopQuery {
            filter: filter
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string),
            user_principal_name: None,
            top: top.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP),
        };
        self.directory.list_cloud_desktops(&query).await.map_err(|err| {
            tracing::warn!(target: "desktops", error = %err, "cloud_desktop_listing_failed");
            FleetError::from(err)
        })
    }

    pub async fn get(&self, cloud_desktop_id: &str) -> Result<CloudDesktop, FleetError> {
        Ok(self.directory.get_cloud_desktop(cloud_desktop_id).await?)
    }

    pub async fn for_user(&self, user_principal_name: &str) -> Result<Vec<CloudDesktop>, FleetError> {
        let query = CloudDesktopQuery {
            filter: None,
            user_principal_name: Some(user_principal_name.to_string()),
            top: MAX_TOP,
        };
        Ok(self.directory.list_cloud_desktops(&query).await?)
    }

    pub async fn status(&self, cloud_desktop_id: &str) -> Result<CloudDesktopStatus, FleetError> {
        let desktop = self.get(cloud_desktop_id).await?;
        Ok(CloudDesktopStatus::from(&desktop))
    }

    pub async fn reboot(&self, cloud_desktop_id: &str) -> Result<(), FleetError> {
        self.directory
            .reboot_cloud_desktop(cloud_desktop_id)
            .await
            .map_err(|err| {
                tracing::warn!(
                    target: "desktops",
                    cloud_desktop_id = cloud_desktop_id,
                    error = %err,
                    "cloud_desktop_reboot_failed"
                );
                FleetError::from(err)
            })?;
        tracing::info!(target: "desktops", cloud_desktop_id = cloud_desktop_id, "cloud_desktop_reboot_requested");
        Ok(())
    }

    /// Ends the grace period of a desktop whose license was removed, so its
    /// resources are reclaimed right away.
    pub async fn end_grace_period(&self, cloud_desktop_id: &str) -> Result<(), FleetError> {
        self.directory
            .end_grace_period(cloud_desktop_id)
            .await
            .map_err(|err| {
                tracing::warn!(
                    target: "desktops",
                    cloud_desktop_id = cloud_desktop_id,
                    error = %err,
                    "end_grace_period_failed"
                );
                FleetError::from(err)
            })?;
        tracing::info!(target: "desktops", cloud_desktop_id = cloud_desktop_id, "grace_period_ended");
        Ok(())
    }
}
