use std::sync::Arc;

use crate::{
    config::Config,
    directory::DirectoryPort,
    fleet::{
        desktops::CloudDesktopService,
        error::FleetError,
        groups::GroupMembershipManager,
        license::LicenseAssigner,
        pagination::paginate,
        policy::PolicyResolver,
        provisioning::{ProvisioningOrchestrator, ProvisioningRequest},
        sku::SkuClassifier,
        types::{LicenseChange, LicenseInfo, PageResult, ProvisioningResult},
    },
};

/// Fleet services wired over one directory.
pub struct Fleet {
    licenses: Arc<LicenseAssigner>,
    groups: Arc<GroupMembershipManager>,
    policies: Arc<PolicyResolver>,
    provisioning: ProvisioningOrchestrator,
    desktops: CloudDesktopService,
    default_page_size: usize,
}

impl Fleet {
    pub fn from_config(config: &Config, directory: Arc<dyn DirectoryPort>) -> Self {
        let licenses = Arc::new(LicenseAssigner::new(
            Arc::clone(&directory),
            SkuClassifier::from_config(&config.licensing),
        ));
        let groups = Arc::new(GroupMembershipManager::new(
            Arc::clone(&directory),
            &config.provisioning,
        ));
        let policies = Arc::new(PolicyResolver::new(Arc::clone(&directory)));
        let provisioning = ProvisioningOrchestrator::standard(
            Arc::clone(&licenses),
            Arc::clone(&groups),
            Arc::clone(&policies),
        );

        Self {
            licenses,
            groups,
            policies,
            provisioning,
            desktops: CloudDesktopService::new(directory),
            default_page_size: config.pagination.default_page_size.max(1),
        }
    }

    pub fn licenses(&self) -> &LicenseAssigner {
        &self.licenses
    }

    pub fn groups(&self) -> &GroupMembershipManager {
        &self.groups
    }

    pub fn policies(&self) -> &PolicyResolver {
        &self.policies
    }

    pub fn desktops(&self) -> &CloudDesktopService {
        &self.desktops
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub async fn provision_for_user(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        sku_id: Option<&str>,
    ) -> ProvisioningResult {
        self.provisioning
            .provision(ProvisioningRequest {
                user_id: user_id.to_string(),
                group_id: group_id.map(str::to_string),
                sku_id: sku_id.map(str::to_string),
            })
            .await
    }

    pub async fn check_user_licenses(&self, user_id: &str) -> Result<Vec<LicenseInfo>, FleetError> {
        self.licenses.check_user_licenses(user_id).await
    }

    pub async fn assign_license(
        &self,
        user_id: &str,
        sku_id: Option<&str>,
    ) -> Result<LicenseChange, FleetError> {
        self.licenses.assign_license(user_id, sku_id).await
    }

    pub async fn unassign_license(
        &self,
        user_id: &str,
        sku_id: Option<&str>,
    ) -> Result<LicenseChange, FleetError> {
        self.licenses.unassign_license(user_id, sku_id).await
    }

    pub async fn end_grace_period(&self, cloud_desktop_id: &str) -> Result<(), FleetError> {
        self.desktops.end_grace_period(cloud_desktop_id).await
    }

    /// Pages `items`; `page_size` only applies when no cursor is given.
    pub fn paginate<T>(
        &self,
        items: Vec<T>,
        cursor: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<PageResult<T>, FleetError> {
        paginate(items, cursor, page_size.unwrap_or(self.default_page_size))
    }
}
