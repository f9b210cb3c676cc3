pub mod desktops;
pub mod error;
pub mod facade;
pub mod groups;
pub mod license;
pub mod pagination;
pub mod policy;
pub mod provisioning;
pub mod sku;
pub mod types;

pub use desktops::CloudDesktopService;
pub use error::{FleetError, FleetErrorKind};
pub use facade::Fleet;
pub use groups::{GroupMembershipManager, MembershipOutcome};
pub use license::LicenseAssigner;
pub use pagination::{PaginationCursor, decode_cursor, encode_cursor, paginate};
pub use policy::PolicyResolver;
pub use provisioning::{
    ProvisioningContext, ProvisioningOrchestrator, ProvisioningRequest, ProvisioningStage,
    StageOutcome,
};
pub use sku::SkuClassifier;
pub use types::{
    CloudDesktopStatus, LicenseAvailability, LicenseChange, LicenseInfo, PageResult,
    ProvisioningResult, ProvisioningStep, StageName, StepStatus,
};
