pub mod auth;
pub mod error;
pub mod graph;
pub mod memory;
pub mod ports;
pub mod types;

pub use error::{DirectoryError, DirectoryErrorKind};
pub use graph::GraphDirectory;
pub use memory::{DirectoryCall, DirectoryOperation, InMemoryDirectory};
pub use ports::DirectoryPort;
pub use types::{
    AssignedLicense, AssignmentTarget, CloudDesktop, CloudDesktopQuery, DirectoryGroup,
    DirectoryUser, GroupQuery, PolicyAssignment, ProvisioningPolicy, SkuPrepaidUnits,
    SkuServicePlan, SubscribedSku, UserQuery,
};
