pub mod error;
pub mod handlers;
pub mod ports;
pub mod registry;
pub mod types;

pub use error::ToolError;
pub use handlers::build_registry;
pub use ports::ToolHandler;
pub use registry::{ToolRegistry, TypedTool};
pub use types::{ToolDescriptor, ToolOutput, ToolResponse};
