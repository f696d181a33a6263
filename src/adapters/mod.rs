pub mod order_management;
pub mod registry;
pub mod traits;
pub mod warehouse;

pub use order_management::OrderManagementAdapter;
pub use registry::SourceRegistry;
pub use traits::{ConnectionStatus, InventorySource};
pub use warehouse::WarehouseAdapter;
