pub mod memory;
pub mod repository;

pub use memory::InMemoryReportStore;
pub use repository::{PgReportStore, ReportStore};
