pub mod programme;
pub mod registry;
pub mod types;

pub use programme::build_entries;
pub use registry::ChannelRegistry;
pub use types::{Channel, ProgrammeEntry, Schedule};
