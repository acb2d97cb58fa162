pub mod gateway;
pub mod manager;
pub mod protocol;

pub use gateway::Gateway;
pub use manager::SyncManager;
pub use protocol::{ClientEvent, InitData, ServerEvent};
