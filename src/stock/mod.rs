pub mod coordinator;
pub mod ledger;
pub mod status;

pub use coordinator::{StockTransferCoordinator, TransferFilter};
pub use status::TransferStatus;
