pub mod deposit_box;
pub mod metadata;

pub use deposit_box::{DepositBoxReport, FtpDepositBox, deposit_box_path, inspect_all_users};
pub use metadata::{MetadataSummary, read_metadata};
