pub mod error;
pub mod export_request;
pub mod id_partition;
