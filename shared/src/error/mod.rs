//! Unified error codes shared across server and clients

mod codes;

pub use codes::ErrorCode;
