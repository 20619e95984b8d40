//! Unified error codes for the DAO social backend
//!
//! Every API response carries one of these codes. They are organized
//! by category:
//! - 0xxx: general
//! - 1xxx: authentication
//! - 2xxx: permission
//! - 3xxx: user lifecycle
//! - 4xxx: post / comment
//! - 5xxx: DAO
//! - 6xxx: red packet / payment

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Internal server error
    ServerError = 1,
    /// Request parameters failed validation
    InvalidParams = 2,
    /// Resource not found
    NotFound = 3,
    /// External collaborator (payment, chat, search, blob) failed
    UpstreamFailed = 4,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    Unauthorized = 1001,
    /// Wallet signature did not verify
    InvalidSignature = 1002,
    /// Session token expired or unknown
    SessionExpired = 1003,
    /// Too many failed login attempts inside the throttle window
    TooManyLoginError = 1004,

    // ==================== 2xxx: Permission ====================
    /// Caller lacks permission for the resource
    NoPermission = 2001,

    // ==================== 3xxx: User lifecycle ====================
    /// No user exists for the given wallet address
    NoExistUserAddress = 3001,
    /// User has already requested cancellation
    UserAlreadyWrittenOff = 3002,
    /// Cancellation sweep is still in progress
    WaitForDelete = 3003,

    // ==================== 4xxx: Post / Comment ====================
    /// Comment count ceiling reached for the post
    MaxCommentCount = 4001,

    // ==================== 5xxx: DAO ====================
    /// A non-deleted DAO with the same name already exists
    CreateDaoNameDuplication = 5001,
    /// Caller already follows the DAO
    AlreadySubscribedDAO = 5002,

    // ==================== 6xxx: Red packet / Payment ====================
    /// All shares of the red packet have been claimed
    RedpacketHasBeenCollectedCompletely = 6001,
    /// Payment webhook could not be processed
    PayNotifyError = 6002,
}

impl ErrorCode {
    /// Default human-readable message for the code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::ServerError => "internal server error",
            ErrorCode::InvalidParams => "invalid parameters",
            ErrorCode::NotFound => "resource not found",
            ErrorCode::UpstreamFailed => "upstream service failed",
            ErrorCode::Unauthorized => "authentication required",
            ErrorCode::InvalidSignature => "wallet signature verification failed",
            ErrorCode::SessionExpired => "session expired",
            ErrorCode::TooManyLoginError => "too many failed login attempts",
            ErrorCode::NoPermission => "permission denied",
            ErrorCode::NoExistUserAddress => "no user for this address",
            ErrorCode::UserAlreadyWrittenOff => "user already written off",
            ErrorCode::WaitForDelete => "user is pending deletion",
            ErrorCode::MaxCommentCount => "comment limit reached",
            ErrorCode::CreateDaoNameDuplication => "DAO name already taken",
            ErrorCode::AlreadySubscribedDAO => "already subscribed to this DAO",
            ErrorCode::RedpacketHasBeenCollectedCompletely => {
                "red packet has been collected completely"
            }
            ErrorCode::PayNotifyError => "payment notification rejected",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.message(), *self as u16)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::ServerError),
            2 => Ok(ErrorCode::InvalidParams),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::UpstreamFailed),
            1001 => Ok(ErrorCode::Unauthorized),
            1002 => Ok(ErrorCode::InvalidSignature),
            1003 => Ok(ErrorCode::SessionExpired),
            1004 => Ok(ErrorCode::TooManyLoginError),
            2001 => Ok(ErrorCode::NoPermission),
            3001 => Ok(ErrorCode::NoExistUserAddress),
            3002 => Ok(ErrorCode::UserAlreadyWrittenOff),
            3003 => Ok(ErrorCode::WaitForDelete),
            4001 => Ok(ErrorCode::MaxCommentCount),
            5001 => Ok(ErrorCode::CreateDaoNameDuplication),
            5002 => Ok(ErrorCode::AlreadySubscribedDAO),
            6001 => Ok(ErrorCode::RedpacketHasBeenCollectedCompletely),
            6002 => Ok(ErrorCode::PayNotifyError),
            _ => Err(format!("unknown error code: {}", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_codes() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::ServerError,
            ErrorCode::InvalidParams,
            ErrorCode::NotFound,
            ErrorCode::UpstreamFailed,
            ErrorCode::Unauthorized,
            ErrorCode::InvalidSignature,
            ErrorCode::SessionExpired,
            ErrorCode::TooManyLoginError,
            ErrorCode::NoPermission,
            ErrorCode::NoExistUserAddress,
            ErrorCode::UserAlreadyWrittenOff,
            ErrorCode::WaitForDelete,
            ErrorCode::MaxCommentCount,
            ErrorCode::CreateDaoNameDuplication,
            ErrorCode::AlreadySubscribedDAO,
            ErrorCode::RedpacketHasBeenCollectedCompletely,
            ErrorCode::PayNotifyError,
        ];
        for code in codes {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw).unwrap(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(ErrorCode::try_from(9999).is_err());
    }
}
