//! Shared types for the DAO social backend
//!
//! Types crossing the server boundary live here so that API consumers
//! (gateway stubs, test clients) never depend on the server crate:
//!
//! - **Error codes** (`error`): the stable user-visible code set
//! - **Response envelope** (`response`): `{code, msg, data}`
//! - **Domain types** (`types`): visibility, post kinds, pay status, paging

pub mod error;
pub mod response;
pub mod types;

pub use error::ErrorCode;
pub use response::ApiResponse;
pub use types::{
    ContentCategory, MsgFromType, Paged, Pagination, PayStatus, PostType, RedpacketType, RefType,
    Visibility,
};
