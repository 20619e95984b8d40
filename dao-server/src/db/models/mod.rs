//! Database models
//!
//! Row shapes for the SurrealDB collections. All rows carry
//! `created_on` / `modified_on` Unix-second timestamps; soft-deletable
//! rows add `is_del` + `deleted_on`. Cross-collection references store
//! the referenced record's plain key (`RecordId::key`), never the full
//! `table:key` form.

mod comment;
mod dao;
mod msg;
mod post;
mod redpacket;
mod tag;
mod user;

pub use comment::{Comment, CommentContent, CommentReply};
pub use dao::{ChatGroup, Dao, DaoBookmark};
pub use msg::{Msg, MsgRead, MsgSend, MsgSys, Organ};
pub use post::{Post, PostCollection, PostContent, PostStar};
pub use redpacket::{Redpacket, RedpacketClaim};
pub use tag::Tag;
pub use user::User;

use surrealdb::RecordId;

/// Plain key of a populated record id
///
/// Rows loaded from the store always carry an id; the Option only
/// exists so models double as insert payloads.
pub fn key_of(id: &Option<RecordId>) -> String {
    id.as_ref()
        .map(|r| r.key().to_string())
        .unwrap_or_default()
}
