//! Common domain types
//!
//! Numeric enums cross the wire as integers (the mobile clients and the
//! search index both store them flattened), so every enum here carries
//! an explicit `u8` representation.

use serde::{Deserialize, Serialize};

/// Timestamp type (Unix seconds)
pub type Timestamp = i64;

macro_rules! numeric_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl From<$name> for u8 {
            fn from(v: $name) -> u8 {
                v as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(format!(
                        "invalid {} value: {}", stringify!($name), value
                    )),
                }
            }
        }
    };
}

numeric_enum! {
    /// Post visibility state
    pub enum Visibility {
        /// Visible to everyone
        Public = 0,
        /// Visible to the author (and friends, when the predicate allows)
        Private = 1,
        /// Unpublished draft
        Draft = 2,
    }
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

numeric_enum! {
    /// Post kind
    pub enum PostType {
        Text = 0,
        Video = 1,
        /// Pure retweet, body is a pointer to the referenced entity
        Retweet = 2,
        /// Retweet that adds its own content parts
        RetweetComment = 3,
        /// Long-form post pinned to a DAO profile
        DaoProfile = 4,
    }
}

impl PostType {
    pub fn is_retweet(self) -> bool {
        matches!(self, PostType::Retweet | PostType::RetweetComment)
    }
}

numeric_enum! {
    /// Category of a single ordered content part
    pub enum ContentCategory {
        Title = 1,
        Text = 2,
        Image = 3,
        Video = 4,
        Audio = 5,
        Link = 6,
        Attachment = 7,
    }
}

impl ContentCategory {
    /// Parts whose content is a blob-store URL
    pub fn is_media(self) -> bool {
        matches!(
            self,
            ContentCategory::Image
                | ContentCategory::Video
                | ContentCategory::Audio
                | ContentCategory::Attachment
        )
    }
}

numeric_enum! {
    /// What a retweet points at
    pub enum RefType {
        Post = 0,
        Comment = 1,
        CommentReply = 2,
    }
}

numeric_enum! {
    /// Red-packet split rule
    pub enum RedpacketType {
        /// Random positive shares summing to the paid amount
        Lucky = 0,
        /// Fixed amount per share
        Average = 1,
    }
}

numeric_enum! {
    /// Payment lifecycle of a red packet or claim
    pub enum PayStatus {
        /// Payment requested, webhook pending
        Submit = 0,
        Success = 1,
        Failed = 2,
        Refund = 3,
    }
}

numeric_enum! {
    /// Sender kind of a notification fan-out row
    pub enum MsgFromType {
        User = 0,
        Dao = 1,
        /// System sender; no Msg body, resolved from the organ record
        Organ = 2,
    }
}

/// Page-based pagination request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl Pagination {
    /// Clamp page size into [1, 100] and compute the record offset
    pub fn offset(&self) -> u64 {
        let page = self.page.max(1) as u64;
        (page - 1) * self.limit()
    }

    pub fn limit(&self) -> u64 {
        self.page_size.clamp(1, 100) as u64
    }
}

/// Paged response payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Paged<T> {
    pub list: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn new(list: Vec<T>, pager: Pagination, total: u64) -> Self {
        Self {
            list,
            page: pager.page.max(1),
            page_size: pager.limit() as u32,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_roundtrip() {
        for v in [Visibility::Public, Visibility::Private, Visibility::Draft] {
            assert_eq!(Visibility::try_from(u8::from(v)).unwrap(), v);
        }
        assert!(Visibility::try_from(9).is_err());
    }

    #[test]
    fn pagination_offsets() {
        let p = Pagination {
            page: 3,
            page_size: 20,
        };
        assert_eq!(p.offset(), 40);
        let zero = Pagination {
            page: 0,
            page_size: 0,
        };
        assert_eq!(zero.offset(), 0);
        assert_eq!(zero.limit(), 1);
    }
}
