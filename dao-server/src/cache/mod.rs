//! Cache layers: the shared key-value store and the home-timeline
//! cache-index

pub mod kv;
pub mod timeline;

pub use kv::{captcha_key, login_err_key, redpacket_key, session_key, KvStore, MemoryKv};
pub use timeline::{CacheIndex, CacheIndexWorker, IndexAction, IndexActionKind};
