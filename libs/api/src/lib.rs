//! Contract shared by the attestation publisher and message-bus drivers.
//!
//! No tokio here: drivers and the backend live in their own crates and
//! only agree on these types and traits.

pub mod error;
pub mod topic;
pub mod types;
pub mod url;

pub use error::{BusError, ErrorKind};
pub use topic::{TopicDriver, TopicHandle};
pub use types::{Message, OverflowPolicy, PayloadFormat, RunIdentity, StorageOpts};
pub use url::TopicUrl;
