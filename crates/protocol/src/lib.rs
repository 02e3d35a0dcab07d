//! Wire types shared between the ChatGPT session core and driver
//! implementations.
//!
//! Everything here is plain data: location snapshots observed from the
//! page, cookies read from persistent storage, browser launch options
//! forwarded to the driver, conversation listings returned by the site's
//! backend, and the structured reply payload the assistant is instructed
//! to produce.

pub mod conversation;
pub mod cookie;
pub mod location;
pub mod options;
pub mod reply;

pub use conversation::{Conversation, ConversationPage};
pub use cookie::Cookie;
pub use location::Location;
pub use options::LaunchOptions;
pub use reply::ReplyPayload;
