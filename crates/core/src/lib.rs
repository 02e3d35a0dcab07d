//! cg: browser-session automation for the ChatGPT web application.
//!
//! Drives a real browser session through injected capability ports and
//! infers application state (logged in or out, which conversation is
//! active, whether a reply is still streaming) purely from what the
//! page exposes: network headers, cookies, DOM readings, and URL
//! changes. There is no authoritative event feed, so the core reconciles
//! those racing signals with bounded retries and stabilization polling,
//! degrading flaky readings to "not yet" instead of failing the session.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use cg::{ChatGpt, GenerateOptions, SessionOptions};
//!
//! # async fn run(driver: Arc<dyn cg::BrowserLauncher>) -> cg::Result<()> {
//! let session = ChatGpt::new(driver, SessionOptions::default().with_assistant_name("Abbas"));
//!
//! let mut events = session.subscribe();
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("session event: {}", event.name());
//!     }
//! });
//!
//! session.initialize().await?;
//! session.select_temporary_chat().await?;
//! let reply = session.generate("hello, who are you?", &GenerateOptions::default()).await?;
//! println!("{}", reply.message);
//! session.destroy().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod driver;
pub mod error;
pub mod events;
pub mod nav;
pub mod options;
pub mod polling;
pub mod session;
pub mod turn;
pub mod ui;

pub use api::ConversationApi;
pub use auth::{AuthMonitor, AuthState};
pub use driver::{
	Browser, BrowserLauncher, CredentialStore, FileChooser, LocationHandler, OutboundRequest, Page,
	RequestHandler,
};
pub use error::{Error, Result};
pub use events::{EventBus, EventStream, EventWaiter, SessionEvent};
pub use nav::{ChatSelection, NavigationTracker, RouteClass, Routes, classify};
pub use options::SessionOptions;
pub use polling::{RetryPolicy, poll};
pub use session::{ChatGpt, LifecycleState};
pub use turn::{GenerateOptions, TurnEngine, TurnOutcome};
pub use ui::Selectors;

// Re-export the wire types for convenience
pub use cg_protocol;
pub use cg_protocol::{Conversation, ConversationPage, Cookie, LaunchOptions, Location, ReplyPayload};
