//! 类型系统模块：定义消息、提示词与工作项的核心数据类型。
//!
//! # Types Module
//!
//! Core data types shared by the dispatch pipeline: chat messages, the
//! two-part prompt every work item produces, and the work-item seam itself.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`MessageRole`] | Message role (system, user, assistant) |
//! | [`Prompt`] | Two-part prompt: system instruction + user request |
//! | [`WorkItem`] | Trait for units of work the sweep dispatches |
//!
//! ## Example
//!
//! ```rust
//! use paper_sweep::types::{Message, Prompt};
//!
//! let prompt = Prompt::new("You are a terse assistant.", "Summarize this title.");
//! let messages: Vec<Message> = prompt.messages();
//! assert_eq!(messages.len(), 2);
//! ```

pub mod message;
pub mod work;

pub use message::{Message, MessageRole, Prompt};
pub use work::WorkItem;
