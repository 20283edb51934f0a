//! Output generation: artifacts on disk and the chat message.
//!
//! # Submodules
//!
//! - [`json`]: reads and writes the JSON artifacts handed between stages
//! - [`slack`]: renders a selection as a Slack mrkdwn message

pub mod json;
pub mod slack;
