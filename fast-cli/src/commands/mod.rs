//! CLI command implementations.

pub mod content;
pub mod fast;
pub mod history;
pub mod init;
pub mod reminders;
pub mod status;
pub mod watch;
