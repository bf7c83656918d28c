pub mod ai;
pub mod api;
pub mod cache;
pub mod content;
pub mod events;
pub mod init;
pub mod menu;
pub mod purchases;
pub mod telegram;
