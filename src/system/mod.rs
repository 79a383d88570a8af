//! Shared data, pure logic and capability interfaces used by both roles
pub mod codec;
pub mod config;
pub mod drive_command;
pub mod error;
pub mod event;
pub mod hardware;
pub mod indicator;
pub mod loopback;
pub mod melody;
pub mod schema;
pub mod state;
pub mod transport;
