pub mod config;
pub mod event_log;
pub mod game;
pub mod player;
pub mod role;
pub mod room;
