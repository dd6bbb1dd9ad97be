pub mod agent;
pub mod channels;
pub mod collaborators;
pub mod deaths;
pub mod game_service;
pub mod room_service;
pub mod summary;
pub mod timer;
pub mod victory;
pub mod vote;
