pub mod api;
pub mod capture;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod playback;
pub mod script;
