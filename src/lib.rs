pub mod analysis;
pub mod audio;
pub mod audio_api;
pub mod config;
pub mod error;
pub mod middle;
pub mod render;
pub mod shared;
pub mod tui;
pub mod visual;
