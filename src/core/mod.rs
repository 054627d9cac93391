//! Core modules: backend client, push channel, download flow

pub mod api;
pub mod downloader;
pub mod formats;
pub mod progress;
pub mod shell;
pub mod socketio;
pub mod thumbnail;
