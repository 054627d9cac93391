//! Storage modules: config, session

pub mod config;
pub mod session;
