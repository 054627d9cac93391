//! jenisaver library
//!
//! Client for a JeniSaver download backend: metadata lookup, format
//! ordering, merge downloads and live progress over Socket.IO.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
