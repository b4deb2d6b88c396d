//! Test components shared between unit tests
mod scripted_kv;

pub use scripted_kv::*;
