// src/portfolio/mod.rs
mod schedule;
mod service;

pub use schedule::*;
pub use service::*;
