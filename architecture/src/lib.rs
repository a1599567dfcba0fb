//! Abstractions shared by every layer: aggregate roots, repositories,
//! message queue producers and background services.
pub mod hosting;
pub mod message_queue;
pub mod model;
pub mod repository;
