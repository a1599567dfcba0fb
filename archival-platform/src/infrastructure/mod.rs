mod service_provider;

pub use service_provider::ServiceProvider;

pub mod background_service;
pub mod config;
pub mod database;
pub mod internal_message_consumer;
pub mod message_queue;
mod repository;
pub mod service;
pub mod telemetry;
