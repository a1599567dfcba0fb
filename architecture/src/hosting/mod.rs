mod background_service;

pub use background_service::BackgroundService;
