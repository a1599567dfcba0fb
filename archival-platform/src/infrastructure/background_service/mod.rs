mod interval_runner;

pub use interval_runner::{DispatchRunner, MaintenanceRunner};
