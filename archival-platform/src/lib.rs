pub mod infrastructure;
pub mod server;
