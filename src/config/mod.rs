mod server;
mod service;

pub use server::ServerConfig;
pub use service::ServiceConfig;
