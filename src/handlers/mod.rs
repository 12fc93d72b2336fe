pub mod index;
pub mod server;
