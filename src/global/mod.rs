pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod pacer;
