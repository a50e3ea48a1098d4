pub mod browser;
pub mod config;
pub mod db;
pub mod http;
pub mod portal;
pub mod services;
pub mod utils;
