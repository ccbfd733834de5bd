pub mod config;
pub mod demo;
pub mod generate;
pub mod reports;
pub mod validate;
