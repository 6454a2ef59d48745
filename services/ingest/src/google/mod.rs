pub mod client;
pub mod connector;
pub mod models;
pub mod token;
