// Catalysis - Petivity API client library

pub mod auth;
pub mod commands;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod graphql;
pub mod http_client;
pub mod invoker;
pub mod operations;
pub mod summary;

#[cfg(test)]
mod test_support;
