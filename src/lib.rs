pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod mcp;
pub mod ports;
pub mod session;

#[cfg(test)]
pub mod test_helpers;
