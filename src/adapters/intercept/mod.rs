pub mod network;
pub mod prerendered;
