pub mod live_view;
pub mod state_source;
pub mod transport;
