pub mod inline_state;
pub mod state_slot;
