// Cursor and quarantine state

pub mod manager;

pub use manager::{
    StateManager, StateSnapshot, CURSOR_KEY, INVALID_ENCOUNTERS_KEY, UNPROCESSED_DATES_KEY,
};
