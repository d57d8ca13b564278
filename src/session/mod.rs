// Session module
// The small record that remembers what was playing and where

pub mod persistence;
pub mod state;

pub use persistence::SessionStore;
pub use state::SessionState;
