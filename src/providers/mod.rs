//! Incremental reconstruction of account history from event streams
//!
//! Each provider is a pull-based state machine: callers ask for more,
//! providers walk the chain backward and report when there is nothing
//! older left.

pub mod coin_activity;
pub mod event;
pub mod tokens;

pub use coin_activity::{CoinActivityDetails, CoinActivityProvider, ConfirmedActivityItem};
pub use event::EventProvider;
pub use tokens::TokenProvider;
