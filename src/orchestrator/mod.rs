//! Application-level orchestration for the interactive browser.
//!
//! The UI thread never touches the network; it sends commands here and applies the
//! events that come back.

mod controller;

pub(crate) use controller::{run_controller, UiCommand, UiEvent};
