//! Light state machine
//!
//! [`LightShared`] holds settings and status behind critical sections.
//! Request handlers use a [`LightApi`] handle; the render task owns the
//! [`LightController`], which runs state hooks, fades and output.

mod api;
mod controller;
mod error;
mod shared;
mod state;

pub use api::LightApi;
pub use controller::LightController;
pub use error::{LightError, ValidationError};
pub use shared::{LightShared, PreviewClock, Status, TRANSITION_CAPACITY};
pub use state::{State, Transition, TransitionQueue};
