//! Simulated time: the clock, the history of solved levels, output
//! scheduling and the loop that drives a run.

mod clock;
mod context;
mod controller;
mod history;
mod write_control;

pub use clock::*;
pub use context::*;
pub use controller::*;
pub use history::*;
pub use write_control::*;
