//! Built-in leaf nodes.
//!
//! | Node                  | Registration id    | Ports                            |
//! |-----------------------|--------------------|----------------------------------|
//! | [`Always`]            | `AlwaysSuccess`    |                                  |
//! | [`Always`]            | `AlwaysFailure`    |                                  |
//! | [`Sleep`]             | `Sleep`            | `msec`                           |
//! | [`SetBlackboard`]     | `SetBlackboard`    | `value`, `output_key`            |
//! | [`UnsetBlackboard`]   | `UnsetBlackboard`  | `key`                            |
//! | [`WasEntryUpdated`]   | `WasEntryUpdated`  | `entry`                          |
//! | [`PopFromQueue`]      | `PopFromQueue`     | `queue`, `popped_item`           |
//!
//! [`SimpleAction`], [`SimpleCondition`] and [`TestAction`] are registered
//! by the host under ids of its choosing.

mod always;
mod blackboard;
mod simple;
mod sleep;
mod stateful;
mod test_action;

pub use always::Always;
pub use blackboard::{PopFromQueue, SetBlackboard, UnsetBlackboard, WasEntryUpdated};
pub use simple::{SimpleAction, SimpleCondition, TickFn};
pub use sleep::Sleep;
pub use stateful::{StatefulAction, StatefulBehavior};
pub use test_action::{CompleteFn, TestAction, TestActionConfig};
