//! Decorator nodes: wrap exactly one child and reshape its status.
//!
//! | Node                          | Registration id           | Ports                     |
//! |-------------------------------|---------------------------|---------------------------|
//! | [`Inverter`]                  | `Inverter`                |                           |
//! | [`Force`]                     | `ForceSuccess`            |                           |
//! | [`Force`]                     | `ForceFailure`            |                           |
//! | [`Retry`]                     | `RetryUntilSuccessful`    | `num_attempts`            |
//! | [`Repeat`]                    | `Repeat`                  | `num_cycles`              |
//! | [`Timeout`]                   | `Timeout`                 | `msec`                    |
//! | [`Delay`]                     | `Delay`                   | `delay_msec`              |
//! | [`RunOnce`]                   | `RunOnce`                 |                           |
//! | [`Subtree`]                   | `SubTree`                 | `_autoremap`              |
//! | [`KeepRunningUntilFailure`]   | `KeepRunningUntilFailure` |                           |
//! | [`EntryUpdated`]              | `SkipUnlessUpdated`       | `entry`                   |
//! | [`EntryUpdated`]              | `WaitValueUpdate`         | `entry`                   |
//! | [`ConsumeQueue`]              | `ConsumeQueue`            | `queue`, `popped_item`    |
//!
//! Every decorator halts and resets its child once the child completes, so
//! the next entry starts the child from `Idle`.

mod consume_queue;
mod delay;
mod entry_updated;
mod force;
mod inverter;
mod keep_running;
mod retry;
mod run_once;
mod subtree;
mod timeout;

pub use consume_queue::ConsumeQueue;
pub use delay::Delay;
pub use entry_updated::EntryUpdated;
pub use force::Force;
pub use inverter::Inverter;
pub use keep_running::KeepRunningUntilFailure;
pub use retry::{Repeat, Retry};
pub use run_once::RunOnce;
pub use subtree::Subtree;
pub use timeout::Timeout;

pub(crate) use consume_queue::bound_queue;
pub(crate) use entry_updated::entry_key;
