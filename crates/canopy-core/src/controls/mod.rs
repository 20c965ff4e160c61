//! Control nodes: branch over an ordered list of children.
//!
//! | Node                 | Registration id       | Stops on            | Keeps cursor |
//! |----------------------|-----------------------|---------------------|--------------|
//! | [`Sequence`]         | `Sequence`            | first `Failure`     | yes          |
//! | [`Sequence`] (memory)| `SequenceWithMemory`  | first `Failure`     | across halts |
//! | [`Fallback`]         | `Fallback`            | first `Success`     | yes          |
//! | [`Fallback`] (async) | `AsyncFallback`       | first `Success`     | yes          |
//! | [`ReactiveSequence`] | `ReactiveSequence`    | first non-`Success` | no           |
//! | [`ReactiveFallback`] | `ReactiveFallback`    | first non-`Failure` | no           |
//! | [`Parallel`]         | `Parallel`            | threshold reached   | per child    |
//! | [`ParallelAll`]      | `ParallelAll`         | all done / failures | per child    |
//! | [`Switch`]           | `Switch`              | selected child      | –            |
//! | [`IfThenElse`]       | `IfThenElse`          | chosen branch       | branch       |
//! | [`WhileDoElse`]      | `WhileDoElse`         | chosen branch       | no           |
//! | [`ManualSelector`]   | `ManualSelector`      | selected child      | –            |

mod fallback;
mod if_then_else;
mod manual_selector;
mod parallel;
mod reactive;
mod sequence;
mod switch;
mod while_do_else;

pub use fallback::Fallback;
pub use if_then_else::IfThenElse;
pub use manual_selector::ManualSelector;
pub use parallel::{Parallel, ParallelAll};
pub use reactive::{ReactiveFallback, ReactiveSequence};
pub use sequence::Sequence;
pub use switch::Switch;
pub use while_do_else::WhileDoElse;
