//! # Field Primitives
//!
//! ## Purpose
//!
//! One module per family of fields. Each exposes pure step constructors
//! (`parameters -> Step`) used by the schema builder, and the kernel functions
//! the runtime dispatches to when control reaches one of those steps.
//!
//! | Module    | Fields                                           | Bytes consumed |
//! |-----------|--------------------------------------------------|----------------|
//! | `fixed`   | `uint*`, `int*`, `uuid`, `uuid_text`             | 1-8 or 16      |
//! | `buffer`  | `bytes`, `text` and their `_dyn` variants        | declared length|
//! | `derived` | `constant`, `mask`, `flag`, `computed`, `fail`, `end` | 0         |
//! | `control` | guards, pointers and jumps of `when` / `switch`  | 0              |
//! | `array`   | `array`, `array_continuous`                      | per element    |
//!
//! Every kernel returns a [`Flow`](crate::runtime::engine::Flow) telling the
//! engine whether to suspend, move on, or jump.

pub(crate) mod array;
pub(crate) mod buffer;
pub(crate) mod control;
pub(crate) mod derived;
pub(crate) mod fixed;
