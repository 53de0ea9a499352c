//! Context assembly: the three memory views every prompt is built from.
//!
//! | View | Source | Rendering |
//! |------|--------|-----------|
//! | Facts | Fact tier | `name: value` pairs |
//! | Summary | Summary tier | verbatim |
//! | History | Working tier | `<role>content</role>` lines |

pub mod assembler;

pub use assembler::{AssembledContext, ContextAssembler};
