//! The metavariable layer: goal bookkeeping, local contexts, type-class
//! instance tracking and the hypothesis-introduction engine built on top
//! of the kernel's expressions and reduction.

pub mod class;
pub mod ctx;
pub mod error;
pub mod instances;
pub mod intro;
