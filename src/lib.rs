//! A tactic-layer hypothesis-introduction engine for a dependently typed
//! kernel language.
//!
//! The [`kernel`] subtree defines locally nameless expressions with de
//! Bruijn bound variables, the instantiation and abstraction rewrites over
//! them, the constant environment and weak-head normalization. The [`meta`]
//! subtree builds the tactic state on top: metavariable goals with local
//! contexts, the local type-class instance cache, and the `introN` family
//! of operations that peel leading binders off a goal into hypotheses.

pub mod kernel;
pub mod meta;
