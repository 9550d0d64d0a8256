//! Term-level foundations: the expression language, de Bruijn substitution,
//! the global constant environment and weak head normalization.

pub mod env;
pub mod expr;
pub mod subst;
pub mod whnf;
