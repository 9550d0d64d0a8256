//! Weak head normal form reduction.
//!
//! Walks the application spine and dispatches on the head: beta for lambda
//! redexes, zeta for let bindings, delta for unfoldable constants. Anything
//! else is already in WHNF. The intro engine treats this as an oracle; only
//! the head needs to be reduced, never subterms.

use crate::kernel::env::{ConstantInfo, Env, ReducibilityHints};
use crate::kernel::expr::*;
use crate::kernel::subst::{foldl_apps, inst, unfold_apps};

// ============================================================================
// Universe level substitution
// ============================================================================

/// Substitute universe parameters in a level.
pub fn subst_level(l: &Level, params: &[Name], values: &[Level]) -> Level {
  match l.as_data() {
    LevelData::Zero => l.clone(),
    LevelData::Succ(x) => Level::succ(subst_level(x, params, values)),
    LevelData::Max(x, y) => Level::max(
      subst_level(x, params, values),
      subst_level(y, params, values),
    ),
    LevelData::Imax(x, y) => Level::imax(
      subst_level(x, params, values),
      subst_level(y, params, values),
    ),
    LevelData::Param(n) => match params.iter().position(|p| p == n) {
      Some(i) => values[i].clone(),
      None => l.clone(),
    },
  }
}

/// Substitute universe parameters throughout an expression.
pub fn subst_expr_levels(e: &Expr, params: &[Name], values: &[Level]) -> Expr {
  if params.is_empty() {
    return e.clone();
  }
  match e.as_data() {
    ExprData::Sort(l) => Expr::sort(subst_level(l, params, values)),
    ExprData::Const(n, ls) => Expr::cnst(
      n.clone(),
      ls.iter().map(|l| subst_level(l, params, values)).collect(),
    ),
    ExprData::App(f, a) => Expr::app(
      subst_expr_levels(f, params, values),
      subst_expr_levels(a, params, values),
    ),
    ExprData::Lam(n, t, b, bi) => Expr::lam(
      n.clone(),
      subst_expr_levels(t, params, values),
      subst_expr_levels(b, params, values),
      bi.clone(),
    ),
    ExprData::ForallE(n, t, b, bi) => Expr::all(
      n.clone(),
      subst_expr_levels(t, params, values),
      subst_expr_levels(b, params, values),
      bi.clone(),
    ),
    ExprData::LetE(n, t, v, b, nd) => Expr::letE(
      n.clone(),
      subst_expr_levels(t, params, values),
      subst_expr_levels(v, params, values),
      subst_expr_levels(b, params, values),
      *nd,
    ),
    ExprData::Bvar(..)
    | ExprData::Fvar(..)
    | ExprData::Mvar(..)
    | ExprData::Lit(..) => e.clone(),
  }
}

// ============================================================================
// Delta
// ============================================================================

/// Unfold a constant to its definition body, substituting universe levels.
/// Returns `None` for non-definitions, opaque definitions, and level
/// arity mismatches.
pub fn try_unfold_def(e: &Expr, env: &Env) -> Option<Expr> {
  let ExprData::Const(name, levels) = e.as_data() else {
    return None;
  };
  match env.get(name) {
    Some(ConstantInfo::DefnInfo(d)) => {
      if d.hints == ReducibilityHints::Opaque {
        return None;
      }
      if levels.len() != d.cnst.level_params.len() {
        return None;
      }
      Some(subst_expr_levels(&d.value, &d.cnst.level_params, levels))
    },
    _ => None,
  }
}

// ============================================================================
// WHNF
// ============================================================================

/// Reduce `e` until its head is stable under beta, zeta and delta.
pub fn whnf(e: &Expr, env: &Env) -> Expr {
  let mut cursor = e.clone();
  loop {
    let (head, args) = unfold_apps(&cursor);
    match head.as_data() {
      // Beta: consume as many leading lambdas as there are arguments.
      ExprData::Lam(..) if !args.is_empty() => {
        let mut fun = head.clone();
        let mut consumed = 0;
        while consumed < args.len() {
          match fun.as_data() {
            ExprData::Lam(_, _, body, _) => {
              let body = body.clone();
              fun = body;
              consumed += 1;
            },
            _ => break,
          }
        }
        let reduced = inst(&fun, &args[..consumed]);
        cursor = foldl_apps(reduced, args[consumed..].iter().cloned());
      },

      // Zeta: substitute the bound value into the body.
      ExprData::LetE(_, _, value, body, _) => {
        let reduced = inst(body, std::slice::from_ref(value));
        cursor = foldl_apps(reduced, args);
      },

      // Delta: unfold the head constant, keeping the spine.
      ExprData::Const(..) => match try_unfold_def(&head, env) {
        Some(unfolded) => cursor = foldl_apps(unfolded, args),
        None => return cursor,
      },

      // Everything else is stuck or already WHNF.
      _ => return cursor,
    }
  }
}
