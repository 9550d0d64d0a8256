//! Two-tier type-class detection for newly introduced hypotheses.
//!
//! `is_class_quick` is purely syntactic and may answer `Unknown`;
//! `is_class_expensive` normalizes with `whnf` and always decides. The
//! quick tier keeps the common case (peeling ordinary hypotheses) O(1)
//! per binder; the expensive tier is only paid when the quick one is
//! inconclusive.

use crate::kernel::env::{ConstantInfo, Env, ReducibilityHints};
use crate::kernel::expr::*;
use crate::kernel::subst::{inst, unfold_apps};
use crate::kernel::whnf::whnf;
use crate::meta::ctx::NameGenerator;

/// Outcome of the quick, syntactic classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassResult {
  NotClass,
  IsClass(Name),
  /// The quick check cannot decide without reduction.
  Unknown,
}

fn classify_const(env: &Env, name: &Name) -> ClassResult {
  if env.is_class(name) {
    return ClassResult::IsClass(name.clone());
  }
  // An unfoldable definition may still reduce to a class.
  match env.get(name) {
    Some(ConstantInfo::DefnInfo(d))
      if d.hints != ReducibilityHints::Opaque =>
    {
      ClassResult::Unknown
    },
    _ => ClassResult::NotClass,
  }
}

/// Syntactic classification: walk under `forall` binders without
/// instantiating and inspect the head.
pub fn is_class_quick(env: &Env, ty: &Expr) -> ClassResult {
  let mut cursor = ty;
  loop {
    match cursor.as_data() {
      ExprData::ForallE(_, _, body, _) => cursor = body,
      ExprData::Const(name, _) => return classify_const(env, name),
      ExprData::App(..) => {
        let (head, _) = unfold_apps(cursor);
        return match head.as_data() {
          ExprData::Const(name, _) => classify_const(env, name),
          ExprData::Mvar(..) => ClassResult::Unknown,
          // A redex in head position needs reduction to decide.
          ExprData::Lam(..) | ExprData::LetE(..) => ClassResult::Unknown,
          _ => ClassResult::NotClass,
        };
      },
      ExprData::Mvar(..) => return ClassResult::Unknown,
      ExprData::LetE(..) => return ClassResult::Unknown,
      ExprData::Lam(..) => return ClassResult::Unknown,
      ExprData::Bvar(..)
      | ExprData::Fvar(..)
      | ExprData::Sort(..)
      | ExprData::Lit(..) => return ClassResult::NotClass,
    }
  }
}

/// Semantic classification: normalize, peel binders (instantiating bodies
/// with fresh free variables so indices stay meaningful), and decide from
/// the head constant. Never answers `Unknown`.
pub fn is_class_expensive(
  env: &Env,
  ngen: &mut NameGenerator,
  ty: &Expr,
) -> ClassResult {
  let mut cursor = ty.clone();
  loop {
    let reduced = whnf(&cursor, env);
    match reduced.as_data() {
      ExprData::ForallE(_, _, body, _) => {
        let fresh = Expr::fvar(ngen.next_fvar_id());
        cursor = inst(body, std::slice::from_ref(&fresh));
      },
      _ => {
        let (head, _) = unfold_apps(&reduced);
        return match head.as_data() {
          ExprData::Const(name, _) if env.is_class(name) => {
            ClassResult::IsClass(name.clone())
          },
          _ => ClassResult::NotClass,
        };
      },
    }
  }
}

/// The full two-tier decision for one hypothesis type, as used while
/// peeling: quick first, the expensive tier only on `Unknown`.
pub fn resolve_class(
  env: &Env,
  ngen: &mut NameGenerator,
  ty: &Expr,
) -> Option<Name> {
  match is_class_quick(env, ty) {
    ClassResult::NotClass => None,
    ClassResult::IsClass(name) => Some(name),
    ClassResult::Unknown => match is_class_expensive(env, ngen, ty) {
      ClassResult::IsClass(name) => Some(name),
      _ => None,
    },
  }
}
