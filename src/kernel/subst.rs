//! Bound-variable instantiation and free-variable abstraction.
//!
//! Both directions follow the Lean 4 ordering convention used throughout:
//! in a replacement array, index 0 is the *outermost* binder. Instantiating
//! `Bvar(n-1)` therefore uses `substs[0]`, and `Bvar(0)` uses `substs[n-1]`.
//! Walkers are iterative (explicit frame stack) so deep telescopes never
//! overflow the call stack.

use crate::kernel::expr::*;

enum Frame<'a> {
  Visit(&'a Expr, u64),
  App,
  Lam(Name, BinderInfo),
  All(Name, BinderInfo),
  LetE(Name, bool),
}

/// Runs an iterative rewrite over `e`. `leaf` decides what each non-binder,
/// non-app node becomes at a given binder depth.
fn rewrite(e: &Expr, offset: u64, leaf: impl Fn(&Expr, u64) -> Expr) -> Expr {
  let mut work: Vec<Frame<'_>> = vec![Frame::Visit(e, offset)];
  let mut results: Vec<Expr> = Vec::new();

  while let Some(frame) = work.pop() {
    match frame {
      Frame::Visit(e, offset) => match e.as_data() {
        ExprData::App(f, a) => {
          work.push(Frame::App);
          work.push(Frame::Visit(a, offset));
          work.push(Frame::Visit(f, offset));
        },
        ExprData::Lam(n, t, b, bi) => {
          work.push(Frame::Lam(n.clone(), bi.clone()));
          work.push(Frame::Visit(b, offset + 1));
          work.push(Frame::Visit(t, offset));
        },
        ExprData::ForallE(n, t, b, bi) => {
          work.push(Frame::All(n.clone(), bi.clone()));
          work.push(Frame::Visit(b, offset + 1));
          work.push(Frame::Visit(t, offset));
        },
        ExprData::LetE(n, t, v, b, nd) => {
          work.push(Frame::LetE(n.clone(), *nd));
          work.push(Frame::Visit(b, offset + 1));
          work.push(Frame::Visit(v, offset));
          work.push(Frame::Visit(t, offset));
        },
        _ => results.push(leaf(e, offset)),
      },
      Frame::App => {
        let a = results.pop().unwrap();
        let f = results.pop().unwrap();
        results.push(Expr::app(f, a));
      },
      Frame::Lam(n, bi) => {
        let b = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::lam(n, t, b, bi));
      },
      Frame::All(n, bi) => {
        let b = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::all(n, t, b, bi));
      },
      Frame::LetE(n, nd) => {
        let b = results.pop().unwrap();
        let v = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::letE(n, t, v, b, nd));
      },
    }
  }

  results.pop().unwrap()
}

// ============================================================================
// Lifting
// ============================================================================

/// Shift every loose bound variable with index `>= start` up by `amount`.
pub fn lift_loose_bvars(e: &Expr, start: u64, amount: u64) -> Expr {
  if amount == 0 || e.loose_bvar_bound() <= start {
    return e.clone();
  }
  rewrite(e, start, |leaf, offset| match leaf.as_data() {
    ExprData::Bvar(idx) if *idx >= offset => Expr::bvar(idx + amount),
    _ => leaf.clone(),
  })
}

// ============================================================================
// Instantiation
// ============================================================================

/// Instantiate the loose bound variables of `body` in the index range
/// `[lo, lo + substs.len())`: each `Bvar` in range is replaced by the
/// corresponding element of `substs` (index 0 outermost), and loose
/// variables above the range are shifted down past it.
pub fn inst_range(body: &Expr, lo: u64, substs: &[Expr]) -> Expr {
  if substs.is_empty() || body.loose_bvar_bound() <= lo {
    return body.clone();
  }
  let n = substs.len() as u64;
  rewrite(body, lo, |leaf, offset| match leaf.as_data() {
    ExprData::Bvar(idx) => {
      // `offset - lo` binders were crossed on the way down.
      let crossed = offset - lo;
      if *idx < offset {
        leaf.clone()
      } else if *idx < offset + n {
        let replacement = &substs[(n - 1 - (idx - offset)) as usize];
        lift_loose_bvars(replacement, 0, crossed)
      } else {
        Expr::bvar(idx - n)
      }
    },
    _ => leaf.clone(),
  })
}

/// Instantiate the `substs.len()` innermost loose bound variables of `body`.
pub fn inst(body: &Expr, substs: &[Expr]) -> Expr {
  inst_range(body, 0, substs)
}

// ============================================================================
// Abstraction
// ============================================================================

/// Replace occurrences of the given free variables by bound variables at
/// offset `lo`: `fvars[0]` (outermost) becomes `Bvar(lo + n - 1)` and
/// `fvars[n-1]` (innermost) becomes `Bvar(lo)`, both adjusted by the number
/// of binders crossed.
pub fn abstr_range(e: &Expr, lo: u64, fvars: &[Expr]) -> Expr {
  if fvars.is_empty() {
    return e.clone();
  }
  let n = fvars.len() as u64;
  rewrite(e, lo, |leaf, offset| {
    if let ExprData::Fvar(..) = leaf.as_data() {
      for (i, fv) in fvars.iter().enumerate() {
        if leaf == fv {
          return Expr::bvar(offset + n - 1 - i as u64);
        }
      }
    }
    leaf.clone()
  })
}

/// Abstract the given free variables, the structural dual of [`inst`].
pub fn abstr(e: &Expr, fvars: &[Expr]) -> Expr {
  abstr_range(e, 0, fvars)
}

// ============================================================================
// App spines
// ============================================================================

/// Decompose `f a1 a2 ... an` into `(f, [a1, a2, ..., an])`.
pub fn unfold_apps(e: &Expr) -> (Expr, Vec<Expr>) {
  let mut args = Vec::new();
  let mut cursor = e.clone();
  while let ExprData::App(f, a) = cursor.as_data() {
    args.push(a.clone());
    let f = f.clone();
    cursor = f;
  }
  args.reverse();
  (cursor, args)
}

/// Reconstruct `f a1 a2 ... an`.
pub fn foldl_apps(fun: Expr, args: impl IntoIterator<Item = Expr>) -> Expr {
  args.into_iter().fold(fun, Expr::app)
}
