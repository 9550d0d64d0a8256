//! Core term language: names, universe levels, binder annotations and the
//! de Bruijn-indexed expression tree.
//!
//! Expressions are immutable and structurally shared: every node is behind
//! an `Arc`, carries a precomputed hash, and caches an upper bound on its
//! loose bound variables so scope checks are O(1).

use std::{
  hash::{Hash, Hasher},
  sync::Arc,
};

use rustc_hash::FxHasher;

// ============================================================================
// Name
// ============================================================================

/// A hierarchical name with a precomputed hash per node.
#[derive(PartialEq, Eq, Debug, PartialOrd, Ord, Clone)]
pub struct Name(pub Arc<NameData>);

#[derive(PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum NameData {
  Anonymous,
  Str(Name, String, u64),
  Num(Name, u64, u64),
}

impl Name {
  pub fn as_data(&self) -> &NameData {
    &self.0
  }

  pub fn get_hash(&self) -> u64 {
    match *self.0 {
      NameData::Anonymous => 0,
      NameData::Str(.., h) | NameData::Num(.., h) => h,
    }
  }

  pub fn anon() -> Self {
    Name(Arc::new(NameData::Anonymous))
  }

  pub fn str(pre: Name, s: String) -> Self {
    let hasher = &mut FxHasher::default();
    (7, pre.get_hash(), &s).hash(hasher);
    Name(Arc::new(NameData::Str(pre, s, hasher.finish())))
  }

  pub fn num(pre: Name, n: u64) -> Self {
    let hasher = &mut FxHasher::default();
    (11, pre.get_hash(), n).hash(hasher);
    Name(Arc::new(NameData::Num(pre, n, hasher.finish())))
  }

  /// A single-component string name.
  pub fn simple(s: &str) -> Self {
    Name::str(Name::anon(), s.into())
  }

  /// The reserved name `_`: a given name equal to this selects auto-naming.
  pub fn placeholder() -> Self {
    Name::simple("_")
  }

  pub fn is_anon(&self) -> bool {
    matches!(*self.0, NameData::Anonymous)
  }

  pub fn is_placeholder(&self) -> bool {
    matches!(self.as_data(), NameData::Str(pre, s, _) if pre.is_anon() && s == "_")
  }

  /// Internal names carry an underscore-prefixed component.
  pub fn is_internal(&self) -> bool {
    match self.as_data() {
      NameData::Anonymous => false,
      NameData::Str(pre, s, _) => s.starts_with('_') || pre.is_internal(),
      NameData::Num(pre, _, _) => pre.is_internal(),
    }
  }

  pub fn pretty(&self) -> String {
    match self.as_data() {
      NameData::Anonymous => "[anonymous]".to_string(),
      NameData::Str(pre, s, _) if pre.is_anon() => s.clone(),
      NameData::Str(pre, s, _) => format!("{}.{}", pre.pretty(), s),
      NameData::Num(pre, n, _) if pre.is_anon() => n.to_string(),
      NameData::Num(pre, n, _) => format!("{}.{}", pre.pretty(), n),
    }
  }
}

impl Hash for Name {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.get_hash().hash(state);
  }
}

// ============================================================================
// Level
// ============================================================================

/// A universe level.
#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Level(pub Arc<LevelData>);

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum LevelData {
  Zero,
  Succ(Level),
  Max(Level, Level),
  Imax(Level, Level),
  Param(Name),
}

impl Level {
  pub fn as_data(&self) -> &LevelData {
    &self.0
  }
  pub fn zero() -> Self {
    Level(Arc::new(LevelData::Zero))
  }
  pub fn succ(x: Level) -> Self {
    Level(Arc::new(LevelData::Succ(x)))
  }
  pub fn max(x: Level, y: Level) -> Self {
    Level(Arc::new(LevelData::Max(x, y)))
  }
  pub fn imax(x: Level, y: Level) -> Self {
    Level(Arc::new(LevelData::Imax(x, y)))
  }
  pub fn param(x: Name) -> Self {
    Level(Arc::new(LevelData::Param(x)))
  }
}

// ============================================================================
// Literal, BinderInfo
// ============================================================================

/// A literal value embedded in an expression.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Literal {
  NatVal(u64),
  StrVal(String),
}

/// Binder annotation kind.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum BinderInfo {
  /// Explicit binder `(x : A)`.
  Default,
  /// Implicit binder `{x : A}`.
  Implicit,
  /// Strict implicit binder `{{x : A}}`.
  StrictImplicit,
  /// Instance implicit binder `[x : A]`.
  InstImplicit,
}

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a free variable (a local hypothesis).
///
/// Minted once per introduced hypothesis and shared by the declaration that
/// defines it and every `Fvar` occurrence referring to it.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FVarId(pub Name);

impl FVarId {
  pub fn pretty(&self) -> String {
    self.0.pretty()
  }
}

/// Unique identifier of a metavariable (an open goal).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MVarId(pub Name);

impl MVarId {
  pub fn pretty(&self) -> String {
    self.0.pretty()
  }
}

// ============================================================================
// Expr
// ============================================================================

/// A kernel expression. Cheap to clone; nodes are never mutated in place.
#[derive(Debug, Eq, Clone)]
pub struct Expr(pub Arc<ExprNode>);

#[derive(Debug, Eq)]
pub struct ExprNode {
  data: ExprData,
  hash: u64,
  /// Strict upper bound on the loose bound variables of this node:
  /// `Bvar(i)` occurs loose here only if `i < bvar_bound`.
  bvar_bound: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExprData {
  /// Bound variable (de Bruijn index).
  Bvar(u64),
  /// Free variable.
  Fvar(FVarId),
  /// Metavariable.
  Mvar(MVarId),
  /// Sort (universe).
  Sort(Level),
  /// Reference to a named constant with universe level arguments.
  Const(Name, Vec<Level>),
  /// Function application.
  App(Expr, Expr),
  /// Lambda abstraction.
  Lam(Name, Expr, Expr, BinderInfo),
  /// Dependent function type (Pi / forall).
  ForallE(Name, Expr, Expr, BinderInfo),
  /// Let-binding (name, type, value, body, non-dep flag).
  LetE(Name, Expr, Expr, Expr, bool),
  /// Literal value (nat or string).
  Lit(Literal),
}

impl PartialEq for ExprNode {
  fn eq(&self, other: &Self) -> bool {
    self.hash == other.hash && self.data == other.data
  }
}

impl PartialEq for Expr {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
  }
}

impl Hash for Expr {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.hash.hash(state);
  }
}

fn seed_hash(seed: impl Hash) -> u64 {
  let hasher = &mut FxHasher::default();
  seed.hash(hasher);
  hasher.finish()
}

fn mk_node(data: ExprData, hash: u64, bvar_bound: u64) -> Expr {
  Expr(Arc::new(ExprNode { data, hash, bvar_bound }))
}

impl Expr {
  pub fn as_data(&self) -> &ExprData {
    &self.0.data
  }

  pub fn get_hash(&self) -> u64 {
    self.0.hash
  }

  /// Strict upper bound on loose bound variable indices.
  pub fn loose_bvar_bound(&self) -> u64 {
    self.0.bvar_bound
  }

  pub fn has_loose_bvars(&self) -> bool {
    self.0.bvar_bound > 0
  }

  pub fn bvar(idx: u64) -> Self {
    mk_node(ExprData::Bvar(idx), seed_hash((3, idx)), idx + 1)
  }

  pub fn fvar(id: FVarId) -> Self {
    let h = seed_hash((5, id.0.get_hash()));
    mk_node(ExprData::Fvar(id), h, 0)
  }

  pub fn mvar(id: MVarId) -> Self {
    let h = seed_hash((13, id.0.get_hash()));
    mk_node(ExprData::Mvar(id), h, 0)
  }

  pub fn sort(l: Level) -> Self {
    let h = seed_hash((17, &l));
    mk_node(ExprData::Sort(l), h, 0)
  }

  pub fn cnst(n: Name, us: Vec<Level>) -> Self {
    let h = seed_hash((19, n.get_hash(), &us));
    mk_node(ExprData::Const(n, us), h, 0)
  }

  pub fn app(f: Expr, a: Expr) -> Self {
    let h = seed_hash((23, f.get_hash(), a.get_hash()));
    let bound = f.loose_bvar_bound().max(a.loose_bvar_bound());
    mk_node(ExprData::App(f, a), h, bound)
  }

  pub fn lam(n: Name, t: Expr, b: Expr, bi: BinderInfo) -> Self {
    let h = seed_hash((29, n.get_hash(), t.get_hash(), b.get_hash(), &bi));
    let bound = t.loose_bvar_bound().max(b.loose_bvar_bound().saturating_sub(1));
    mk_node(ExprData::Lam(n, t, b, bi), h, bound)
  }

  pub fn all(n: Name, t: Expr, b: Expr, bi: BinderInfo) -> Self {
    let h = seed_hash((31, n.get_hash(), t.get_hash(), b.get_hash(), &bi));
    let bound = t.loose_bvar_bound().max(b.loose_bvar_bound().saturating_sub(1));
    mk_node(ExprData::ForallE(n, t, b, bi), h, bound)
  }

  #[allow(non_snake_case)]
  pub fn letE(n: Name, t: Expr, v: Expr, b: Expr, nd: bool) -> Self {
    let h = seed_hash((37, n.get_hash(), t.get_hash(), v.get_hash(), b.get_hash(), nd));
    let bound = t
      .loose_bvar_bound()
      .max(v.loose_bvar_bound())
      .max(b.loose_bvar_bound().saturating_sub(1));
    mk_node(ExprData::LetE(n, t, v, b, nd), h, bound)
  }

  pub fn lit(l: Literal) -> Self {
    let h = seed_hash((41, &l));
    mk_node(ExprData::Lit(l), h, 0)
  }

  pub fn is_forall(&self) -> bool {
    matches!(self.as_data(), ExprData::ForallE(..))
  }

  pub fn is_let(&self) -> bool {
    matches!(self.as_data(), ExprData::LetE(..))
  }
}
