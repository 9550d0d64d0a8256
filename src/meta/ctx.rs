//! Local contexts, metavariable contexts and fresh-name generation.
//!
//! A `LocalContext` is an insertion-ordered sequence of declarations keyed
//! by `FVarId`; extending it produces a new value (earlier declarations are
//! structurally shared through the term `Arc`s). A `MetavarContext` is the
//! single source of truth for goal declarations and their at-most-once
//! assignments.

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::kernel::expr::{BinderInfo, Expr, FVarId, MVarId, Name, NameData};
use crate::meta::error::{TacticError, TacticResult};
use crate::meta::instances::LocalInstance;

// ============================================================================
// LocalDecl
// ============================================================================

/// One entry of a local context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalDecl {
  /// An ordinary hypothesis `(h : T)`.
  Hyp {
    fvar_id: FVarId,
    user_name: Name,
    typ: Expr,
    binder_info: BinderInfo,
  },
  /// A let-bound hypothesis `(h : T := v)`.
  LetHyp {
    fvar_id: FVarId,
    user_name: Name,
    typ: Expr,
    value: Expr,
  },
}

impl LocalDecl {
  pub fn fvar_id(&self) -> &FVarId {
    match self {
      LocalDecl::Hyp { fvar_id, .. } | LocalDecl::LetHyp { fvar_id, .. } => {
        fvar_id
      },
    }
  }

  pub fn user_name(&self) -> &Name {
    match self {
      LocalDecl::Hyp { user_name, .. }
      | LocalDecl::LetHyp { user_name, .. } => user_name,
    }
  }

  pub fn typ(&self) -> &Expr {
    match self {
      LocalDecl::Hyp { typ, .. } | LocalDecl::LetHyp { typ, .. } => typ,
    }
  }

  pub fn value(&self) -> Option<&Expr> {
    match self {
      LocalDecl::Hyp { .. } => None,
      LocalDecl::LetHyp { value, .. } => Some(value),
    }
  }

  pub fn is_let(&self) -> bool {
    matches!(self, LocalDecl::LetHyp { .. })
  }
}

// ============================================================================
// LocalContext
// ============================================================================

/// Insertion-ordered local context. A declaration's type and value may only
/// reference strictly earlier declarations.
#[derive(Debug, Clone, Default)]
pub struct LocalContext {
  decls: IndexMap<FVarId, LocalDecl, FxBuildHasher>,
}

impl LocalContext {
  pub fn new() -> Self {
    LocalContext::default()
  }

  pub fn len(&self) -> usize {
    self.decls.len()
  }

  pub fn is_empty(&self) -> bool {
    self.decls.is_empty()
  }

  pub fn get(&self, id: &FVarId) -> Option<&LocalDecl> {
    self.decls.get(id)
  }

  pub fn contains(&self, id: &FVarId) -> bool {
    self.decls.contains_key(id)
  }

  /// Declarations in insertion order.
  pub fn decls(&self) -> impl Iterator<Item = &LocalDecl> {
    self.decls.values()
  }

  /// Append an ordinary hypothesis. The id must be fresh.
  pub fn mk_hyp(
    &mut self,
    fvar_id: FVarId,
    user_name: Name,
    typ: Expr,
    binder_info: BinderInfo,
  ) -> TacticResult<()> {
    if self.decls.contains_key(&fvar_id) {
      return Err(TacticError::DuplicateFVar { fvar_id });
    }
    self.decls.insert(
      fvar_id.clone(),
      LocalDecl::Hyp { fvar_id, user_name, typ, binder_info },
    );
    Ok(())
  }

  /// Append a let-bound hypothesis. The id must be fresh.
  pub fn mk_let_hyp(
    &mut self,
    fvar_id: FVarId,
    user_name: Name,
    typ: Expr,
    value: Expr,
  ) -> TacticResult<()> {
    if self.decls.contains_key(&fvar_id) {
      return Err(TacticError::DuplicateFVar { fvar_id });
    }
    self.decls.insert(
      fvar_id.clone(),
      LocalDecl::LetHyp { fvar_id, user_name, typ, value },
    );
    Ok(())
  }

  pub fn uses_user_name(&self, name: &Name) -> bool {
    self.decls.values().any(|d| d.user_name() == name)
  }

  /// A user name based on `hint` that no declaration currently uses:
  /// `hint`, then `hint_1`, `hint_2`, ... Non-string hints fall back to `x`.
  pub fn get_unused_name(&self, hint: &Name) -> Name {
    let base = match hint.as_data() {
      NameData::Str(_, s, _) => s.clone(),
      _ => "x".to_string(),
    };
    let candidate = Name::simple(&base);
    if !self.uses_user_name(&candidate) {
      return candidate;
    }
    let mut i: u64 = 1;
    loop {
      let candidate = Name::simple(&format!("{base}_{i}"));
      if !self.uses_user_name(&candidate) {
        return candidate;
      }
      i += 1;
    }
  }
}

// ============================================================================
// NameGenerator
// ============================================================================

/// Produces globally fresh `_uniq.N` names for new free variables and
/// metavariables.
#[derive(Debug, Clone)]
pub struct NameGenerator {
  prefix: Name,
  next_idx: u64,
}

impl Default for NameGenerator {
  fn default() -> Self {
    NameGenerator { prefix: Name::simple("_uniq"), next_idx: 0 }
  }
}

impl NameGenerator {
  pub fn new() -> Self {
    NameGenerator::default()
  }

  pub fn next_name(&mut self) -> Name {
    let idx = self.next_idx;
    self.next_idx += 1;
    Name::num(self.prefix.clone(), idx)
  }

  pub fn next_fvar_id(&mut self) -> FVarId {
    FVarId(self.next_name())
  }

  pub fn next_mvar_id(&mut self) -> MVarId {
    MVarId(self.next_name())
  }
}

// ============================================================================
// MetavarContext
// ============================================================================

/// Declaration of a metavariable: its target type, the local context it
/// lives in, the local-instance snapshot taken at creation, and a
/// user-facing tag.
#[derive(Debug, Clone)]
pub struct MetavarDecl {
  pub typ: Expr,
  pub lctx: LocalContext,
  pub local_instances: Vec<LocalInstance>,
  pub tag: Name,
}

/// The shared store of metavariable declarations and assignments.
#[derive(Debug, Clone, Default)]
pub struct MetavarContext {
  decls: FxHashMap<MVarId, MetavarDecl>,
  assignments: FxHashMap<MVarId, Expr>,
}

impl MetavarContext {
  pub fn new() -> Self {
    MetavarContext::default()
  }

  /// Allocate a fresh metavariable.
  pub fn mk_decl(
    &mut self,
    ngen: &mut NameGenerator,
    typ: Expr,
    lctx: LocalContext,
    local_instances: Vec<LocalInstance>,
    tag: Name,
  ) -> MVarId {
    let mvar_id = ngen.next_mvar_id();
    self
      .decls
      .insert(mvar_id.clone(), MetavarDecl { typ, lctx, local_instances, tag });
    mvar_id
  }

  pub fn get_decl(&self, mvar_id: &MVarId) -> Option<&MetavarDecl> {
    self.decls.get(mvar_id)
  }

  pub fn is_assigned(&self, mvar_id: &MVarId) -> bool {
    self.assignments.contains_key(mvar_id)
  }

  pub fn get_assignment(&self, mvar_id: &MVarId) -> Option<&Expr> {
    self.assignments.get(mvar_id)
  }

  /// Record a solution. A metavariable is assigned at most once.
  pub fn assign(&mut self, mvar_id: &MVarId, val: Expr) -> TacticResult<()> {
    if self.assignments.contains_key(mvar_id) {
      return Err(TacticError::ReassignedMVar { mvar_id: mvar_id.clone() });
    }
    self.assignments.insert(mvar_id.clone(), val);
    Ok(())
  }

  pub fn num_decls(&self) -> usize {
    self.decls.len()
  }

  pub fn num_assignments(&self) -> usize {
    self.assignments.len()
  }
}
