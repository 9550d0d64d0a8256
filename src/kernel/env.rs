//! Global environment: the constant table consulted by delta unfolding and
//! the registry of type-class names consulted by instance classification.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::kernel::expr::{Expr, Name};

/// Hints that control how aggressively a definition is unfolded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReducibilityHints {
  /// Never unfold.
  Opaque,
  /// Always unfold (abbreviation).
  #[default]
  Abbrev,
  /// Unfold with the given priority height.
  Regular(u32),
}

/// Fields common to every constant declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantVal {
  pub name: Name,
  pub level_params: Vec<Name>,
  pub typ: Expr,
}

/// An axiom declaration (no definitional body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxiomVal {
  pub cnst: ConstantVal,
}

/// A definition with an unfoldable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionVal {
  pub cnst: ConstantVal,
  pub value: Expr,
  pub hints: ReducibilityHints,
}

/// An inductive type declaration (classes included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InductiveVal {
  pub cnst: ConstantVal,
  pub num_params: u64,
  pub ctors: Vec<Name>,
}

/// A top-level constant declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantInfo {
  AxiomInfo(AxiomVal),
  DefnInfo(DefinitionVal),
  InductInfo(InductiveVal),
}

impl ConstantInfo {
  pub fn get_cnst(&self) -> &ConstantVal {
    match self {
      ConstantInfo::AxiomInfo(v) => &v.cnst,
      ConstantInfo::DefnInfo(v) => &v.cnst,
      ConstantInfo::InductInfo(v) => &v.cnst,
    }
  }

  pub fn get_type(&self) -> &Expr {
    &self.get_cnst().typ
  }

  pub fn get_level_params(&self) -> &[Name] {
    &self.get_cnst().level_params
  }
}

/// The global environment.
#[derive(Debug, Clone, Default)]
pub struct Env {
  constants: FxHashMap<Name, ConstantInfo>,
  classes: FxHashSet<Name>,
}

impl Env {
  pub fn new() -> Self {
    Env::default()
  }

  pub fn get(&self, name: &Name) -> Option<&ConstantInfo> {
    self.constants.get(name)
  }

  pub fn insert(&mut self, name: Name, ci: ConstantInfo) {
    self.constants.insert(name, ci);
  }

  /// Mark `name` as a type class. The constant itself may be registered
  /// separately; classification only consults this set.
  pub fn register_class(&mut self, name: Name) {
    self.classes.insert(name);
  }

  pub fn is_class(&self, name: &Name) -> bool {
    self.classes.contains(name)
  }

  pub fn len(&self) -> usize {
    self.constants.len()
  }

  pub fn is_empty(&self) -> bool {
    self.constants.is_empty()
  }
}
