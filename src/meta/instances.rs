//! Local type-class instances and the resolution cache tied to them.

use rustc_hash::FxHashMap;

use crate::kernel::expr::{Expr, FVarId, Name};

/// Records that the hypothesis `fvar_id` is a known instance of the class
/// `class_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstance {
  pub class_name: Name,
  pub fvar_id: FVarId,
}

/// Cache of instance-resolution state for one tactic thread.
///
/// The memoized resolutions in `synth_cache` are valid only for the exact
/// `local_instances` sequence they were computed against: any change to the
/// instance set clears them.
#[derive(Debug, Clone, Default)]
pub struct InstanceCache {
  pub local_instances: Vec<LocalInstance>,
  synth_cache: FxHashMap<Expr, Option<Expr>>,
}

impl InstanceCache {
  pub fn new() -> Self {
    InstanceCache::default()
  }

  /// Element-wise equality with another instance array: the fast path that
  /// lets a sibling tactic call keep its memoized resolutions.
  pub fn matches(&self, other: &[LocalInstance]) -> bool {
    self.local_instances.len() == other.len()
      && self.local_instances.iter().zip(other).all(|(a, b)| a == b)
  }

  /// Install a new instance snapshot, discarding all memoized resolutions.
  pub fn reset_for(&mut self, instances: &[LocalInstance]) {
    self.local_instances = instances.to_vec();
    self.synth_cache.clear();
  }

  /// Register a newly introduced instance. A new instance can change the
  /// outcome of any future resolution, so the memo is discarded.
  pub fn push_instance(&mut self, instance: LocalInstance) {
    self.local_instances.push(instance);
    self.synth_cache.clear();
  }

  /// Memoized resolution outcome for `key`, if any (`Some(None)` records a
  /// failed resolution).
  pub fn lookup_synth(&self, key: &Expr) -> Option<&Option<Expr>> {
    self.synth_cache.get(key)
  }

  pub fn record_synth(&mut self, key: Expr, outcome: Option<Expr>) {
    self.synth_cache.insert(key, outcome);
  }

  pub fn synth_entries(&self) -> usize {
    self.synth_cache.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn inst(class: &str, fv: &str) -> LocalInstance {
    LocalInstance {
      class_name: Name::simple(class),
      fvar_id: FVarId(Name::simple(fv)),
    }
  }

  #[test]
  fn matches_is_element_wise() {
    let mut cache = InstanceCache::new();
    cache.push_instance(inst("Monad", "m"));
    cache.push_instance(inst("Inhabited", "h"));
    assert!(cache.matches(&[inst("Monad", "m"), inst("Inhabited", "h")]));
    assert!(!cache.matches(&[inst("Monad", "m")]));
    assert!(!cache.matches(&[inst("Inhabited", "h"), inst("Monad", "m")]));
  }

  #[test]
  fn push_clears_memo() {
    let mut cache = InstanceCache::new();
    cache.record_synth(Expr::cnst(Name::simple("Inhabited"), vec![]), None);
    assert_eq!(cache.synth_entries(), 1);
    cache.push_instance(inst("Inhabited", "h"));
    assert_eq!(cache.synth_entries(), 0);
  }

  #[test]
  fn reset_installs_snapshot_and_clears() {
    let mut cache = InstanceCache::new();
    cache.push_instance(inst("Monad", "m"));
    cache.record_synth(Expr::cnst(Name::simple("k"), vec![]), None);
    cache.reset_for(&[inst("Functor", "f")]);
    assert!(cache.matches(&[inst("Functor", "f")]));
    assert_eq!(cache.synth_entries(), 0);
  }
}
