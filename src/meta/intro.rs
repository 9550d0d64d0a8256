//! Hypothesis introduction: peel leading `∀`/`let` binders off a goal's
//! type, turning each into a fresh local hypothesis.
//!
//! The peeling loop rewrites de Bruijn bodies lazily: substitutions are
//! accumulated and applied to each binder domain as it is inspected, and a
//! marker tracks how much of the pending window the reduction fallback has
//! already consumed. Newly introduced hypotheses are classified as
//! type-class instances immediately, so binder domains later in the same
//! telescope resolve against them. On success the original goal is assigned
//! the closing term (the structural dual of peeling) and a fresh, smaller
//! goal is returned; on failure the caller-visible state is untouched.

use crate::kernel::env::Env;
use crate::kernel::expr::*;
use crate::kernel::subst::{abstr, inst};
use crate::kernel::whnf::whnf;
use crate::meta::class::resolve_class;
use crate::meta::ctx::{
  LocalContext, LocalDecl, MetavarContext, NameGenerator,
};
use crate::meta::error::{TacticError, TacticResult};
use crate::meta::instances::{InstanceCache, LocalInstance};

fn intro_tactic_name() -> Name {
  Name::simple("introN")
}

// ============================================================================
// Engine
// ============================================================================

/// Tactic-thread state for hypothesis introduction: the global environment,
/// the metavariable store, the local-instance cache and the fresh-name
/// generator. Exclusively owned by one tactic thread; state is threaded
/// value-style through each call.
pub struct IntroEngine<'env> {
  pub env: &'env Env,
  pub mctx: MetavarContext,
  pub cache: InstanceCache,
  pub ngen: NameGenerator,
}

impl<'env> IntroEngine<'env> {
  pub fn new(env: &'env Env) -> Self {
    IntroEngine {
      env,
      mctx: MetavarContext::new(),
      cache: InstanceCache::new(),
      ngen: NameGenerator::new(),
    }
  }

  /// Allocate a goal metavariable, snapshotting the current local-instance
  /// set into its declaration.
  pub fn mk_goal(&mut self, typ: Expr, lctx: LocalContext, tag: Name) -> MVarId {
    let instances = self.cache.local_instances.clone();
    self.mctx.mk_decl(&mut self.ngen, typ, lctx, instances, tag)
  }

  /// Introduce the first `n` binders of `goal`'s type as hypotheses.
  ///
  /// `given_names`, when non-empty, must have length `n`; a position equal
  /// to the placeholder name `_` falls back to auto-naming. With
  /// `disallow_unaccessible`, binders whose own name is anonymous or
  /// internal are auto-named instead of keeping the inaccessible name.
  ///
  /// Returns the `n` introduced ids (in binder order) and the new goal.
  /// Failure is all-or-nothing: no partial mutation is observable.
  pub fn intro_n(
    &mut self,
    goal: &MVarId,
    n: usize,
    given_names: &[Name],
    disallow_unaccessible: bool,
  ) -> TacticResult<(Vec<FVarId>, MVarId)> {
    if !given_names.is_empty() && given_names.len() != n {
      return Err(TacticError::NameCountMismatch {
        expected: n,
        given: given_names.len(),
      });
    }
    // Stage the state; commit only when the whole call succeeds.
    let mut mctx = self.mctx.clone();
    let mut cache = self.cache.clone();
    let mut ngen = self.ngen.clone();
    let result = intro_n_core(
      self.env,
      &mut mctx,
      &mut cache,
      &mut ngen,
      goal,
      n,
      given_names,
      disallow_unaccessible,
    )?;
    self.mctx = mctx;
    self.cache = cache;
    self.ngen = ngen;
    Ok(result)
  }

  /// Introduce one hypothesis under the given name.
  pub fn intro(
    &mut self,
    goal: &MVarId,
    name: Name,
  ) -> TacticResult<(FVarId, MVarId)> {
    let (mut fvar_ids, new_goal) =
      self.intro_n(goal, 1, std::slice::from_ref(&name), false)?;
    let fvar_id = fvar_ids.pop().unwrap();
    Ok((fvar_id, new_goal))
  }

  /// Introduce one hypothesis with an auto-generated name.
  pub fn intro1(&mut self, goal: &MVarId) -> TacticResult<(FVarId, MVarId)> {
    let (mut fvar_ids, new_goal) = self.intro_n(goal, 1, &[], false)?;
    let fvar_id = fvar_ids.pop().unwrap();
    Ok((fvar_id, new_goal))
  }
}

// ============================================================================
// Core
// ============================================================================

/// Precondition checks, the instance-cache coherence guard, peeling, and
/// the closing assignment.
#[allow(clippy::too_many_arguments)]
fn intro_n_core(
  env: &Env,
  mctx: &mut MetavarContext,
  cache: &mut InstanceCache,
  ngen: &mut NameGenerator,
  goal: &MVarId,
  n: usize,
  given_names: &[Name],
  disallow_unaccessible: bool,
) -> TacticResult<(Vec<FVarId>, MVarId)> {
  let decl = match mctx.get_decl(goal) {
    Some(decl) => decl.clone(),
    None => return Err(TacticError::UnknownMVar { mvar_id: goal.clone() }),
  };
  if mctx.is_assigned(goal) {
    return Err(TacticError::AlreadyAssigned {
      mvar_id: goal.clone(),
      tactic: intro_tactic_name(),
    });
  }

  // Coherence guard: memoized resolutions survive only if the goal's
  // instance snapshot is exactly the cached one.
  if !cache.matches(&decl.local_instances) {
    cache.reset_for(&decl.local_instances);
  }

  let peeled = intro_n_core_aux(
    env,
    cache,
    ngen,
    goal,
    &decl.lctx,
    &decl.typ,
    n,
    given_names,
    disallow_unaccessible,
  )?;

  let new_goal = mctx.mk_decl(
    ngen,
    peeled.residual,
    peeled.lctx,
    cache.local_instances.clone(),
    decl.tag.clone(),
  );
  let solution =
    close_goal(&peeled.decls, &peeled.fvars, Expr::mvar(new_goal.clone()));
  mctx.assign(goal, solution)?;

  let fvar_ids =
    peeled.decls.iter().map(|d| d.fvar_id().clone()).collect();
  Ok((fvar_ids, new_goal))
}

/// Result of a successful peel.
struct Peeled {
  lctx: LocalContext,
  /// The introduced declarations, in binder order.
  decls: Vec<LocalDecl>,
  /// `Fvar` terms for the introduced ids, the substitution array.
  fvars: Vec<Expr>,
  /// The remaining goal type, fully instantiated.
  residual: Expr,
}

/// The telescope-peeling loop.
#[allow(clippy::too_many_arguments)]
fn intro_n_core_aux(
  env: &Env,
  cache: &mut InstanceCache,
  ngen: &mut NameGenerator,
  goal: &MVarId,
  lctx0: &LocalContext,
  typ0: &Expr,
  n: usize,
  given_names: &[Name],
  disallow_unaccessible: bool,
) -> TacticResult<Peeled> {
  let mut lctx = lctx0.clone();
  let mut decls: Vec<LocalDecl> = Vec::with_capacity(n);
  let mut fvars: Vec<Expr> = Vec::with_capacity(n);
  // First element of `fvars` not yet substituted into `ty`. Everything
  // before it was consumed when the reduction fallback closed the type.
  let mut subst_from = 0;
  let mut ty = typ0.clone();

  while decls.len() < n {
    match ty.as_data() {
      ExprData::ForallE(binder_name, dom, body, bi) => {
        let dom = inst(dom, &fvars[subst_from..]);
        let fvar_id = ngen.next_fvar_id();
        let user_name = mk_aux_name(
          &lctx,
          given_names,
          decls.len(),
          binder_name,
          disallow_unaccessible,
        );
        lctx.mk_hyp(
          fvar_id.clone(),
          user_name.clone(),
          dom.clone(),
          bi.clone(),
        )?;
        // Classify before peeling continues: later binder domains may need
        // to resolve against this instance.
        if let Some(class_name) = resolve_class(env, ngen, &dom) {
          cache.push_instance(LocalInstance {
            class_name,
            fvar_id: fvar_id.clone(),
          });
        }
        decls.push(LocalDecl::Hyp {
          fvar_id: fvar_id.clone(),
          user_name,
          typ: dom,
          binder_info: bi.clone(),
        });
        fvars.push(Expr::fvar(fvar_id));
        let body = body.clone();
        ty = body;
      },

      ExprData::LetE(binder_name, t, v, body, _) => {
        let t = inst(t, &fvars[subst_from..]);
        let v = inst(v, &fvars[subst_from..]);
        let fvar_id = ngen.next_fvar_id();
        let user_name = mk_aux_name(
          &lctx,
          given_names,
          decls.len(),
          binder_name,
          disallow_unaccessible,
        );
        lctx.mk_let_hyp(
          fvar_id.clone(),
          user_name.clone(),
          t.clone(),
          v.clone(),
        )?;
        decls.push(LocalDecl::LetHyp {
          fvar_id: fvar_id.clone(),
          user_name,
          typ: t,
          value: v,
        });
        fvars.push(Expr::fvar(fvar_id));
        let body = body.clone();
        ty = body;
      },

      _ => {
        // No binder structure left. Close the pending substitutions and
        // ask the reduction oracle whether more binders appear.
        let closed = inst(&ty, &fvars[subst_from..]);
        subst_from = fvars.len();
        let reduced = whnf(&closed, env);
        if reduced.is_forall() {
          ty = reduced;
        } else {
          return Err(TacticError::InsufficientBinders {
            mvar_id: goal.clone(),
            remaining: reduced,
          });
        }
      },
    }
  }

  let residual = inst(&ty, &fvars[subst_from..]);
  Ok(Peeled { lctx, decls, fvars, residual })
}

/// Pick the user name for the binder at `pos`: a non-placeholder given name
/// wins outright (shadowing allowed), otherwise the binder's own name is
/// made unused. With `disallow_unaccessible`, inaccessible binder names are
/// replaced by the default hint.
fn mk_aux_name(
  lctx: &LocalContext,
  given_names: &[Name],
  pos: usize,
  binder_name: &Name,
  disallow_unaccessible: bool,
) -> Name {
  if let Some(given) = given_names.get(pos) {
    if !given.is_placeholder() {
      return given.clone();
    }
  }
  let hint = if disallow_unaccessible
    && (binder_name.is_anon() || binder_name.is_internal())
  {
    Name::simple("x")
  } else {
    binder_name.clone()
  };
  lctx.get_unused_name(&hint)
}

/// Wrap `mvar_term` in binders closing exactly the introduced free
/// variables, innermost first: `Hyp` becomes a lambda, `LetHyp` a let.
/// Each declaration's type and value are re-abstracted over the strictly
/// earlier ids — the structural dual of peeling.
fn close_goal(decls: &[LocalDecl], fvars: &[Expr], mvar_term: Expr) -> Expr {
  let mut body = abstr(&mvar_term, fvars);
  for (i, decl) in decls.iter().enumerate().rev() {
    match decl {
      LocalDecl::Hyp { user_name, typ, binder_info, .. } => {
        let t = abstr(typ, &fvars[..i]);
        body = Expr::lam(user_name.clone(), t, body, binder_info.clone());
      },
      LocalDecl::LetHyp { user_name, typ, value, .. } => {
        let t = abstr(typ, &fvars[..i]);
        let v = abstr(value, &fvars[..i]);
        body = Expr::letE(user_name.clone(), t, v, body, false);
      },
    }
  }
  body
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kernel::env::{
    AxiomVal, ConstantInfo, ConstantVal, DefinitionVal, ReducibilityHints,
  };

  fn mk_name(s: &str) -> Name {
    Name::simple(s)
  }

  fn cst(s: &str) -> Expr {
    Expr::cnst(mk_name(s), vec![])
  }

  fn axiom(env: &mut Env, name: &str, typ: Expr) {
    env.insert(
      mk_name(name),
      ConstantInfo::AxiomInfo(AxiomVal {
        cnst: ConstantVal { name: mk_name(name), level_params: vec![], typ },
      }),
    );
  }

  fn defn(env: &mut Env, name: &str, typ: Expr, value: Expr) {
    env.insert(
      mk_name(name),
      ConstantInfo::DefnInfo(DefinitionVal {
        cnst: ConstantVal { name: mk_name(name), level_params: vec![], typ },
        value,
        hints: ReducibilityHints::Abbrev,
      }),
    );
  }

  /// Environment with Nat, True, Eq and the `Inhabited` class.
  fn mk_env() -> Env {
    let mut env = Env::new();
    let type1 = Expr::sort(Level::succ(Level::zero()));
    axiom(&mut env, "Nat", type1.clone());
    axiom(&mut env, "Nat.zero", cst("Nat"));
    axiom(&mut env, "True", Expr::sort(Level::zero()));
    axiom(&mut env, "Eq", type1.clone());
    axiom(&mut env, "Inhabited", type1);
    env.register_class(mk_name("Inhabited"));
    env
  }

  fn eq_app(a: Expr, b: Expr) -> Expr {
    Expr::app(Expr::app(cst("Eq"), a), b)
  }

  /// `∀ (a b : Nat), a = b → True`
  fn abc_goal_type() -> Expr {
    Expr::all(
      mk_name("a"),
      cst("Nat"),
      Expr::all(
        mk_name("b"),
        cst("Nat"),
        Expr::all(
          mk_name("h"),
          eq_app(Expr::bvar(1), Expr::bvar(0)),
          cst("True"),
          BinderInfo::Default,
        ),
        BinderInfo::Default,
      ),
      BinderInfo::Default,
    )
  }

  #[test]
  fn intro_n_peels_three_binders() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));

    let (fvar_ids, new_goal) = engine.intro_n(&goal, 3, &[], false).unwrap();

    assert_eq!(fvar_ids.len(), 3);
    assert_ne!(fvar_ids[0], fvar_ids[1]);
    assert_ne!(fvar_ids[1], fvar_ids[2]);
    assert_ne!(fvar_ids[0], fvar_ids[2]);

    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(new_decl.typ, cst("True"));
    assert_eq!(new_decl.tag, mk_name("main"));
    assert_eq!(new_decl.lctx.len(), 3);

    // The third hypothesis' type was instantiated with the first two ids.
    let names: Vec<_> =
      new_decl.lctx.decls().map(|d| d.user_name().clone()).collect();
    assert_eq!(names, vec![mk_name("a"), mk_name("b"), mk_name("h")]);
    let h = new_decl.lctx.get(&fvar_ids[2]).unwrap();
    assert_eq!(
      h.typ(),
      &eq_app(
        Expr::fvar(fvar_ids[0].clone()),
        Expr::fvar(fvar_ids[1].clone())
      )
    );

    // The original goal is assigned the closing term.
    let solution = engine.mctx.get_assignment(&goal).unwrap();
    let expected = Expr::lam(
      mk_name("a"),
      cst("Nat"),
      Expr::lam(
        mk_name("b"),
        cst("Nat"),
        Expr::lam(
          mk_name("h"),
          eq_app(Expr::bvar(1), Expr::bvar(0)),
          Expr::mvar(new_goal.clone()),
          BinderInfo::Default,
        ),
        BinderInfo::Default,
      ),
      BinderInfo::Default,
    );
    assert_eq!(solution, &expected);
  }

  #[test]
  fn closure_is_the_structural_inverse_of_peeling() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let original = abc_goal_type();
    let goal =
      engine.mk_goal(original.clone(), LocalContext::new(), mk_name("main"));
    let (fvar_ids, new_goal) = engine.intro_n(&goal, 3, &[], false).unwrap();

    // Re-abstract the residual type over the introduced fvars and rewrap
    // the binders: this must reproduce the original goal type.
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    let fvars: Vec<_> =
      fvar_ids.iter().map(|id| Expr::fvar(id.clone())).collect();
    let mut rebuilt = abstr(&new_decl.typ, &fvars);
    for (i, id) in fvar_ids.iter().enumerate().rev() {
      let d = new_decl.lctx.get(id).unwrap();
      let t = abstr(d.typ(), &fvars[..i]);
      rebuilt = match d {
        LocalDecl::Hyp { user_name, binder_info, .. } => Expr::all(
          user_name.clone(),
          t,
          rebuilt,
          binder_info.clone(),
        ),
        LocalDecl::LetHyp { user_name, value, .. } => Expr::letE(
          user_name.clone(),
          t,
          abstr(value, &fvars[..i]),
          rebuilt,
          false,
        ),
      };
    }
    assert_eq!(rebuilt, original);
  }

  #[test]
  fn intro_n_zero_is_a_noop_with_fresh_goal() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    let (fvar_ids, new_goal) = engine.intro_n(&goal, 0, &[], false).unwrap();

    assert!(fvar_ids.is_empty());
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(new_decl.typ, abc_goal_type());
    assert!(new_decl.lctx.is_empty());
    assert_eq!(new_decl.tag, mk_name("main"));
    assert_eq!(
      engine.mctx.get_assignment(&goal),
      Some(&Expr::mvar(new_goal))
    );
  }

  #[test]
  fn already_assigned_goal_fails_for_every_n() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    engine.mctx.assign(&goal, cst("True")).unwrap();

    for n in [0, 2] {
      let err = engine.intro_n(&goal, n, &[], false);
      assert!(
        matches!(err, Err(TacticError::AlreadyAssigned { .. })),
        "n = {n}"
      );
    }
  }

  #[test]
  fn unknown_goal_is_fatal() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let ghost = MVarId(mk_name("ghost"));
    let err = engine.intro_n(&ghost, 1, &[], false);
    assert!(matches!(err, Err(TacticError::UnknownMVar { .. })));
  }

  #[test]
  fn insufficient_binders_leaves_state_untouched() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal = engine.mk_goal(cst("Nat"), LocalContext::new(), mk_name("main"));
    let decls_before = engine.mctx.num_decls();

    let err = engine.intro_n(&goal, 1, &[], false);
    match err {
      Err(TacticError::InsufficientBinders { remaining, .. }) => {
        assert_eq!(remaining, cst("Nat"));
      },
      other => panic!("expected InsufficientBinders, got {other:?}"),
    }
    assert_eq!(engine.mctx.num_decls(), decls_before);
    assert_eq!(engine.mctx.num_assignments(), 0);
    assert!(!engine.mctx.is_assigned(&goal));
  }

  #[test]
  fn partial_telescope_fails_without_mutation() {
    // Two binders available, three requested.
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let ty = Expr::all(
      mk_name("a"),
      cst("Nat"),
      Expr::all(mk_name("b"), cst("Nat"), cst("True"), BinderInfo::Default),
      BinderInfo::Default,
    );
    let goal = engine.mk_goal(ty, LocalContext::new(), mk_name("main"));
    let err = engine.intro_n(&goal, 3, &[], false);
    match err {
      Err(TacticError::InsufficientBinders { remaining, .. }) => {
        assert_eq!(remaining, cst("True"));
      },
      other => panic!("expected InsufficientBinders, got {other:?}"),
    }
    assert!(!engine.mctx.is_assigned(&goal));
    assert_eq!(engine.mctx.num_assignments(), 0);
  }

  #[test]
  fn given_names_override_and_placeholder_autonames() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let ty = Expr::all(
      mk_name("a"),
      cst("Nat"),
      Expr::all(mk_name("b"), cst("Nat"), cst("True"), BinderInfo::Default),
      BinderInfo::Default,
    );
    let goal = engine.mk_goal(ty, LocalContext::new(), mk_name("main"));
    let names = [mk_name("foo"), Name::placeholder()];
    let (fvar_ids, new_goal) = engine.intro_n(&goal, 2, &names, false).unwrap();

    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(
      new_decl.lctx.get(&fvar_ids[0]).unwrap().user_name(),
      &mk_name("foo")
    );
    assert_eq!(
      new_decl.lctx.get(&fvar_ids[1]).unwrap().user_name(),
      &mk_name("b")
    );
  }

  #[test]
  fn name_list_length_must_match() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    let err = engine.intro_n(&goal, 2, &[mk_name("only")], false);
    assert!(matches!(err, Err(TacticError::NameCountMismatch { .. })));
  }

  #[test]
  fn auto_names_avoid_existing_hypotheses() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let mut lctx = LocalContext::new();
    let existing = engine.ngen.next_fvar_id();
    lctx
      .mk_hyp(existing, mk_name("a"), cst("Nat"), BinderInfo::Default)
      .unwrap();
    let ty =
      Expr::all(mk_name("a"), cst("Nat"), cst("True"), BinderInfo::Default);
    let goal = engine.mk_goal(ty, lctx, mk_name("main"));
    let (fvar_id, new_goal) = engine.intro1(&goal).unwrap();
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(
      new_decl.lctx.get(&fvar_id).unwrap().user_name(),
      &mk_name("a_1")
    );
  }

  #[test]
  fn disallow_unaccessible_renames_internal_binders() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let ty =
      Expr::all(mk_name("_h"), cst("Nat"), cst("True"), BinderInfo::Default);
    let goal = engine.mk_goal(ty.clone(), LocalContext::new(), mk_name("m"));
    let (fvar_ids, new_goal) = engine.intro_n(&goal, 1, &[], true).unwrap();
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(
      new_decl.lctx.get(&fvar_ids[0]).unwrap().user_name(),
      &mk_name("x")
    );

    // Without the flag, the inaccessible binder name is kept.
    let goal2 = engine.mk_goal(ty, LocalContext::new(), mk_name("m"));
    let (fvar_ids, new_goal) = engine.intro_n(&goal2, 1, &[], false).unwrap();
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(
      new_decl.lctx.get(&fvar_ids[0]).unwrap().user_name(),
      &mk_name("_h")
    );
  }

  #[test]
  fn whnf_unfolds_to_reach_binders() {
    let env = {
      let mut env = mk_env();
      // def NatImpTrue := ∀ (n : Nat), True
      defn(
        &mut env,
        "NatImpTrue",
        Expr::sort(Level::zero()),
        Expr::all(mk_name("n"), cst("Nat"), cst("True"), BinderInfo::Default),
      );
      env
    };
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(cst("NatImpTrue"), LocalContext::new(), mk_name("main"));
    let (fvar_id, new_goal) = engine.intro1(&goal).unwrap();
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(new_decl.typ, cst("True"));
    assert_eq!(new_decl.lctx.get(&fvar_id).unwrap().typ(), &cst("Nat"));
  }

  #[test]
  fn whnf_fallback_mid_telescope() {
    // ∀ (a : Nat), NatImpTrue — the second binder only appears after
    // unfolding, with a pending substitution in flight.
    let env = {
      let mut env = mk_env();
      defn(
        &mut env,
        "NatImpTrue",
        Expr::sort(Level::zero()),
        Expr::all(mk_name("n"), cst("Nat"), cst("True"), BinderInfo::Default),
      );
      env
    };
    let mut engine = IntroEngine::new(&env);
    let ty = Expr::all(
      mk_name("a"),
      cst("Nat"),
      cst("NatImpTrue"),
      BinderInfo::Default,
    );
    let goal = engine.mk_goal(ty, LocalContext::new(), mk_name("main"));
    let (fvar_ids, new_goal) = engine.intro_n(&goal, 2, &[], false).unwrap();
    assert_eq!(fvar_ids.len(), 2);
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(new_decl.typ, cst("True"));
  }

  #[test]
  fn let_binders_become_let_hypotheses() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    // let x : Nat := Nat.zero in x = Nat.zero → True
    let ty = Expr::letE(
      mk_name("x"),
      cst("Nat"),
      cst("Nat.zero"),
      Expr::all(
        mk_name("h"),
        eq_app(Expr::bvar(0), cst("Nat.zero")),
        cst("True"),
        BinderInfo::Default,
      ),
      false,
    );
    let goal = engine.mk_goal(ty, LocalContext::new(), mk_name("main"));
    let (fvar_ids, new_goal) = engine.intro_n(&goal, 2, &[], false).unwrap();

    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    let x = new_decl.lctx.get(&fvar_ids[0]).unwrap();
    assert!(x.is_let());
    assert_eq!(x.value(), Some(&cst("Nat.zero")));
    let h = new_decl.lctx.get(&fvar_ids[1]).unwrap();
    assert_eq!(
      h.typ(),
      &eq_app(Expr::fvar(fvar_ids[0].clone()), cst("Nat.zero"))
    );

    // The closing term wraps a let, not a lambda, for the first binder.
    let solution = engine.mctx.get_assignment(&goal).unwrap();
    let expected = Expr::letE(
      mk_name("x"),
      cst("Nat"),
      cst("Nat.zero"),
      Expr::lam(
        mk_name("h"),
        eq_app(Expr::bvar(0), cst("Nat.zero")),
        Expr::mvar(new_goal.clone()),
        BinderInfo::Default,
      ),
      false,
    );
    assert_eq!(solution, &expected);
  }

  #[test]
  fn instance_hypothesis_updates_cache() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    // [inst : Inhabited Nat] → True
    let ty = Expr::all(
      mk_name("inst"),
      Expr::app(cst("Inhabited"), cst("Nat")),
      cst("True"),
      BinderInfo::InstImplicit,
    );
    let goal = engine.mk_goal(ty, LocalContext::new(), mk_name("main"));
    engine.cache.record_synth(cst("probe"), None);

    let (fvar_id, new_goal) = engine.intro1(&goal).unwrap();

    assert_eq!(
      engine.cache.local_instances,
      vec![LocalInstance {
        class_name: mk_name("Inhabited"),
        fvar_id: fvar_id.clone(),
      }]
    );
    // Registering the instance invalidated the memoized resolutions.
    assert_eq!(engine.cache.synth_entries(), 0);
    // The new goal's declaration snapshots the grown instance set.
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(new_decl.local_instances.len(), 1);
    assert_eq!(new_decl.local_instances[0].fvar_id, fvar_id);
  }

  #[test]
  fn quick_unknown_falls_back_to_expensive_check() {
    let env = {
      let mut env = mk_env();
      // def InhabitedNat := Inhabited Nat — syntactically inconclusive.
      defn(
        &mut env,
        "InhabitedNat",
        Expr::sort(Level::succ(Level::zero())),
        Expr::app(cst("Inhabited"), cst("Nat")),
      );
      env
    };
    let mut engine = IntroEngine::new(&env);
    let ty = Expr::all(
      mk_name("inst"),
      cst("InhabitedNat"),
      cst("True"),
      BinderInfo::InstImplicit,
    );
    let goal = engine.mk_goal(ty, LocalContext::new(), mk_name("main"));
    let (fvar_id, _) = engine.intro1(&goal).unwrap();
    assert_eq!(engine.cache.local_instances.len(), 1);
    assert_eq!(engine.cache.local_instances[0].class_name, mk_name("Inhabited"));
    assert_eq!(engine.cache.local_instances[0].fvar_id, fvar_id);
  }

  #[test]
  fn matching_instance_snapshot_keeps_memo() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    // The goal snapshots the cache's current (empty) instance set, so the
    // guard's fast path applies and the memo survives an n = 0 call.
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    engine.cache.record_synth(cst("probe"), None);
    engine.intro_n(&goal, 0, &[], false).unwrap();
    assert_eq!(engine.cache.synth_entries(), 1);
  }

  #[test]
  fn drifted_instance_snapshot_forces_reset() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    // Another branch of the proof grew the cache since the goal was made.
    engine.cache.push_instance(LocalInstance {
      class_name: mk_name("Inhabited"),
      fvar_id: FVarId(mk_name("elsewhere")),
    });
    engine.cache.record_synth(cst("probe"), None);

    engine.intro_n(&goal, 0, &[], false).unwrap();

    // The cache was re-anchored to the goal's (empty) snapshot.
    assert!(engine.cache.local_instances.is_empty());
    assert_eq!(engine.cache.synth_entries(), 0);
  }

  #[test]
  fn intro_returns_the_given_name() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    let (fvar_id, new_goal) = engine.intro(&goal, mk_name("hyp")).unwrap();
    let new_decl = engine.mctx.get_decl(&new_goal).unwrap();
    assert_eq!(
      new_decl.lctx.get(&fvar_id).unwrap().user_name(),
      &mk_name("hyp")
    );
  }

  #[test]
  fn repeated_intro1_walks_the_telescope() {
    let env = mk_env();
    let mut engine = IntroEngine::new(&env);
    let mut goal =
      engine.mk_goal(abc_goal_type(), LocalContext::new(), mk_name("main"));
    let mut ids = Vec::new();
    for _ in 0..3 {
      let (fvar_id, next) = engine.intro1(&goal).unwrap();
      ids.push(fvar_id);
      goal = next;
    }
    let final_decl = engine.mctx.get_decl(&goal).unwrap();
    assert_eq!(final_decl.typ, cst("True"));
    assert_eq!(final_decl.lctx.len(), 3);
    let err = engine.intro1(&goal);
    assert!(matches!(err, Err(TacticError::InsufficientBinders { .. })));
  }
}
