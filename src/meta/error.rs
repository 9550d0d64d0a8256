use crate::kernel::expr::{Expr, FVarId, MVarId, Name};

pub type TacticResult<T> = Result<T, TacticError>;

#[derive(Debug)]
pub enum TacticError {
  /// The goal metavariable already has a solution; introduction is
  /// meaningless. Never retried.
  AlreadyAssigned {
    mvar_id: MVarId,
    tactic: Name,
  },
  /// Fewer binders are available than requested, even after repeated weak
  /// head normalization. Carries the unreducible residual type.
  InsufficientBinders {
    mvar_id: MVarId,
    remaining: Expr,
  },
  /// The goal metavariable's declaration could not be fetched. Malformed or
  /// stale state; fatal rather than recoverable.
  UnknownMVar {
    mvar_id: MVarId,
  },
  /// A metavariable was assigned twice. Caller misuse; the intro engine
  /// checks before assigning.
  ReassignedMVar {
    mvar_id: MVarId,
  },
  /// A free variable id was declared twice in one local context.
  DuplicateFVar {
    fvar_id: FVarId,
  },
  /// The explicit name list does not match the number of requested binders.
  NameCountMismatch {
    expected: usize,
    given: usize,
  },
}

impl std::fmt::Display for TacticError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TacticError::AlreadyAssigned { mvar_id, tactic } => write!(
        f,
        "tactic '{}' failed, metavariable '{}' is already assigned",
        tactic.pretty(),
        mvar_id.pretty()
      ),
      TacticError::InsufficientBinders { mvar_id, .. } => write!(
        f,
        "tactic 'introN' failed, insufficient number of binders at '{}'",
        mvar_id.pretty()
      ),
      TacticError::UnknownMVar { mvar_id } => {
        write!(f, "unknown metavariable '{}'", mvar_id.pretty())
      },
      TacticError::ReassignedMVar { mvar_id } => {
        write!(f, "metavariable '{}' assigned twice", mvar_id.pretty())
      },
      TacticError::DuplicateFVar { fvar_id } => {
        write!(f, "duplicate local declaration '{}'", fvar_id.pretty())
      },
      TacticError::NameCountMismatch { expected, given } => write!(
        f,
        "expected {} hypothesis names, got {}",
        expected, given
      ),
    }
  }
}

impl std::error::Error for TacticError {}
