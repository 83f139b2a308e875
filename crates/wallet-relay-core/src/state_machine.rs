use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Validated,
    AutoApproved,
    Pending,
    Approved,
    Denied,
    Executed,
    Replied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    Validate,
    AutoApprove,
    AwaitApproval,
    Grant,
    Deny,
    Execute,
    Reply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: DispatchState,
    pub to: DispatchState,
    pub reason: &'static str,
}

impl DispatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Replied)
    }
}

pub fn dispatch_transition(
    state: DispatchState,
    action: DispatchAction,
) -> Result<(DispatchState, StateTransition), PortError> {
    use DispatchAction as A;
    use DispatchState as S;

    let (to, reason) = match (state, action) {
        (S::Received, A::Validate) => (S::Validated, "params_valid"),
        (S::Received, A::Reply) => (S::Replied, "rejected_at_parse"),
        (S::Validated, A::Reply) => (S::Replied, "rejected_at_validation"),
        (S::Validated, A::AutoApprove) => (S::AutoApproved, "no_approval_required"),
        (S::Validated, A::AwaitApproval) => (S::Pending, "approval_required"),
        (S::Pending, A::Grant) => (S::Approved, "user_approved"),
        (S::Pending, A::Deny) => (S::Denied, "user_denied"),
        (S::AutoApproved | S::Approved, A::Execute) => (S::Executed, "executed"),
        (S::Denied | S::Executed, A::Reply) => (S::Replied, "replied"),
        _ => {
            return Err(PortError::Conflict(format!(
                "illegal dispatch transition: {state:?} --{action:?}-->"
            )))
        }
    };

    Ok((
        to,
        StateTransition {
            from: state,
            to,
            reason,
        },
    ))
}

/// Folds a recorded action trail from `Received` without touching any port.
pub fn replay(actions: &[DispatchAction]) -> Result<DispatchState, PortError> {
    actions
        .iter()
        .try_fold(DispatchState::Received, |state, action| {
            dispatch_transition(state, *action).map(|(next, _)| next)
        })
}
