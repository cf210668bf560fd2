//! Device lifecycle state machine
//!
//! Tracks the plug-and-play state of one device instance from first
//! attachment to final deletion. Transitions are driven by PnP minor
//! operations; the host serializes those per device, so the state pair needs
//! no lock of its own beyond the mutex the device context wraps it in.
//!
//! Provisional transitions (query stop/remove) save the current state so the
//! matching cancel can roll back; the rollback slot is part of the transition
//! table rather than ad hoc field mutation.

use thiserror::Error;

/// Lifecycle stages of a device instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PnpState {
    /// Device context exists but bring-up has not succeeded yet
    #[default]
    NotStarted,
    /// Fully configured and accepting work
    Started,
    /// A stop was queried; new work is held off, hardware still configured
    StopPending,
    /// Stopped after a successful query
    Stopped,
    /// A removal was queried; provisional like `StopPending`
    RemovePending,
    /// The device vanished without warning; no hardware teardown possible
    SurpriseRemovePending,
    /// Terminal. Every subsequent operation fails with "no such device".
    Deleted,
}

/// PnP minor operations the dispatch layer routes here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnpMinor {
    StartDevice,
    QueryStopDevice,
    CancelStopDevice,
    StopDevice,
    QueryRemoveDevice,
    CancelRemoveDevice,
    SurpriseRemoval,
    RemoveDevice,
    /// Anything else passes through to the lower stack untouched
    Other(u8),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No saved state to roll back to")]
    NoSavedState,
    #[error("Device already deleted")]
    AlreadyDeleted,
    #[error("{0:?} is not a lifecycle transition")]
    NotATransition(PnpMinor),
}

/// How a minor operation affects the state pair
enum Step {
    Advance(PnpState),
    AdvanceSaving(PnpState),
    Rollback,
}

/// The `{state, saved}` pair for one device
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: PnpState,
    saved: Option<PnpState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle::default()
    }

    pub fn state(&self) -> PnpState {
        self.state
    }

    /// The state saved by the last provisional or final transition
    pub fn previous(&self) -> Option<PnpState> {
        self.saved
    }

    fn plan(minor: PnpMinor) -> Result<Step, TransitionError> {
        match minor {
            PnpMinor::StartDevice => Ok(Step::Advance(PnpState::Started)),
            PnpMinor::QueryStopDevice => Ok(Step::AdvanceSaving(PnpState::StopPending)),
            PnpMinor::QueryRemoveDevice => Ok(Step::AdvanceSaving(PnpState::RemovePending)),
            PnpMinor::CancelStopDevice | PnpMinor::CancelRemoveDevice => Ok(Step::Rollback),
            PnpMinor::StopDevice => Ok(Step::Advance(PnpState::Stopped)),
            PnpMinor::SurpriseRemoval => Ok(Step::Advance(PnpState::SurpriseRemovePending)),
            PnpMinor::RemoveDevice => Ok(Step::AdvanceSaving(PnpState::Deleted)),
            PnpMinor::Other(code) => Err(TransitionError::NotATransition(PnpMinor::Other(code))),
        }
    }

    /// Apply one minor operation, returning the new state
    pub fn apply(&mut self, minor: PnpMinor) -> Result<PnpState, TransitionError> {
        if self.state == PnpState::Deleted {
            return Err(TransitionError::AlreadyDeleted);
        }
        match Self::plan(minor)? {
            Step::Advance(next) => {
                self.state = next;
            }
            Step::AdvanceSaving(next) => {
                self.saved = Some(self.state);
                self.state = next;
            }
            Step::Rollback => {
                let saved = self.saved.take().ok_or(TransitionError::NoSavedState)?;
                self.state = saved;
            }
        }
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_not_started() {
        assert_eq!(Lifecycle::new().state(), PnpState::NotStarted);
    }

    #[test]
    fn test_start_advances_to_started() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.apply(PnpMinor::StartDevice), Ok(PnpState::Started));
    }

    #[test]
    fn test_query_stop_saves_and_cancel_restores() {
        let mut lc = Lifecycle::new();
        lc.apply(PnpMinor::StartDevice).unwrap();
        assert_eq!(lc.apply(PnpMinor::QueryStopDevice), Ok(PnpState::StopPending));
        assert_eq!(lc.previous(), Some(PnpState::Started));
        assert_eq!(lc.apply(PnpMinor::CancelStopDevice), Ok(PnpState::Started));
    }

    #[test]
    fn test_query_remove_then_remove() {
        let mut lc = Lifecycle::new();
        lc.apply(PnpMinor::StartDevice).unwrap();
        lc.apply(PnpMinor::QueryRemoveDevice).unwrap();
        assert_eq!(lc.apply(PnpMinor::RemoveDevice), Ok(PnpState::Deleted));
        assert_eq!(lc.previous(), Some(PnpState::RemovePending));
    }

    #[test]
    fn test_surprise_removal_then_remove() {
        let mut lc = Lifecycle::new();
        lc.apply(PnpMinor::StartDevice).unwrap();
        lc.apply(PnpMinor::SurpriseRemoval).unwrap();
        assert_eq!(lc.state(), PnpState::SurpriseRemovePending);
        lc.apply(PnpMinor::RemoveDevice).unwrap();
        // Remove must see that the device surprise-vanished beforehand.
        assert_eq!(lc.previous(), Some(PnpState::SurpriseRemovePending));
    }

    #[test]
    fn test_deleted_is_terminal() {
        let mut lc = Lifecycle::new();
        lc.apply(PnpMinor::RemoveDevice).unwrap();
        assert_eq!(
            lc.apply(PnpMinor::StartDevice),
            Err(TransitionError::AlreadyDeleted)
        );
    }

    #[test]
    fn test_cancel_without_query_is_rejected() {
        let mut lc = Lifecycle::new();
        assert_eq!(
            lc.apply(PnpMinor::CancelRemoveDevice),
            Err(TransitionError::NoSavedState)
        );
    }

    #[test]
    fn test_unrecognized_minor_is_not_a_transition() {
        let mut lc = Lifecycle::new();
        assert!(matches!(
            lc.apply(PnpMinor::Other(0x42)),
            Err(TransitionError::NotATransition(_))
        ));
        assert_eq!(lc.state(), PnpState::NotStarted);
    }
}
