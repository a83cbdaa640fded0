//! Outbound machine events.
//!
//! The [`Machine`](crate::machine::Machine) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::brew::dosage::Dose;
use crate::brew::GroupId;

/// Why a brew ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The operator pressed the brewing option again.
    Operator,
    /// Flow pulses reached the dose target.
    FlowTarget,
    /// Flow meter stayed silent for the whole dose duration.
    NoFlowTimeout,
    /// Dose duration exceeded by the safety factor.
    SafetyTimeout,
    /// The group left programming mode mid-brew.
    ProgrammingAborted,
}

/// Structured events emitted by the brewing core.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Setup finished; outputs are in their safe state.
    Started,

    BrewStarted {
        group: GroupId,
        option: usize,
    },

    BrewStopped {
        group: GroupId,
        option: usize,
        reason: StopReason,
        elapsed_ms: u32,
        pulses: u32,
    },

    /// A machine-wide programming session began.
    ProgrammingEntered { by: GroupId },

    /// One group left programming mode.
    ProgrammingExited { group: GroupId },

    /// An option learned a new dose in programming mode.
    DoseLearned {
        group: GroupId,
        option: usize,
        dose: Dose,
    },

    /// A fully programmed group's dose table was copied into another group.
    DosesCopied { from: GroupId, to: GroupId },

    BoilerFillStarted,

    BoilerFillStopped { duration_ms: u32 },

    /// A dose record could not be loaded or saved; defaults / RAM copy in use.
    StorageFault { group: GroupId },
}
