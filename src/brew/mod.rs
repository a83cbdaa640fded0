//! Brewing core: options, groups and their dose tables.
//!
//! ```text
//!   Machine ──owns──▶ BrewGroup ×2 ──owns──▶ BrewOption ×5
//!                          │
//!                          └──▶ &'static FlowMeter
//! ```
//!
//! Children never hold pointers to their parents.  An option knows its
//! [`GroupId`]; a group hands requests for shared resources to the
//! machine's [`Plant`](crate::machine::plant::Plant), which is passed in
//! by `&mut` on every call.

pub mod dosage;
pub mod group;
pub mod option;

use core::fmt;

/// Number of brew groups on the machine.
pub const GROUP_COUNT: usize = 2;
/// Options per group, continuous option included.
pub const OPTIONS_PER_GROUP: usize = 5;
/// Options with a dose target.
pub const TIMED_OPTIONS: usize = OPTIONS_PER_GROUP - 1;
/// Slot of the continuous option.
pub const CONTINUOUS_INDEX: usize = OPTIONS_PER_GROUP - 1;

/// Identity of a brew group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupId {
    One,
    Two,
}

impl GroupId {
    pub const ALL: [GroupId; GROUP_COUNT] = [GroupId::One, GroupId::Two];

    /// Zero-based slot in per-group arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// Operator-facing group number (1 or 2).
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Bit in a per-group bitmask.
    pub const fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
