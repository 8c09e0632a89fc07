//! Per-node flag bits: three paint colours and a visited marker.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Flag set carried by every [`CommitNode`](crate::CommitNode).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeFlags(u32);

impl NodeFlags {
    pub const NONE: Self = Self(0);
    pub const RED: Self = Self(1);
    pub const GREEN: Self = Self(1 << 1);
    pub const BLUE: Self = Self(1 << 2);
    /// Reached from both the red and the green tips.
    pub const YELLOW: Self = Self(Self::RED.0 | Self::GREEN.0);
    /// All three colours.
    pub const WHITE: Self = Self(Self::RED.0 | Self::GREEN.0 | Self::BLUE.0);
    /// Visited marker used by [`visit_commits`](crate::CommitGraph::visit_commits).
    pub const SEEN: Self = Self(1 << 4);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Only the colour bits.
    pub const fn colors(self) -> Self {
        Self(self.0 & Self::WHITE.0)
    }

    pub const fn is_white(self) -> bool {
        self.contains(Self::WHITE)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for NodeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for NodeFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for NodeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::RED, "RED"),
            (Self::GREEN, "GREEN"),
            (Self::BLUE, "BLUE"),
            (Self::SEEN, "SEEN"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "NodeFlags(NONE)")
        } else {
            write!(f, "NodeFlags({})", set.join("|"))
        }
    }
}
