// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Readiness operation bitmask.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Set of I/O operations a selection key can be interested in or ready for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Ops(u32);

impl Ops {
    /// No operations
    pub const NONE: Ops = Ops(0);
    /// Channel has a datagram to read
    pub const READ: Ops = Ops(1 << 0);
    /// Channel can accept a datagram for sending
    pub const WRITE: Ops = Ops(1 << 2);
    /// Connection-oriented channel finished connecting
    pub const CONNECT: Ops = Ops(1 << 3);
    /// Listening channel has a pending connection
    pub const ACCEPT: Ops = Ops(1 << 4);

    const ALL_BITS: u32 = Self::READ.0 | Self::WRITE.0 | Self::CONNECT.0 | Self::ACCEPT.0;

    /// Build from raw bits; unknown bits are kept so validation can reject them.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Ops(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, other: Ops) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Ops) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether every bit of `self` is also in `allowed`.
    #[must_use]
    pub const fn is_subset_of(self, allowed: Ops) -> bool {
        self.0 & !allowed.0 == 0
    }

    /// Whether all bits name a known operation.
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.0 & !Self::ALL_BITS == 0
    }
}

impl BitOr for Ops {
    type Output = Ops;

    fn bitor(self, rhs: Ops) -> Ops {
        Ops(self.0 | rhs.0)
    }
}

impl BitOrAssign for Ops {
    fn bitor_assign(&mut self, rhs: Ops) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Ops {
    type Output = Ops;

    fn bitand(self, rhs: Ops) -> Ops {
        Ops(self.0 & rhs.0)
    }
}

impl Not for Ops {
    type Output = Ops;

    fn not(self) -> Ops {
        Ops(!self.0 & Self::ALL_BITS)
    }
}

impl fmt::Display for Ops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Ops::READ, "READ"),
            (Ops::WRITE, "WRITE"),
            (Ops::CONNECT, "CONNECT"),
            (Ops::ACCEPT, "ACCEPT"),
        ];
        let mut first = true;
        for (op, name) in names {
            if self.contains(op) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if !self.is_known() {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{:#x}", self.0 & !Self::ALL_BITS)?;
            first = false;
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}
