use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// A reference to a KFDD node, potentially complemented.
///
/// Uses a 32-bit representation where the least significant bit is the
/// complement flag and the remaining bits store the node index.
/// Index 0 is the single terminal node: [`Ref::ONE`] is the terminal itself,
/// [`Ref::ZERO`] is its complement.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    /// Constant true.
    pub const ONE: Self = Self(0);
    /// Constant false.
    pub const ZERO: Self = Self(1);

    /// Creates a new reference with the given node index and complement flag.
    pub const fn new(index: u32, negated: bool) -> Self {
        Self((index << 1) | negated as u32)
    }

    /// Creates a regular (non-complemented) reference.
    pub const fn positive(index: u32) -> Self {
        Self::new(index, false)
    }

    /// Returns the node index this reference points to.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0 >> 1
    }

    /// Returns true if this reference is complemented.
    #[inline]
    pub const fn is_negated(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Returns true for [`Ref::ONE`] and [`Ref::ZERO`].
    #[inline]
    pub const fn is_terminal(self) -> bool {
        self.index() == 0
    }

    /// Returns the same reference with the complement bit cleared.
    #[inline]
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }

    /// Complements the reference when `cond` holds.
    #[inline]
    pub const fn negate_if(self, cond: bool) -> Self {
        Self(self.0 ^ cond as u32)
    }

    /// Returns the raw underlying value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

// -Ref
impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminals() {
        assert!(Ref::ONE.is_terminal());
        assert!(Ref::ZERO.is_terminal());
        assert_eq!(-Ref::ONE, Ref::ZERO);
        assert_eq!(-Ref::ZERO, Ref::ONE);
        assert!(!Ref::ONE.is_negated());
        assert!(Ref::ZERO.is_negated());
    }

    #[test]
    fn test_encoding() {
        let r = Ref::new(5, true);
        assert_eq!(r.index(), 5);
        assert!(r.is_negated());
        assert_eq!(r.raw(), 11);
        assert_eq!(r.regular(), Ref::positive(5));
        assert_eq!(r.negate_if(false), r);
        assert_eq!(r.negate_if(true), Ref::positive(5));
        assert!(!r.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::positive(3).to_string(), "@3");
        assert_eq!((-Ref::positive(3)).to_string(), "~@3");
        assert_eq!(Ref::ZERO.to_string(), "~@0");
    }
}
