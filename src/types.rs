//! Type-safe wrappers for KFDD variables, levels and decomposition types.
//!
//! Variable labels are stable across reordering, levels (positions in the
//! order) are not. Every variable additionally carries a decomposition type
//! that decides how its nodes are read.
use std::fmt;

/// A variable label (1-indexed).
///
/// # Invariants
///
/// - Labels must be >= 1 (0 is reserved for the terminal)
/// - Labels are independent of their position in the variable ordering
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given label.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Returns the raw label as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Index of the variable in 0-based per-variable tables.
    pub(crate) fn slot(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A position in the variable ordering (0-indexed, 0 is the top).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(usize);

impl Level {
    pub fn new(index: usize) -> Self {
        Level(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Returns the next level down (index + 1).
    pub fn next(self) -> Self {
        Level(self.0 + 1)
    }

    /// Returns the previous level up, or None at the top.
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<usize> for Level {
    fn from(index: usize) -> Self {
        Level(index)
    }
}

/// Decomposition type of a variable.
///
/// With `l` the low child and `h` the high child of a node labelled `x`:
///
/// ```text
/// Shannon:         f = ~x·l ⊕ x·h
/// Positive Davio:  f = l ⊕ x·h
/// Negative Davio:  f = l ⊕ ~x·h
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DecompositionType {
    #[default]
    Shannon,
    PositiveDavio,
    NegativeDavio,
}

impl DecompositionType {
    pub const ALL: [DecompositionType; 3] = [
        DecompositionType::Shannon,
        DecompositionType::PositiveDavio,
        DecompositionType::NegativeDavio,
    ];

    pub fn is_davio(self) -> bool {
        !matches!(self, DecompositionType::Shannon)
    }

    /// Numeric code: 0 for Shannon, 1 for positive Davio, 2 for negative Davio.
    pub fn index(self) -> usize {
        match self {
            DecompositionType::Shannon => 0,
            DecompositionType::PositiveDavio => 1,
            DecompositionType::NegativeDavio => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Single-letter code used by the order file: `S`, `P` or `N`.
    pub fn code(self) -> char {
        match self {
            DecompositionType::Shannon => 'S',
            DecompositionType::PositiveDavio => 'P',
            DecompositionType::NegativeDavio => 'N',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'S' => Some(DecompositionType::Shannon),
            'P' => Some(DecompositionType::PositiveDavio),
            'N' => Some(DecompositionType::NegativeDavio),
            _ => None,
        }
    }
}

impl fmt::Display for DecompositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
