//! Reversible circuits over NOT, CNOT and Toffoli gates.

use std::fmt::{Display, Formatter};

/// A multiple-controlled Toffoli gate: the target line is flipped when all
/// control lines are 1.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Gate {
    pub controls: Vec<usize>,
    pub target: usize,
}

// Constructors
impl Gate {
    pub fn not(target: usize) -> Gate {
        Gate {
            controls: Vec::new(),
            target,
        }
    }

    pub fn cnot(control: usize, target: usize) -> Gate {
        Gate {
            controls: vec![control],
            target,
        }
    }

    pub fn toffoli(a: usize, b: usize, target: usize) -> Gate {
        Gate {
            controls: vec![a, b],
            target,
        }
    }
}

// Getters
impl Gate {
    /// NCV quantum cost: 1 for NOT and CNOT, 5 for Toffoli, `2^(n+1) - 3` beyond.
    pub fn quantum_cost(&self) -> usize {
        match self.controls.len() {
            0 | 1 => 1,
            n => (1 << (n + 1)) - 3,
        }
    }

    pub fn apply(&self, state: &mut [bool]) {
        if self.controls.iter().all(|&c| state[c]) {
            state[self.target] = !state[self.target];
        }
    }
}

impl Display for Gate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.controls.len() + 1)?;
        for c in &self.controls {
            write!(f, " {}", c)?;
        }
        write!(f, " {}", self.target)
    }
}

/// Line metadata plus an ordered gate list.
///
/// Line `i` starts with the value of input `i`, or with `constants[i]` when
/// that is set. `garbage[i]` marks lines whose final value is of no interest.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Circuit {
    pub lines: usize,
    pub gates: Vec<Gate>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub constants: Vec<Option<bool>>,
    pub garbage: Vec<bool>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and return its index.
    ///
    /// The line is a garbage output named `g` until [`Circuit::set_output`] is called on it.
    pub fn add_line(&mut self, input: impl Into<String>, constant: Option<bool>) -> usize {
        self.inputs.push(input.into());
        self.constants.push(constant);
        self.outputs.push("g".to_string());
        self.garbage.push(true);
        self.lines += 1;
        self.lines - 1
    }

    pub fn set_output(&mut self, line: usize, name: impl Into<String>) {
        self.outputs[line] = name.into();
        self.garbage[line] = false;
    }

    pub fn push(&mut self, gate: Gate) {
        debug_assert!(gate.target < self.lines && gate.controls.iter().all(|&c| c < self.lines));
        debug_assert!(!gate.controls.contains(&gate.target));
        self.gates.push(gate);
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn quantum_cost(&self) -> usize {
        self.gates.iter().map(Gate::quantum_cost).sum()
    }

    /// Lines that are not constant, in line order.
    pub fn primary_lines(&self) -> Vec<usize> {
        (0..self.lines).filter(|&i| self.constants[i].is_none()).collect()
    }

    /// Run the circuit gate by gate, for checking a synthesized circuit against
    /// its diagram. `values` holds the start values of the non-constant lines,
    /// in line order. Returns the final value of every line.
    pub fn simulate(&self, values: &[bool]) -> Vec<bool> {
        let mut values = values.iter().copied();
        let mut state: Vec<bool> = self
            .constants
            .iter()
            .map(|c| c.unwrap_or_else(|| values.next().unwrap_or(false)))
            .collect();
        for gate in &self.gates {
            gate.apply(&mut state);
        }
        state
    }

    /// Line carrying the output `name`.
    pub fn output_line(&self, name: &str) -> Option<usize> {
        (0..self.lines).find(|&i| !self.garbage[i] && self.outputs[i] == name)
    }
}

impl Display for Circuit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, ".numvars {}", self.lines)?;
        writeln!(f, ".inputs {}", self.inputs.join(" "))?;
        writeln!(f, ".outputs {}", self.outputs.join(" "))?;
        let constants: String = self
            .constants
            .iter()
            .map(|c| match c {
                Some(true) => '1',
                Some(false) => '0',
                None => '-',
            })
            .collect();
        writeln!(f, ".constants {}", constants)?;
        let garbage: String = self.garbage.iter().map(|&g| if g { '1' } else { '-' }).collect();
        writeln!(f, ".garbage {}", garbage)?;
        writeln!(f, ".begin")?;
        for gate in &self.gates {
            writeln!(f, "{}", gate)?;
        }
        write!(f, ".end")
    }
}
