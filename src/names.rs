//! Primary inputs and outputs by name.

use std::collections::HashMap;

use crate::error::{KfddError, Result};
use crate::reference::Ref;
use crate::types::Var;

/// Name tables for primary inputs (name → label) and primary outputs
/// (name → root). Output roots are owned: the table holds one reference on
/// each of them.
#[derive(Debug, Clone, Default)]
pub struct Primaries {
    inputs: Vec<(String, Var)>,
    input_index: HashMap<String, usize>,
    outputs: Vec<(String, Ref)>,
    output_index: HashMap<String, usize>,
    limit: usize,
    name_limit: usize,
}

impl Primaries {
    pub fn new(limit: usize, name_limit: usize) -> Self {
        Self {
            limit,
            name_limit,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check a new name against the length limit, duplicates and the table size.
    pub fn check_new(&self, name: &str) -> Result<()> {
        if name.len() > self.name_limit {
            return Err(KfddError::NameLength {
                name: name.to_string(),
                limit: self.name_limit,
            });
        }
        if self.input_index.contains_key(name) || self.output_index.contains_key(name) {
            return Err(KfddError::PrimaryExists(name.to_string()));
        }
        if self.len() >= self.limit {
            return Err(KfddError::PrimaryLimit(self.limit));
        }
        Ok(())
    }

    pub fn add_input(&mut self, name: &str, var: Var) -> Result<()> {
        self.check_new(name)?;
        self.input_index.insert(name.to_string(), self.inputs.len());
        self.inputs.push((name.to_string(), var));
        Ok(())
    }

    /// Register an output. The caller hands one reference on `root` to the table.
    pub fn add_output(&mut self, name: &str, root: Ref) -> Result<()> {
        self.check_new(name)?;
        self.output_index.insert(name.to_string(), self.outputs.len());
        self.outputs.push((name.to_string(), root));
        Ok(())
    }

    /// Unregister an output and hand its reference back to the caller.
    pub fn remove_output(&mut self, name: &str) -> Result<Ref> {
        let index = self
            .output_index
            .remove(name)
            .ok_or_else(|| KfddError::OutputMissing(name.to_string()))?;
        let (_, root) = self.outputs.remove(index);
        for i in self.output_index.values_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        Ok(root)
    }

    pub fn input(&self, name: &str) -> Option<Var> {
        self.input_index.get(name).map(|&i| self.inputs[i].1)
    }

    pub fn output(&self, name: &str) -> Option<Ref> {
        self.output_index.get(name).map(|&i| self.outputs[i].1)
    }

    pub fn input_name(&self, var: Var) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(_, v)| *v == var)
            .map(|(name, _)| name.as_str())
    }

    pub fn inputs(&self) -> &[(String, Var)] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[(String, Ref)] {
        &self.outputs
    }

    /// Rewrite every output root, e.g. after a complement switch pass.
    pub fn update_outputs(&mut self, mut f: impl FnMut(Ref) -> Ref) {
        for (_, root) in &mut self.outputs {
            *root = f(*root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        let mut p = Primaries::new(2, 4);
        p.add_input("a", Var::new(1)).unwrap();
        assert!(matches!(p.add_input("a", Var::new(2)), Err(KfddError::PrimaryExists(_))));
        assert!(matches!(p.add_input("abcde", Var::new(2)), Err(KfddError::NameLength { .. })));
        p.add_output("f", Ref::ONE).unwrap();
        assert!(matches!(p.add_input("b", Var::new(2)), Err(KfddError::PrimaryLimit(2))));
    }

    #[test]
    fn test_outputs() {
        let mut p = Primaries::new(10, 50);
        p.add_output("f", Ref::positive(3)).unwrap();
        p.add_output("g", Ref::positive(4)).unwrap();
        assert_eq!(p.output("g"), Some(Ref::positive(4)));
        assert_eq!(p.remove_output("f").unwrap(), Ref::positive(3));
        assert_eq!(p.output("g"), Some(Ref::positive(4)));
        assert!(matches!(p.remove_output("f"), Err(KfddError::OutputMissing(_))));

        p.update_outputs(|r| -r);
        assert_eq!(p.output("g"), Some(-Ref::positive(4)));
    }
}
