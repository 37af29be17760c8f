//! The `.order` file: variable order and decomposition types, top to bottom.
//!
//! ```text
//! .order
//! 0 a S
//! 1 b P
//! 2 c N
//! .end
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::{KfddError, Result};
use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::types::{DecompositionType, Var};

fn order_error(line: usize, message: impl Into<String>) -> KfddError {
    KfddError::OrderFile {
        line,
        message: message.into(),
    }
}

impl Kfdd {
    /// Variable with the given primary name, or with the default name `x<label>`.
    pub fn var_by_name(&self, name: &str) -> Option<Var> {
        if let Some(var) = self.input_label(name) {
            return Some(var);
        }
        let label: u32 = name.strip_prefix('x')?.parse().ok()?;
        let var = (1..=self.num_vars() as u32).contains(&label).then(|| Var::new(label))?;
        (self.input_name(var) == name).then_some(var)
    }

    /// Write the current order and decomposition types.
    pub fn dump_order(&self, mut writer: impl Write) -> Result<()> {
        writeln!(writer, ".order")?;
        for (position, var) in self.order().into_iter().enumerate() {
            writeln!(writer, "{} {} {}", position, self.input_name(var), self.decomposition(var))?;
        }
        writeln!(writer, ".end")?;
        Ok(())
    }

    pub fn dump_order_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dump_order(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read an order file and move the diagram into the order and
    /// decomposition types it describes.
    ///
    /// The whole file is validated before anything changes. Handles in
    /// `roots` and the registered outputs are kept up to date.
    pub fn read_order(&self, reader: impl BufRead, roots: &mut [Ref]) -> Result<()> {
        let n = self.num_vars();
        let mut entries: HashMap<usize, (Var, DecompositionType)> = HashMap::new();
        let mut seen = vec![false; n];
        let mut state = 0; // 0: before .order, 1: entries, 2: after .end

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let number = i + 1;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            match (state, text) {
                (0, ".order") => state = 1,
                (0, _) => return Err(order_error(number, "expected '.order'")),
                (1, ".end") => state = 2,
                (1, _) => {
                    let fields: Vec<&str> = text.split_whitespace().collect();
                    let [position, name, dtl] = fields[..] else {
                        return Err(order_error(number, "expected '<position> <name> <S|P|N>'"));
                    };
                    let position: usize = position
                        .parse()
                        .map_err(|_| order_error(number, format!("invalid position '{}'", position)))?;
                    if position >= n {
                        return Err(order_error(number, format!("position {} out of range", position)));
                    }
                    let var = self
                        .var_by_name(name)
                        .ok_or_else(|| order_error(number, format!("unknown variable '{}'", name)))?;
                    let mut chars = dtl.chars();
                    let dtl = match (chars.next(), chars.next()) {
                        (Some(c), None) => DecompositionType::from_code(c),
                        _ => None,
                    }
                    .ok_or_else(|| order_error(number, format!("invalid decomposition type '{}'", dtl)))?;
                    if seen[var.slot()] {
                        return Err(order_error(number, format!("variable '{}' listed twice", name)));
                    }
                    if entries.insert(position, (var, dtl)).is_some() {
                        return Err(order_error(number, format!("position {} listed twice", position)));
                    }
                    seen[var.slot()] = true;
                }
                _ => return Err(order_error(number, "unexpected content after '.end'")),
            }
        }
        if state != 2 {
            return Err(order_error(0, "missing '.end'"));
        }
        if entries.len() != n {
            return Err(order_error(0, format!("{} of {} variables listed", entries.len(), n)));
        }

        let (order, dtl): (Vec<Var>, Vec<DecompositionType>) = (0..n).map(|p| entries[&p]).unzip();
        debug!("read_order: {:?}", order);
        self.establish_order(&order);
        for (&var, &d) in order.iter().zip(&dtl) {
            self.change_decomposition(var, d, roots);
        }
        Ok(())
    }

    pub fn read_order_from_path(&self, path: impl AsRef<Path>, roots: &mut [Ref]) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        self.read_order(reader, roots)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Level;

    fn manager() -> (Kfdd, Vec<Ref>) {
        let kfdd = Kfdd::default();
        let a = kfdd.add_input("a").unwrap();
        let b = kfdd.add_input_with("b", DecompositionType::PositiveDavio).unwrap();
        let c = kfdd.add_var(DecompositionType::NegativeDavio);
        let xs: Vec<Ref> = [a, b, c].iter().map(|&v| kfdd.mk_var(v)).collect();
        let t = kfdd.apply_and(xs[0], xs[1]);
        let f = kfdd.apply_xor(t, xs[2]);
        kfdd.free_all(xs);
        kfdd.free(t);
        (kfdd, vec![f])
    }

    #[test]
    fn test_dump_order() {
        let (kfdd, _) = manager();
        let mut out = Vec::new();
        kfdd.dump_order(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ".order\n0 a S\n1 b P\n2 x3 N\n.end\n");
    }

    #[test]
    fn test_read_order() {
        let (kfdd, mut roots) = manager();
        let table = kfdd.truth_table(roots[0]).unwrap();
        let text = ".order\n# comment\n0 x3 S\n1 a N\n\n2 b P\n.end\n";
        kfdd.read_order(text.as_bytes(), &mut roots).unwrap();

        let a = kfdd.input_label("a").unwrap();
        assert_eq!(kfdd.order(), vec![Var::new(3), a, Var::new(2)]);
        assert_eq!(
            kfdd.dtl(),
            vec![
                DecompositionType::Shannon,
                DecompositionType::NegativeDavio,
                DecompositionType::PositiveDavio
            ]
        );
        assert_eq!(kfdd.truth_table(roots[0]).unwrap(), table);
        assert!(kfdd.check_refs(&roots).is_empty());
    }

    #[test]
    fn test_dump_then_read_restores() {
        let (kfdd, mut roots) = manager();
        let mut out = Vec::new();
        kfdd.dump_order(&mut out).unwrap();
        let order = kfdd.order();
        let dtl = kfdd.dtl();

        kfdd.inversion(Level::new(0), Level::new(2));
        kfdd.change_decomposition(Var::new(1), DecompositionType::PositiveDavio, &mut roots);
        kfdd.read_order(out.as_slice(), &mut roots).unwrap();
        assert_eq!(kfdd.order(), order);
        assert_eq!(kfdd.dtl(), dtl);
    }

    #[test]
    fn test_malformed_files() {
        let cases = [
            ("0 a S\n.end\n", 1),
            (".order\n0 a S\n1 b P\n", 0),
            (".order\n0 a S\n0 b P\n2 x3 N\n.end\n", 3),
            (".order\n0 a S\n1 a P\n2 x3 N\n.end\n", 3),
            (".order\n0 a S\n1 q P\n2 x3 N\n.end\n", 3),
            (".order\n0 a S\n1 b D\n2 x3 N\n.end\n", 3),
            (".order\n0 a S\n7 b P\n2 x3 N\n.end\n", 3),
            (".order\n0 a S\n1 b\n.end\n", 3),
            (".order\n0 a S\n1 b P\n.end\n", 0),
            (".order\n0 a S\n1 b P\n2 x3 N\n.end\nmore\n", 6),
        ];
        for (text, expected) in cases {
            let (kfdd, mut roots) = manager();
            let order = kfdd.order();
            match kfdd.read_order(text.as_bytes(), &mut roots) {
                Err(KfddError::OrderFile { line, .. }) => assert_eq!(line, expected, "{:?}", text),
                other => panic!("unexpected result {:?} for {:?}", other, text),
            }
            // Nothing moved.
            assert_eq!(kfdd.order(), order);
        }
    }

    #[test]
    fn test_paths() {
        let (kfdd, mut roots) = manager();
        let path = std::env::temp_dir().join(format!("kfdd-rs-{}.order", std::process::id()));
        kfdd.dump_order_to_path(&path).unwrap();
        kfdd.read_order_from_path(&path, &mut roots).unwrap();
        std::fs::remove_file(&path).unwrap();

        let missing = std::env::temp_dir().join("kfdd-rs-does-not-exist.order");
        assert!(matches!(
            kfdd.read_order_from_path(&missing, &mut roots),
            Err(KfddError::Io(_))
        ));
    }
}
