//! Boolean synthesis engine.
//!
//! Every binary operation is reduced to one of two cached core operations,
//! AND and XOR, plus complement edges. The core runs on an explicit task
//! stack so deep diagrams never grow the native stack.
//!
//! Cofactor rules for a node at the top level `x`:
//!
//! | decomposition | function        | f0          | f1                  |
//! |---------------|-----------------|-------------|---------------------|
//! | Shannon       | ~x·f0 ⊕ x·f1    | f\|x=0      | f\|x=1              |
//! | pos. Davio    | f0 ⊕ x·f1       | f\|x=0      | f\|x=0 ⊕ f\|x=1     |
//! | neg. Davio    | f0 ⊕ ~x·f1      | f\|x=1      | f\|x=0 ⊕ f\|x=1     |
//!
//! XOR is linear in both Davio coefficients, AND is not:
//! `(f0 ⊕ x·f1)·(g0 ⊕ x·g1) = f0·g0 ⊕ x·((f0 ⊕ f1)·(g0 ⊕ g1) ⊕ f0·g0)`.

use log::debug;

use crate::cache::CachedOp;
use crate::error::{KfddError, Result};
use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::types::Var;

/// Binary operations with their numeric operation codes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    /// ~(F + G)
    Nor,
    /// ~F * G
    Nimf,
    /// ~F
    Not,
    /// F # G
    Xor,
    /// ~(F * G)
    Nand,
    /// F * G
    And,
    /// ~F # G
    Equi,
    /// F => G
    Impg,
    /// F
    Id,
    /// G => F
    Impf,
    /// F + G
    Or,
}

impl Op {
    pub const ALL: [Op; 11] = [
        Op::Nor,
        Op::Nimf,
        Op::Not,
        Op::Xor,
        Op::Nand,
        Op::And,
        Op::Equi,
        Op::Impg,
        Op::Id,
        Op::Impf,
        Op::Or,
    ];

    pub fn code(self) -> u32 {
        match self {
            Op::Nor => 1,
            Op::Nimf => 2,
            Op::Not => 3,
            Op::Xor => 6,
            Op::Nand => 7,
            Op::And => 8,
            Op::Equi => 9,
            Op::Impg => 11,
            Op::Id => 12,
            Op::Impf => 13,
            Op::Or => 14,
        }
    }

    pub fn from_code(code: u32) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.code() == code)
    }

    /// False for the unary operations, which ignore `G`.
    pub fn is_binary(self) -> bool {
        !matches!(self, Op::Not | Op::Id)
    }

    /// Reference semantics on plain booleans.
    pub fn eval(self, f: bool, g: bool) -> bool {
        match self {
            Op::Nor => !(f || g),
            Op::Nimf => !f && g,
            Op::Not => !f,
            Op::Xor => f ^ g,
            Op::Nand => !(f && g),
            Op::And => f && g,
            Op::Equi => f == g,
            Op::Impg => !f || g,
            Op::Id => f,
            Op::Impf => !g || f,
            Op::Or => f || g,
        }
    }
}

enum Task {
    /// Compute `op(f, g)` and push the owned result.
    Apply(CachedOp, Ref, Ref),
    /// Pop `b` then `a`, compute `op(a, b)` and free both afterwards.
    ApplyPopped(CachedOp),
    /// Pop `t3`, peek the Davio low result, and compute `t3 ⊕ low`.
    DavioHigh,
    Free(Ref),
    /// Pop high then low, build the node and memoize it as `op(f, g)`.
    Combine {
        var: Var,
        op: CachedOp,
        f: Ref,
        g: Ref,
        negate: bool,
    },
}

fn terminal_case(op: CachedOp, f: Ref, g: Ref) -> Option<Ref> {
    match op {
        CachedOp::And => {
            if f == Ref::ZERO || g == Ref::ZERO || f == -g {
                Some(Ref::ZERO)
            } else if f == Ref::ONE {
                Some(g)
            } else if g == Ref::ONE || f == g {
                Some(f)
            } else {
                None
            }
        }
        CachedOp::Xor => {
            if f == g {
                Some(Ref::ZERO)
            } else if f == -g {
                Some(Ref::ONE)
            } else if f == Ref::ZERO {
                Some(g)
            } else if g == Ref::ZERO {
                Some(f)
            } else if f == Ref::ONE {
                Some(-g)
            } else if g == Ref::ONE {
                Some(-f)
            } else {
                None
            }
        }
    }
}

struct ApplyMachine<'a> {
    kfdd: &'a Kfdd,
    tasks: Vec<Task>,
    values: Vec<Ref>,
}

impl<'a> ApplyMachine<'a> {
    fn new(kfdd: &'a Kfdd) -> Self {
        Self {
            kfdd,
            tasks: Vec::new(),
            values: Vec::new(),
        }
    }

    fn run(mut self, op: CachedOp, f: Ref, g: Ref) -> Ref {
        self.tasks.push(Task::Apply(op, f, g));
        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Apply(op, f, g) => self.step(op, f, g),
                Task::ApplyPopped(op) => {
                    let b = self.pop();
                    let a = self.pop();
                    self.tasks.push(Task::Free(a));
                    self.tasks.push(Task::Free(b));
                    self.tasks.push(Task::Apply(op, a, b));
                }
                Task::DavioHigh => {
                    let t3 = self.pop();
                    let low = *self.values.last().expect("Davio low result is on the stack");
                    self.tasks.push(Task::Free(t3));
                    self.tasks.push(Task::Apply(CachedOp::Xor, t3, low));
                }
                Task::Free(r) => self.kfdd.storage.borrow_mut().free(r),
                Task::Combine {
                    var,
                    op,
                    f,
                    g,
                    negate,
                } => {
                    let high = self.pop();
                    let low = self.pop();
                    let mut storage = self.kfdd.storage.borrow_mut();
                    let r = storage.find_or_create(var, low, high);
                    storage.free(low);
                    storage.free(high);
                    self.kfdd.cache.borrow_mut().insert(op, f, g, r, &storage.nodes);
                    self.values.push(r.negate_if(negate));
                }
            }
        }
        debug_assert_eq!(self.values.len(), 1);
        self.pop()
    }

    fn pop(&mut self) -> Ref {
        self.values.pop().expect("value stack underflow")
    }

    fn push_owned(&mut self, r: Ref) {
        self.kfdd.storage.borrow_mut().inc_ref(r);
        self.values.push(r);
    }

    fn step(&mut self, op: CachedOp, f: Ref, g: Ref) {
        if let Some(r) = terminal_case(op, f, g) {
            self.push_owned(r);
            return;
        }

        // XOR is computed on regular operands, carrying the parity.
        let (f, g, negate) = match op {
            CachedOp::And => (f, g, false),
            CachedOp::Xor => (f.regular(), g.regular(), f.is_negated() ^ g.is_negated()),
        };
        let (f, g) = if f <= g { (f, g) } else { (g, f) };

        let storage = self.kfdd.storage.borrow();
        let hit = self.kfdd.cache.borrow().lookup(op, f, g, &storage.nodes);
        if let Some(r) = hit {
            drop(storage);
            self.push_owned(r.negate_if(negate));
            return;
        }

        let level_f = storage.level_of_ref(f);
        let level_g = storage.level_of_ref(g);
        let level = level_f.min(level_g);
        let var = storage.order.var_at(level);
        let dtl = storage.decomposition(var);

        // An operand below the top level is constant in `var`.
        let fixed = |r: Ref| match op {
            CachedOp::Xor if dtl.is_davio() => (r, Ref::ZERO),
            _ => (r, r),
        };
        let (f0, f1) = if level_f == level { storage.cofactors(f) } else { fixed(f) };
        let (g0, g1) = if level_g == level { storage.cofactors(g) } else { fixed(g) };
        drop(storage);

        self.tasks.push(Task::Combine {
            var,
            op,
            f,
            g,
            negate,
        });
        if op == CachedOp::And && dtl.is_davio() && level_f == level_g {
            self.tasks.push(Task::DavioHigh);
            self.tasks.push(Task::ApplyPopped(CachedOp::And));
            self.tasks.push(Task::Apply(CachedOp::Xor, g0, g1));
            self.tasks.push(Task::Apply(CachedOp::Xor, f0, f1));
            self.tasks.push(Task::Apply(CachedOp::And, f0, g0));
        } else {
            self.tasks.push(Task::Apply(op, f1, g1));
            self.tasks.push(Task::Apply(op, f0, g0));
        }
    }
}

impl Kfdd {
    fn and(&self, f: Ref, g: Ref) -> Ref {
        ApplyMachine::new(self).run(CachedOp::And, f, g)
    }

    fn xor(&self, f: Ref, g: Ref) -> Ref {
        ApplyMachine::new(self).run(CachedOp::Xor, f, g)
    }

    /// Compute `op(f, g)`. Returns an owned reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use kfdd_rs::apply::Op;
    /// use kfdd_rs::kfdd::Kfdd;
    /// use kfdd_rs::reference::Ref;
    ///
    /// let kfdd = Kfdd::default();
    /// let vars = kfdd.add_vars(2);
    /// let a = kfdd.mk_var(vars[0]);
    /// let b = kfdd.mk_var(vars[1]);
    /// let f = kfdd.synthesize(Op::Xor, a, b).unwrap();
    /// assert_eq!(kfdd.synthesize(Op::Xor, f, f).unwrap(), Ref::ZERO);
    /// ```
    pub fn synthesize(&self, op: Op, f: Ref, g: Ref) -> Result<Ref> {
        debug!("synthesize(op = {:?}, f = {}, g = {})", op, f, g);
        self.validate(f)?;
        if op.is_binary() {
            self.validate(g)?;
        }
        let r = match op {
            Op::And => self.and(f, g),
            Op::Nand => -self.and(f, g),
            Op::Or => -self.and(-f, -g),
            Op::Nor => self.and(-f, -g),
            Op::Xor => self.xor(f, g),
            Op::Equi => -self.xor(f, g),
            Op::Impg => -self.and(f, -g),
            Op::Impf => -self.and(-f, g),
            Op::Nimf => self.and(-f, g),
            Op::Not => -self.retain(f),
            Op::Id => self.retain(f),
        };
        Ok(r)
    }

    /// [`synthesize`][Kfdd::synthesize] by numeric operation code.
    pub fn synthesize_code(&self, code: u32, f: Ref, g: Ref) -> Result<Ref> {
        let op = Op::from_code(code).ok_or(KfddError::UnknownOperation(code))?;
        self.synthesize(op, f, g)
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        debug!("apply_not(f = {})", f);
        -self.retain(f)
    }

    pub fn apply_and(&self, f: Ref, g: Ref) -> Ref {
        debug!("apply_and(f = {}, g = {})", f, g);
        self.and(f, g)
    }

    pub fn apply_or(&self, f: Ref, g: Ref) -> Ref {
        debug!("apply_or(f = {}, g = {})", f, g);
        -self.and(-f, -g)
    }

    pub fn apply_xor(&self, f: Ref, g: Ref) -> Ref {
        debug!("apply_xor(f = {}, g = {})", f, g);
        self.xor(f, g)
    }

    pub fn apply_eq(&self, f: Ref, g: Ref) -> Ref {
        debug!("apply_eq(f = {}, g = {})", f, g);
        -self.xor(f, g)
    }

    /// If-then-else, `(f * g) # (~f * h)`. Returns an owned reference.
    pub fn ite(&self, f: Ref, g: Ref, h: Ref) -> Result<Ref> {
        debug!("ite(f = {}, g = {}, h = {})", f, g, h);
        self.validate(f)?;
        self.validate(g)?;
        self.validate(h)?;
        let then = self.and(f, g);
        let els = self.and(-f, h);
        let r = self.xor(then, els);
        self.free(then);
        self.free(els);
        Ok(r)
    }

    /// Fold `op` over `fs`, starting from `init`. Returns an owned reference.
    pub fn apply_many(&self, op: Op, init: Ref, fs: impl IntoIterator<Item = Ref>) -> Result<Ref> {
        let mut acc = self.retain(init);
        for f in fs {
            let next = self.synthesize(op, acc, f);
            self.free(acc);
            acc = next?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_log::test;

    use super::*;
    use crate::types::DecompositionType;

    fn manager(dtl: &[DecompositionType]) -> (Kfdd, Vec<Ref>) {
        let kfdd = Kfdd::default();
        let xs = dtl
            .iter()
            .map(|&d| {
                let v = kfdd.add_var(d);
                kfdd.mk_var(v)
            })
            .collect();
        (kfdd, xs)
    }

    #[test]
    fn test_op_codes() {
        for op in Op::ALL {
            assert_eq!(Op::from_code(op.code()), Some(op));
        }
        assert_eq!(Op::from_code(4), None);
        let kfdd = Kfdd::default();
        assert!(matches!(
            kfdd.synthesize_code(20, Ref::ONE, Ref::ONE),
            Err(KfddError::UnknownOperation(20))
        ));
    }

    #[test]
    fn test_null_operand() {
        let kfdd = Kfdd::default();
        assert!(matches!(
            kfdd.synthesize(Op::And, Ref::positive(5), Ref::ONE),
            Err(KfddError::NullOperand(_))
        ));
        assert!(kfdd.synthesize(Op::Not, Ref::ONE, Ref::positive(5)).is_ok());
    }

    #[test]
    fn test_absorption() {
        use DecompositionType::*;
        for dtl in [Shannon, PositiveDavio, NegativeDavio] {
            let (kfdd, xs) = manager(&[dtl, dtl, dtl]);
            let t = kfdd.apply_and(xs[0], xs[1]);
            let f = kfdd.apply_xor(t, xs[2]);

            let or_ff = kfdd.synthesize(Op::Or, f, f).unwrap();
            assert_eq!(or_ff, f);
            assert_eq!(kfdd.synthesize(Op::Xor, f, f).unwrap(), Ref::ZERO);
            assert_eq!(kfdd.synthesize(Op::And, f, Ref::ZERO).unwrap(), Ref::ZERO);
            assert_eq!(kfdd.synthesize(Op::Or, f, Ref::ONE).unwrap(), Ref::ONE);

            kfdd.free_all([or_ff, t, f]);
            kfdd.free_all(xs);
            assert!(kfdd.check_refs(&[]).is_empty());
            assert_eq!(kfdd.size_all(), 0);
        }
    }

    #[test]
    fn test_xor_scenario() {
        let (kfdd, xs) = manager(&[DecompositionType::Shannon; 2]);
        let (a, b) = (kfdd.variable(xs[0]).unwrap(), kfdd.variable(xs[1]).unwrap());
        let f = kfdd.synthesize(Op::Xor, xs[0], xs[1]).unwrap();
        kfdd.free_all(xs);
        // One node on the a-level, pointing to b and ~b.
        assert_eq!(kfdd.size_all(), 2);
        assert_eq!(kfdd.level_size(a), 1);
        assert_eq!(kfdd.level_size(b), 1);
        assert_eq!(kfdd.low(f), -kfdd.high(f));
        assert_eq!(kfdd.truth_table(f).unwrap(), vec![false, true, true, false]);
        assert_eq!(kfdd.synthesize(Op::Xor, f, f).unwrap(), Ref::ZERO);
    }

    #[test]
    fn test_all_ops_mixed_decompositions() {
        use DecompositionType::*;
        let (kfdd, xs) = manager(&[Shannon, PositiveDavio, NegativeDavio, PositiveDavio]);
        let a = kfdd.apply_or(xs[0], xs[2]);
        let b = kfdd.apply_and(xs[1], -xs[3]);
        let ta = kfdd.truth_table(a).unwrap();
        let tb = kfdd.truth_table(b).unwrap();
        for op in Op::ALL {
            let r = kfdd.synthesize(op, a, b).unwrap();
            let expected: Vec<bool> = ta.iter().zip(&tb).map(|(&p, &q)| op.eval(p, q)).collect();
            assert_eq!(kfdd.truth_table(r).unwrap(), expected, "op = {:?}", op);
            kfdd.free(r);
        }
        kfdd.free_all([a, b]);
        assert!(kfdd.check_refs(&xs).is_empty());
    }

    #[test]
    fn test_ite() {
        use DecompositionType::*;
        let (kfdd, xs) = manager(&[PositiveDavio, Shannon, NegativeDavio]);
        let r = kfdd.ite(xs[0], xs[1], xs[2]).unwrap();
        let table = kfdd.truth_table(r).unwrap();
        for (k, &value) in table.iter().enumerate() {
            let bit = |i: usize| (k >> i) & 1 == 1;
            assert_eq!(value, if bit(0) { bit(1) } else { bit(2) });
        }
    }

    #[test]
    fn test_canonical_across_constructions() {
        use DecompositionType::*;
        let (kfdd, xs) = manager(&[NegativeDavio, PositiveDavio, Shannon]);
        // De Morgan and distributivity give the same node.
        let p = kfdd.apply_or(xs[0], xs[1]);
        let r1 = kfdd.apply_and(p, xs[2]);
        let q1 = kfdd.apply_and(xs[0], xs[2]);
        let q2 = kfdd.apply_and(xs[1], xs[2]);
        let r2 = kfdd.apply_or(q1, q2);
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_random_functions() {
        use DecompositionType::*;
        let mut rng = StdRng::seed_from_u64(42);
        let dtls = [Shannon, PositiveDavio, NegativeDavio];
        for _ in 0..10 {
            let dtl: Vec<_> = (0..5).map(|_| dtls[rng.gen_range(0..3)]).collect();
            let (kfdd, xs) = manager(&dtl);
            let mut pool: Vec<(Ref, Vec<bool>)> = xs
                .iter()
                .map(|&x| (kfdd.retain(x), kfdd.truth_table(x).unwrap()))
                .collect();
            for _ in 0..30 {
                let i = rng.gen_range(0..pool.len());
                let j = rng.gen_range(0..pool.len());
                let op = Op::ALL[rng.gen_range(0..Op::ALL.len())];
                let r = kfdd.synthesize(op, pool[i].0, pool[j].0).unwrap();
                let expected: Vec<bool> = pool[i]
                    .1
                    .iter()
                    .zip(&pool[j].1)
                    .map(|(&p, &q)| op.eval(p, q))
                    .collect();
                assert_eq!(kfdd.truth_table(r).unwrap(), expected);
                pool.push((r, expected));
            }
            kfdd.free_all(pool.into_iter().map(|(r, _)| r));
            kfdd.free_all(xs);
            assert!(kfdd.check_refs(&[]).is_empty());
            assert_eq!(kfdd.size_all(), 0);
        }
    }

    #[test]
    fn test_apply_many() {
        let (kfdd, xs) = manager(&[DecompositionType::PositiveDavio; 4]);
        let parity = kfdd.apply_many(Op::Xor, Ref::ZERO, xs.iter().copied()).unwrap();
        // Positive Davio XOR chains stay linear: one node per variable.
        assert_eq!(kfdd.size(&[parity]), 4);
        assert_eq!(kfdd.sat_count(parity, 4), BigUint::from(8u32));
    }
}
