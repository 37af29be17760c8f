//! # kfdd-rs: Kronecker Functional Decision Diagrams in Rust
//!
//! **`kfdd-rs`** is a manager-centric library for **ordered Kronecker functional decision diagrams (OKFDDs)**
//! and for synthesizing them into **reversible circuits** of NOT, CNOT and Toffoli gates.
//!
//! ## What is a KFDD?
//!
//! A KFDD decomposes every variable by one of three rules:
//!
//! - Shannon (`S`): `f = ~x·f_low ⊕ x·f_high`
//! - positive Davio (`P`): `f = f_low ⊕ x·f_high`
//! - negative Davio (`N`): `f = f_low ⊕ ~x·f_high`
//!
//! For a fixed variable order and decomposition type list (DTL), every Boolean function has exactly one
//! reduced diagram. A BDD is the special case where every variable is Shannon-decomposed.
//! Choosing both the order and the DTL well can shrink a diagram far below its BDD size.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: all operations go through the [`Kfdd`][crate::kfdd::Kfdd] manager,
//!   which owns the unique tables, the computed table and the primary tables.
//! - **Complement Edges**: [`Ref`][crate::reference::Ref] handles carry a negation bit, so `NOT` is free.
//! - **In-Place Reordering**: adjacent level exchange keeps node identities, and sifting, permutation and
//!   exact (Friedman) minimization are built on it. All of them have DTL variants.
//! - **Circuit Synthesis**: every node becomes a short gate sequence, see [`synthesis`].
//!
//! ## Basic Usage
//!
//! ```rust
//! use kfdd_rs::kfdd::Kfdd;
//! use kfdd_rs::types::DecompositionType;
//!
//! let kfdd = Kfdd::default();
//! let a = kfdd.add_input("a").unwrap();
//! let b = kfdd.add_input_with("b", DecompositionType::PositiveDavio).unwrap();
//!
//! let x = kfdd.mk_var(a);
//! let y = kfdd.mk_var(b);
//! let f = kfdd.apply_xor(x, y);
//!
//! assert!(kfdd.evaluate(f, &[true, false]).unwrap());
//! assert!(!kfdd.evaluate(f, &[true, true]).unwrap());
//! assert_eq!(kfdd.sat_count(f, 2), num_bigint::BigUint::from(2u32));
//!
//! // Flip the decomposition of `a`: the function stays the same.
//! let mut roots = [f];
//! kfdd.change_decomposition(a, DecompositionType::NegativeDavio, &mut roots);
//! assert_eq!(kfdd.truth_table(roots[0]).unwrap(), vec![false, true, true, false]);
//! ```
//!
//! ## Core Components
//!
//! - **[`kfdd`]**: the manager, with the primary tables and node accessors.
//! - **[`apply`]**: Boolean synthesis by operation code.
//! - **[`reorder`]**, **[`sifting`]**, **[`permutation`]**: variable and decomposition reordering.
//! - **[`cost`]**: objectives for the reordering searches.
//! - **[`synthesis`]**: diagram to reversible [`circuit`].
//! - **[`flow`]**: the settings-driven reorder-then-synthesize pipeline.

pub mod apply;
pub mod cache;
pub mod circuit;
pub mod config;
pub mod cost;
pub mod dd_graph;
pub mod dtl;
pub mod error;
pub mod eval;
pub mod flow;
pub mod kfdd;
pub mod names;
pub mod node;
pub mod order_file;
pub mod permutation;
pub mod recycler;
pub mod reference;
pub mod reorder;
pub mod sat;
pub mod sifting;
pub mod storage;
pub mod subtable;
pub mod synthesis;
pub mod types;
pub mod utils;
