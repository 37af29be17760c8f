use std::path::PathBuf;

use clap::Parser;

use kfdd_rs::config::SynthesisSettings;
use kfdd_rs::flow::{self, ReorderMethod};
use kfdd_rs::kfdd::Kfdd;
use kfdd_rs::reference::Ref;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Adder width in bits.
    #[arg(value_name = "INT", default_value = "3")]
    bits: usize,

    /// Reordering code (0..=10).
    #[clap(long, value_name = "INT", default_value = "7")]
    reordering: u32,

    /// Sifting method: i, g, l, r or v.
    #[clap(long, value_name = "CHAR", default_value = "v")]
    sifting_method: String,

    /// Decomposition type of the inputs: S, P or N.
    #[clap(long, value_name = "CHAR", default_value = "S")]
    decomposition: String,

    /// Synthesize from the complement-free view of the diagram.
    #[clap(long)]
    no_complements: bool,

    /// Write the final variable order to this file.
    #[clap(long, value_name = "FILE")]
    dump_order: Option<PathBuf>,

    /// Establish the order in this file before reordering.
    #[clap(long, value_name = "FILE")]
    order: Option<PathBuf>,

    #[clap(long, value_name = "INT", default_value = "0")]
    seed: u64,
}

/// Inputs `a0.., b0..` in the worst order, outputs `s0..` and the carry `c`.
fn build_adder(kfdd: &Kfdd, bits: usize) -> color_eyre::Result<()> {
    let mut a = Vec::with_capacity(bits);
    for i in 0..bits {
        a.push(kfdd.mk_var(kfdd.add_input(&format!("a{}", i))?));
    }
    let mut b = Vec::with_capacity(bits);
    for i in 0..bits {
        b.push(kfdd.mk_var(kfdd.add_input(&format!("b{}", i))?));
    }

    let mut carry = Ref::ZERO;
    for i in 0..bits {
        let half = kfdd.apply_xor(a[i], b[i]);
        let sum = kfdd.apply_xor(half, carry);
        kfdd.add_output(&format!("s{}", i), sum)?;
        let both = kfdd.apply_and(a[i], b[i]);
        let propagate = kfdd.apply_and(half, carry);
        let next = kfdd.apply_or(both, propagate);
        kfdd.free_all([half, sum, both, propagate, carry]);
        carry = next;
    }
    kfdd.add_output("c", carry)?;
    kfdd.free(carry);
    kfdd.free_all(a);
    kfdd.free_all(b);
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let mut settings = SynthesisSettings::from_options([
        ("sifting_method", args.sifting_method.as_str()),
        ("default_decomposition", args.decomposition.as_str()),
    ]);
    settings.reordering = ReorderMethod::from_code(args.reordering)
        .ok_or_else(|| color_eyre::eyre::eyre!("unknown reordering code {}", args.reordering))?;
    settings.complemented_edges = !args.no_complements;
    settings.order_dump = args.dump_order;
    settings.order_file = args.order;
    settings.seed = args.seed;

    let kfdd = flow::new_manager(&settings);
    build_adder(&kfdd, args.bits)?;
    println!("kfdd = {:?}", kfdd);
    println!("nodes before reordering: {}", kfdd.size_all());

    let outcome = flow::run(&kfdd, &settings)?;
    println!("kfdd = {:?}", kfdd);
    println!(
        "order: {}",
        kfdd.order()
            .into_iter()
            .map(|v| format!("{}:{}", kfdd.input_name(v), kfdd.decomposition(v)))
            .collect::<Vec<_>>()
            .join(" ")
    );
    let davio = kfdd.dtl().iter().filter(|d| d.is_davio()).count();
    println!("{} of {} variables use a Davio decomposition", davio, kfdd.num_vars());
    println!("stats = {:?}", outcome.stats);
    println!(
        "{} nodes, {} lines, {} gates, quantum cost {}, in {:.3}s",
        outcome.node_count,
        outcome.circuit.lines,
        outcome.circuit.num_gates(),
        outcome.circuit.quantum_cost(),
        outcome.runtime.as_secs_f64()
    );
    println!();
    print!("{}", outcome.circuit);

    Ok(())
}
