//! `hashcnf` — encodes SHA-1/SHA-256 as a CNF or ANF/PolyBoRi file, and lets
//! an existing file have named variables bound to new values.
//!
//! ```text
//! hashcnf encode sha256 -v M 0x61626380... out.cnf
//! hashcnf assign out.cnf -v H 0x... out-assigned.cnf
//! hashcnf define out.cnf -v H 0x... out-defined.cnf
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use rand::Rng;

use hashcnf::backend::anf::{self, AnfBackend};
use hashcnf::backend::cnf::CnfBackend;
use hashcnf::encoder::{self, Algorithm, Bindings};
use hashcnf::grammar::{self, Value};
use hashcnf::io::{self, Parameters};
use hashcnf::literal::Literal;
use hashcnf::optimizer::{self, Mode, Outcome};
use hashcnf::{Error, Result};

#[derive(Parser)]
#[command(name = "hashcnf", version, about = "Encodes SHA-1/SHA-256 as a CNF or ANF propositional formula")]
struct Cli {
    /// Emit progress at debug level (errors and warnings always print).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a fresh formula for one hash-algorithm block.
    Encode(EncodeArgs),
    /// Bind new values into an existing file, keeping its original clauses.
    Assign(ModifyArgs),
    /// Bind new values into an existing file, keeping every derived clause too.
    Define(ModifyArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Sha1,
    Sha256,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Dimacs,
    Polybori,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Unoptimized,
    Original,
    All,
}

#[derive(Args)]
struct EncodeArgs {
    /// Which hash algorithm to encode a single block of.
    #[arg(value_enum)]
    algorithm: AlgorithmArg,

    /// Round count to encode (clamped to the algorithm's own maximum).
    #[arg(short = 'r', long)]
    rounds: Option<usize>,

    /// A named binding: `-v M 0x616263...`. May be repeated. `encode` only
    /// accepts `M` (required) and `H` (optional).
    #[arg(short = 'v', long = "var", num_args = 2, value_names = ["NAME", "VALUE"])]
    vars: Vec<String>,

    #[arg(long, default_value_t = 6)]
    add_max_args: usize,

    #[arg(long, default_value_t = 3)]
    xor_max_args: usize,

    /// Output format; inferred from the output file's extension if omitted.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    #[arg(long, value_enum, default_value_t = ModeArg::Original)]
    mode: ModeArg,

    output: PathBuf,
}

#[derive(Args)]
struct ModifyArgs {
    input: PathBuf,

    /// A named binding: `-v H 0x...`. May be repeated; the name must already
    /// exist in the file's `c var` records.
    #[arg(short = 'v', long = "var", num_args = 2, value_names = ["NAME", "VALUE"])]
    vars: Vec<String>,

    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Assign(args) => run_modify(args, Mode::Original),
        Command::Define(args) => run_modify(args, Mode::All),
    };

    match result {
        Ok(()) => {}
        Err(Error::Conflict(msg)) => {
            info!("formula is unsatisfiable: {msg}");
            println!("UNSAT");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("hashcnf: {e}");
            std::process::exit(1);
        }
    }
}

fn infer_format(format: Option<FormatArg>, path: &Path) -> FormatArg {
    if let Some(f) = format {
        return f;
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("anf") | Some("pbori") | Some("polybori") => FormatArg::Polybori,
        _ => FormatArg::Dimacs,
    }
}

fn parse_var_flags(pairs: &[String]) -> Result<Vec<(String, Value)>> {
    pairs
        .chunks(2)
        .map(|pair| {
            let value = grammar::parse(&pair[1])?;
            Ok((pair[0].clone(), value))
        })
        .collect()
}

/// The bit width implied by a value on its own — every alternative except
/// `compute` carries its width without needing an external expectation.
fn value_width(value: &Value) -> Result<usize> {
    match value {
        Value::Literals(lits) => Ok(lits.len()),
        Value::Random(n) => Ok(*n),
        Value::StringText(s) => Ok(s.len() * 8),
        Value::Compute => Err(Error::InvalidArgument("\"compute\" cannot be used for M".into())),
    }
}

fn mode_of(arg: ModeArg) -> Mode {
    match arg {
        ModeArg::Unoptimized => Mode::Unoptimized,
        ModeArg::Original => Mode::Original,
        ModeArg::All => Mode::All,
    }
}

fn parameters_for(algorithm: Algorithm, rounds: usize, add_max_args: usize, xor_max_args: usize) -> Parameters {
    let mut p = Parameters::new();
    let name = match algorithm {
        Algorithm::Sha1 => "sha1",
        Algorithm::Sha256 => "sha256",
    };
    p.insert("algorithm".into(), serde_json::Value::String(name.into()));
    p.insert("rounds".into(), serde_json::Value::from(rounds));
    p.insert("add_max_args".into(), serde_json::Value::from(add_max_args));
    p.insert("xor_max_args".into(), serde_json::Value::from(xor_max_args));
    p
}

/// Binds the `H` output to a requested value by asserting bit-wise
/// equivalence clauses, or — for `compute` — simply verifies the driver
/// already folded `H` down to the concrete hash of a fully-specified message.
fn apply_h_binding_cnf(
    backend: &mut CnfBackend,
    bindings: &Bindings,
    h_value: Option<&Value>,
    rng: &mut impl Rng,
) -> Result<()> {
    let Some(value) = h_value else { return Ok(()) };
    let h_bits = bindings.vars["H"].clone();
    if matches!(value, Value::Compute) {
        if h_bits.iter().any(|l| !l.is_constant()) {
            return Err(Error::InvalidArgument(
                "\"compute\" for H requires every M bit to resolve to a concrete constant".into(),
            ));
        }
        return Ok(());
    }
    let target = grammar::resolve(value, h_bits.len(), rng)?;
    for (&h, &t) in h_bits.iter().zip(target.iter()) {
        backend.store.add_clause(&[h.negate(), t])?;
        backend.store.add_clause(&[h, t.negate()])?;
    }
    Ok(())
}

/// Like [`apply_h_binding_cnf`], but the ANF backend only supports binding a
/// bit to a concrete constant — aliasing one polynomial variable to another
/// would need a full linear substitution this crate does not implement.
fn apply_h_binding_anf(
    backend: &mut AnfBackend,
    bindings: &Bindings,
    h_value: Option<&Value>,
    rng: &mut impl Rng,
) -> Result<()> {
    let Some(value) = h_value else { return Ok(()) };
    let h_bits = bindings.vars["H"].clone();
    if matches!(value, Value::Compute) {
        if h_bits.iter().any(|l| !l.is_constant()) {
            return Err(Error::InvalidArgument(
                "\"compute\" for H requires every M bit to resolve to a concrete constant".into(),
            ));
        }
        return Ok(());
    }
    let target = grammar::resolve(value, h_bits.len(), rng)?;
    for (&h, &t) in h_bits.iter().zip(target.iter()) {
        if !t.is_constant() {
            return Err(Error::InvalidArgument(
                "binding an ANF H bit to another variable is not supported; use a constant value".into(),
            ));
        }
        if h.is_variable() {
            anf::substitute_constant(&mut backend.equations, h.variable(), t.value());
        } else if h.is_constant() && h.value() != t.value() {
            return Err(Error::Conflict("H is already fixed by the circuit and conflicts with the requested value".into()));
        }
    }
    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let algorithm = match args.algorithm {
        AlgorithmArg::Sha1 => Algorithm::Sha1,
        AlgorithmArg::Sha256 => Algorithm::Sha256,
    };
    let rounds = args.rounds.unwrap_or_else(|| algorithm.max_rounds());
    let format = infer_format(args.format, &args.output);

    let mut named: HashMap<String, Value> = parse_var_flags(&args.vars)?.into_iter().collect();
    let m_value = named
        .remove("M")
        .ok_or_else(|| Error::InvalidArgument("encode requires -v M <value>".into()))?;
    let h_value = named.remove("H");
    if let Some(name) = named.keys().next() {
        return Err(Error::InvalidArgument(format!(
            "encode does not accept a binding named \"{name}\" (only M and H)"
        )));
    }

    let mut rng = rand::thread_rng();
    let width = value_width(&m_value)?;
    let mut message_bits = grammar::resolve(&m_value, width, &mut rng)?;
    info!("encoding a {width}-bit message over {rounds} rounds");

    let parameters = parameters_for(algorithm, rounds, args.add_max_args, args.xor_max_args);
    let file = File::create(&args.output)?;
    let mut out = BufWriter::new(file);

    match format {
        FormatArg::Dimacs => {
            let mut backend = CnfBackend::new(args.add_max_args, args.xor_max_args);
            let mut bindings = encoder::encode(algorithm, rounds, &mut message_bits, &mut backend)?;
            apply_h_binding_cnf(&mut backend, &bindings, h_value.as_ref(), &mut rng)?;

            let outcome = optimizer::optimize(&mut backend.store, mode_of(args.mode))?;
            if outcome == Outcome::Conflict {
                return Err(Error::Conflict("formula became unsatisfiable after binding H".into()));
            }

            let named_slices: Vec<&[Literal]> = bindings.vars.values().map(|v| v.as_slice()).collect();
            let map = optimizer::build_reindex(&backend.store, &named_slices);
            let mut reduced = optimizer::apply_to_store(&mut backend.store, &map);
            if map.new_variable_count() > 0 {
                reduced.ensure_variable(map.new_variable_count() - 1);
            }
            for literals in bindings.vars.values_mut() {
                *literals = optimizer::apply_to_binding(literals.as_slice(), &map);
            }

            io::dimacs::write(&mut out, &reduced, &bindings, &parameters)?;
        }
        FormatArg::Polybori => {
            let mut backend = AnfBackend::new(args.add_max_args, args.xor_max_args);
            let bindings = encoder::encode(algorithm, rounds, &mut message_bits, &mut backend)?;
            apply_h_binding_anf(&mut backend, &bindings, h_value.as_ref(), &mut rng)?;

            io::polybori::write(&mut out, &backend.equations, backend.vargen.count(), &bindings, &parameters)?;
        }
    }

    info!("wrote {}", args.output.display());
    Ok(())
}

fn run_modify(args: ModifyArgs, mode: Mode) -> Result<()> {
    let format = infer_format(args.format, &args.input);
    let updates = parse_var_flags(&args.vars)?;
    let mut rng = rand::thread_rng();
    let output_path = &args.output;

    match format {
        FormatArg::Dimacs => {
            let mut reader = BufReader::new(File::open(&args.input)?);
            let parsed = io::dimacs::read(&mut reader)?;
            let mut store = parsed.store;
            let mut bindings = parsed.bindings;

            for (name, value) in &updates {
                let current = bindings
                    .vars
                    .get(name)
                    .ok_or_else(|| Error::InvalidArgument(format!("file has no named variable \"{name}\"")))?
                    .clone();
                let target = grammar::resolve(value, current.len(), &mut rng)?;
                for (&cur, &t) in current.iter().zip(target.iter()) {
                    store.add_clause(&[cur.negate(), t])?;
                    store.add_clause(&[cur, t.negate()])?;
                }
            }

            let outcome = optimizer::optimize(&mut store, mode)?;
            if outcome == Outcome::Conflict {
                return Err(Error::Conflict("formula became unsatisfiable after the requested bindings".into()));
            }

            let named_slices: Vec<&[Literal]> = bindings.vars.values().map(|v| v.as_slice()).collect();
            let map = optimizer::build_reindex(&store, &named_slices);
            let mut reduced = optimizer::apply_to_store(&mut store, &map);
            if map.new_variable_count() > 0 {
                reduced.ensure_variable(map.new_variable_count() - 1);
            }
            for literals in bindings.vars.values_mut() {
                *literals = optimizer::apply_to_binding(literals.as_slice(), &map);
            }

            let file = File::create(&output_path)?;
            let mut out = BufWriter::new(file);
            io::dimacs::write(&mut out, &reduced, &bindings, &parsed.parameters)?;
        }
        FormatArg::Polybori => {
            let mut reader = BufReader::new(File::open(&args.input)?);
            let parsed = io::polybori::read(&mut reader)?;
            let mut equations = parsed.equations;
            let mut bindings = parsed.bindings;

            for (name, value) in &updates {
                let current = bindings
                    .vars
                    .get(name)
                    .ok_or_else(|| Error::InvalidArgument(format!("file has no named variable \"{name}\"")))?
                    .clone();
                let target = grammar::resolve(value, current.len(), &mut rng)?;
                for (&cur, &t) in current.iter().zip(target.iter()) {
                    if !t.is_constant() {
                        return Err(Error::InvalidArgument(
                            "binding an ANF variable to another variable is not supported; use a constant value".into(),
                        ));
                    }
                    if cur.is_variable() {
                        anf::substitute_constant(&mut equations, cur.variable(), t.value());
                    } else if cur.is_constant() && cur.value() != t.value() {
                        return Err(Error::Conflict(format!("\"{name}\" is already fixed and conflicts with the requested value")));
                    }
                }
            }

            let file = File::create(&output_path)?;
            let mut out = BufWriter::new(file);
            io::polybori::write(&mut out, &equations, parsed.variable_count, &bindings, &parsed.parameters)?;
        }
    }

    info!("wrote {}", output_path.display());
    Ok(())
}
