use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gridcase::debug::{format_branch_table, format_bus_table, format_gen_table};
use gridcase::{convert, load_network, write_case, ConvertOptionsBuilder, Mode};
use std::path::PathBuf;

/// Electrical network to power flow case conversion.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a network into a solver-ready case
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Network JSON file
    #[arg(required = true)]
    input: PathBuf,

    /// Write the internal case to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the external case to this file
    #[arg(long)]
    output_external: Option<PathBuf>,

    /// Prepare an optimal power flow case (cost table included).
    #[arg(long, default_value_t = false)]
    pub opf: bool,

    /// Prepare a short-circuit case (impedance injections).
    #[arg(long, default_value_t = false)]
    pub sc: bool,

    /// Skip the connectivity check.
    #[arg(long, default_value_t = false)]
    pub no_connectivity: bool,

    /// Honor external grid voltage angle setpoints.
    #[arg(long, default_value_t = false)]
    pub voltage_angles: bool,

    /// Print the internal case tables.
    #[arg(long, default_value_t = false)]
    pub print: bool,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let Commands::Convert(args) = &cli.command;

    let net = load_network(&args.input)?;

    let mode = if args.opf {
        Mode::Opf
    } else if args.sc {
        Mode::Sc
    } else {
        Mode::Pf
    };
    let opts = ConvertOptionsBuilder::default()
        .mode(mode)
        .check_connectivity(!args.no_connectivity)
        .calculate_voltage_angles(args.voltage_angles)
        .build()?;

    let ctx = convert(&net, &opts)?;
    let internal = ctx
        .internal
        .as_ref()
        .ok_or_else(|| anyhow::format_err!("conversion produced no internal case"))?;

    println!(
        "{} buses, {} gens, {} branches (external: {} buses)",
        internal.bus.len(),
        internal.gen.len(),
        internal.branch.len(),
        ctx.case.bus.len()
    );
    if args.print {
        print!("{}", format_bus_table(internal));
        print!("{}", format_gen_table(internal));
        print!("{}", format_branch_table(internal));
    }

    if let Some(out_path) = &args.output {
        write_case(out_path, internal)?;
    }
    if let Some(out_path) = &args.output_external {
        write_case(out_path, &ctx.case)?;
    }

    Ok(())
}
