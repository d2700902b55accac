use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stagemix", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured composites, including auto-swapped twins.
    Composites(ConfigArgs),
    /// List the precomputed transition pool.
    Transitions(ConfigArgs),
    /// Solve and print one transition frame-by-frame.
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Mixer configuration JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Mixer configuration JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Origin composite name.
    #[arg(long)]
    from: String,

    /// Destination composite name.
    #[arg(long)]
    to: String,

    /// Probe the destination with A/B exchanged.
    #[arg(long)]
    flip: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Composites(args) => cmd_composites(args),
        Command::Transitions(args) => cmd_transitions(args),
        Command::Show(args) => cmd_show(args),
    }
}

fn read_config(path: &Path) -> anyhow::Result<stagemix::MixConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let config: stagemix::MixConfig =
        serde_json::from_reader(r).with_context(|| "parse config JSON")?;
    config.validate()?;
    Ok(config)
}

fn cmd_composites(args: ConfigArgs) -> anyhow::Result<()> {
    let config = read_config(&args.in_path)?;
    let table = stagemix::CompositeTable::configure(&config.composites, config.resolution)?;
    let mut composites: Vec<_> = table.iter().collect();
    composites.sort_by_key(|c| c.order);
    for c in composites {
        println!("{c}");
    }
    Ok(())
}

fn cmd_transitions(args: ConfigArgs) -> anyhow::Result<()> {
    let config = read_config(&args.in_path)?;
    let table = stagemix::CompositeTable::configure(&config.composites, config.resolution)?;
    let transitions = stagemix::Transitions::configure(&config.transitions, &table, config.fps)?;
    print!("{transitions}");
    Ok(())
}

fn cmd_show(args: ShowArgs) -> anyhow::Result<()> {
    let config = read_config(&args.in_path)?;
    let table = stagemix::CompositeTable::configure(&config.composites, config.resolution)?;
    let transitions = stagemix::Transitions::configure(&config.transitions, &table, config.fps)?;

    let from = table
        .get(&args.from)
        .with_context(|| format!("unknown composite '{}'", args.from))?;
    let to = table
        .get(&args.to)
        .with_context(|| format!("unknown composite '{}'", args.to))?;

    match transitions.solve(&from, &to, args.flip) {
        Some((t, swap)) => {
            if swap {
                eprintln!("applied swap");
            }
            print!("{t}");
        }
        None => {
            eprintln!(
                "no transition from '{}' to '{}'; the mixer would hard-cut",
                args.from, args.to
            );
        }
    }
    Ok(())
}
