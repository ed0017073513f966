use anyhow::{bail, Context, Result};
use chd_phf::{Chd, ChdParams};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "chd-phf", version)]
#[command(about = "Build and query CHD perfect hash functions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a perfect hash function from a key file and save it
    Build {
        /// Input file, one key per line (blank lines are skipped)
        #[arg(short, long)]
        keys: PathBuf,

        /// Where to write the displacement table
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 4)]
        keys_per_bucket: usize,

        /// Keys per bin, in (0, 1]; 1.0 gives a minimal perfect hash
        #[arg(long, default_value_t = 1.0)]
        load_factor: f64,

        /// Exclusive upper bound on per-bucket displacements
        #[arg(long, default_value_t = u32::MAX)]
        max_seed: u32,

        /// Print per-bucket-size statistics to stderr
        #[arg(long, default_value_t = false)]
        stats: bool,
    },
    /// Print the bin of each key
    Query {
        /// A file written by `build`
        #[arg(short, long)]
        phf: PathBuf,

        keys: Vec<String>,
    },
    /// Print the parameters of a saved perfect hash function
    Inspect {
        #[arg(short, long)]
        phf: PathBuf,
    },
}

fn read_keys(path: &Path) -> Result<Vec<Vec<u8>>> {
    let content =
        std::fs::read(path).with_context(|| format!("reading keys from {}", path.display()))?;
    Ok(content
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
        .collect())
}

fn load(path: &Path) -> Result<Chd> {
    Chd::load_from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Build {
            keys,
            output,
            keys_per_bucket,
            load_factor,
            max_seed,
            stats,
        } => {
            let keys = read_keys(&keys)?;
            if keys.is_empty() {
                bail!("no keys found");
            }
            let params = ChdParams {
                keys_per_bucket,
                max_seed,
                load_factor,
            };

            let start = Instant::now();
            let (chd, bucket_stats) = <Chd>::new_with_stats(&keys, params)
                .with_context(|| format!("building over {} keys", keys.len()))?;
            let elapsed = start.elapsed();

            if stats {
                bucket_stats.print();
            }
            chd.save_to_file(&output)
                .with_context(|| format!("writing {}", output.display()))?;

            println!(
                "Built CHD over {} keys in {:.2?}: {} bins, {} buckets, {:.2} bits/key",
                chd.num_keys(),
                elapsed,
                chd.num_bins(),
                chd.num_buckets(),
                chd.bits_per_key()
            );
            println!("Saved to {}", output.display());
        }
        Command::Query { phf, keys } => {
            let chd = load(&phf)?;
            for key in keys {
                println!("{}\t{}", key, chd.hash(key.as_bytes()));
            }
        }
        Command::Inspect { phf } => {
            let chd = load(&phf)?;
            let used = chd.displacements().iter().filter(|&&d| d != 0).count();
            println!("keys:        {}", chd.num_keys());
            println!("bins:        {}", chd.num_bins());
            println!("load factor: {}", chd.load_factor());
            println!("buckets:     {} ({} non-empty)", chd.num_buckets(), used);
            println!(
                "max displ.:  {}",
                chd.displacements().iter().max().copied().unwrap_or(0)
            );
            println!("bits/key:    {:.2}", chd.bits_per_key());
        }
    }

    Ok(())
}
