//! Build automation tasks for the viewwire workspace.
//!
//! Run with `cargo xtask <command>`.
//!
//! - `ci`: format check, clippy, then the full test suite
//! - `fmt`: check formatting
//! - `clippy`: lint every target with warnings denied
//! - `test`: run tests, optionally one package or with more proptest cases
//! - `bench`: run the decoder benchmarks
//! - `fuzz`: run one of the codec fuzz targets (requires cargo-fuzz + nightly)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use xshell::{Shell, cmd};

/// Proptest cases per property under `test --thorough`.
const THOROUGH_CASES: &str = "4096";

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for viewwire")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run format, lint and test checks
    Ci,
    /// Check formatting
    Fmt,
    /// Run clippy on every target
    Clippy,
    /// Run the test suite
    Test {
        /// Test a specific package
        #[arg(short, long)]
        package: Option<String>,
        /// Raise the number of proptest cases for the chunking properties
        #[arg(long)]
        thorough: bool,
    },
    /// Run the decoder benchmarks
    Bench {
        /// Benchmark filter pattern (e.g. `decode_view`)
        filter: Option<String>,
    },
    /// Run a fuzz target
    Fuzz {
        /// Fuzz target to run
        #[arg(value_enum, default_value_t = FuzzTarget::DecodeChunks)]
        target: FuzzTarget,
        /// Maximum runtime in seconds
        #[arg(long, default_value = "60")]
        max_time: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FuzzTarget {
    /// Arbitrary bodies split at arbitrary points
    DecodeChunks,
    /// Arbitrary request fields through the encoder
    EncodeRequest,
}

impl FuzzTarget {
    fn name(self) -> &'static str {
        match self {
            Self::DecodeChunks => "decode_chunks",
            Self::EncodeRequest => "encode_request",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            fmt(&sh)?;
            clippy(&sh)?;
            test(&sh, None, false)?;
            println!("\n✅ All CI checks passed!");
        }
        Command::Fmt => fmt(&sh)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test { package, thorough } => test(&sh, package.as_deref(), thorough)?,
        Command::Bench { filter } => bench(&sh, filter.as_deref())?,
        Command::Fuzz { target, max_time } => fuzz(&sh, target, max_time)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let manifest = String::from_utf8(output.stdout).context("invalid UTF-8 in cargo output")?;
    PathBuf::from(manifest.trim())
        .parent()
        .map(PathBuf::from)
        .context("failed to get workspace root")
}

fn fmt(sh: &Shell) -> Result<()> {
    println!("Checking formatting...");
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    println!("Running clippy...");
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>, thorough: bool) -> Result<()> {
    let scope = match package {
        Some(pkg) => vec!["-p", pkg],
        None => vec!["--workspace"],
    };
    let _cases = thorough.then(|| sh.push_env("PROPTEST_CASES", THOROUGH_CASES));

    println!("Running tests...");
    cmd!(sh, "cargo test {scope...}").run()?;
    Ok(())
}

fn bench(sh: &Shell, filter: Option<&str>) -> Result<()> {
    println!("Running decoder benchmarks...");
    cmd!(sh, "cargo bench -p viewwire-codec --bench decoder -- {filter...}").run()?;
    Ok(())
}

fn fuzz(sh: &Shell, target: FuzzTarget, max_time: u64) -> Result<()> {
    let target = target.name();
    let max_time = max_time.to_string();
    println!("Fuzzing {target} for {max_time}s...");

    // cargo-fuzz requires nightly
    cmd!(sh, "cargo +nightly fuzz run {target} -- -max_total_time={max_time}").run()?;
    Ok(())
}
