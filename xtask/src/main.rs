use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for blastfield")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, headless scenarios
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Run the headless CLI scenarios (warm drop, cold drop, every preset)
    Scenarios,
}

const PRESETS: [&str; 5] = ["burst", "smoke", "mushroom", "shockwave", "flash"];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_scenarios()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Scenarios => run_scenarios()?,
    }

    Ok(())
}

fn cargo(what: &str, args: &[&str]) -> Result<()> {
    println!("==> {what}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt --check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_tests() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

fn run_scenarios() -> Result<()> {
    let cli = ["run", "-q", "-p", "blastfield-cli", "--"];

    let drop = [&cli[..], &["drop", "--json"]].concat();
    cargo("scenario: drop", &drop)?;

    let cold = [&cli[..], &["drop", "--cold", "--json"]].concat();
    cargo("scenario: cold drop", &cold)?;

    for preset in PRESETS {
        let spawn = [&cli[..], &["spawn", "--preset", preset, "--every", "0"]].concat();
        cargo(&format!("scenario: spawn {preset}"), &spawn)?;
    }
    Ok(())
}
