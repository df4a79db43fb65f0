#![allow(clippy::cargo_common_metadata)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use xshell::{cmd, Shell};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Fmt,
    Check,
    Clippy,
    /// Start the signaling server, optionally on the given address.
    Run { address: Option<String> },
    /// Native tests of the whole workspace, then the browser suite of the library.
    Test {
        #[arg(long)]
        skip_browser: bool,
    },
    Doc,
    PreCommit,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let sh = Shell::new()?;

    match &cli.command {
        Command::Fmt => fmt(&sh)?,
        Command::Check => check(&sh)?,
        Command::Clippy => clippy(&sh)?,
        Command::Run { address } => run(&sh, address.as_deref())?,
        Command::Test { skip_browser } => test(&sh, *skip_browser)?,
        Command::Doc => doc(&sh)?,
        Command::PreCommit => pre_commit(&sh)?,
    };

    Ok(())
}

fn fmt(sh: &Shell) -> Result<()> {
    Ok(cmd!(sh, "cargo +nightly fmt").run()?)
}

fn check(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo check --all-targets --all-features --workspace").run()?;
    Ok(cmd!(
        sh,
        "cargo check --package stranger-chat --target wasm32-unknown-unknown"
    )
    .run()?)
}

fn clippy(sh: &Shell) -> Result<()> {
    Ok(cmd!(sh, "cargo clippy --all-targets --all-features --workspace").run()?)
}

fn run(sh: &Shell, address: Option<&str>) -> Result<()> {
    let address = address.unwrap_or("127.0.0.1:9001");
    Ok(cmd!(sh, "cargo run --package stranger-chat-signaling-server -- {address}").run()?)
}

fn test(sh: &Shell, skip_browser: bool) -> Result<()> {
    cmd!(sh, "cargo test --workspace").run()?;
    if skip_browser {
        return Ok(());
    }

    let _library = sh.push_dir(project_root::get_project_root()?.join("library/"));
    cmd!(sh, "wasm-pack test --headless --firefox").run()?;
    cmd!(sh, "wasm-pack test --headless --chrome").run()?;
    Ok(())
}

fn doc(sh: &Shell) -> Result<()> {
    Ok(cmd!(sh, "cargo doc --no-deps --all-features").run()?)
}

fn pre_commit(sh: &Shell) -> Result<()> {
    fmt(sh)?;
    check(sh)?;
    test(sh, false)?;
    doc(sh)
}
