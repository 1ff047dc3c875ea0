#![doc = "Command line entry point of the interop supervisor."]

pub mod cli;
pub mod flags;

use clap::Parser;

fn main() {
    supervisor_cli::backtrace::enable();

    if let Err(err) = cli::Cli::parse().run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
