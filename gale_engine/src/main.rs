#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Gale **
//! A turn-based text adventure under a changing sky.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;
use gale_engine::config::CONFIG_FILE;
use gale_engine::{GALE_VERSION, Game, load_config, run_repl};
use log::{error, info};

fn main() -> ExitCode {
    env_logger::init();
    info!("Start: gale {GALE_VERSION}");

    let config = load_config(Path::new(CONFIG_FILE));
    let mut game = match Game::start(config) {
        Ok(game) => game,
        Err(err) => {
            error!("could not start the game: {err:#}");
            eprintln!("{} {err:#}", "Fatal:".red().bold());
            return ExitCode::FAILURE;
        },
    };

    // clear the screen
    print!("\x1B[2J\x1B[H");
    let _ = std::io::stdout().flush();
    println!("{:^80}", "G A L E".bright_yellow().underline());

    match run_repl(&mut game) {
        Ok(()) => {
            info!("clean exit");
            ExitCode::SUCCESS
        },
        Err(err) => {
            error!("fatal: {err:#}");
            eprintln!("{} {err:#}", "Fatal:".red().bold());
            ExitCode::FAILURE
        },
    }
}
