//! REPL and command handling.
//!
//! Reads a line with rustyline, dispatches it to [`Game`], and prints the
//! result wrapped to the configured width.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use log::{info, warn};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use textwrap::{Options, fill};

use crate::command::{Command, parse_command};
use crate::game::{DoorOutcome, ExitState, Game, GaleError, RoomView};
use crate::save_files::{collect_save_slots, format_modified};
use crate::style::GameStyle;
use crate::world::Movement;

const HISTORY_FILE: &str = "history.txt";

const COMMAND_TERMS: &[&str] = &[
    "close", "down", "east", "go", "help", "look", "north", "northeast", "northwest", "open", "quit", "save",
    "slots", "south", "southeast", "southwest", "time", "up", "wait", "west",
];

/// Control flow signal used by handlers to exit the REPL.
pub enum ReplControl {
    Continue,
    Quit,
}

#[derive(Default)]
struct GaleHelper;

impl Helper for GaleHelper {}

impl Completer for GaleHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos].rfind(char::is_whitespace).map_or(0, |idx| idx + 1);
        let prefix = line[start..pos].to_lowercase();
        if prefix.is_empty() {
            return Ok((start, Vec::new()));
        }
        let pairs = COMMAND_TERMS
            .iter()
            .filter(|term| term.starts_with(&prefix))
            .map(|term| Pair {
                display: (*term).to_string(),
                replacement: (*term).to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for GaleHelper {
    type Hint = String;
}

impl Highlighter for GaleHelper {}

impl Validator for GaleHelper {}

fn history_path(game: &Game) -> PathBuf {
    game.config.save_dir.join(HISTORY_FILE)
}

fn load_history(editor: &mut rustyline::Editor<GaleHelper, DefaultHistory>, path: &Path) {
    match editor.load_history(path) {
        Ok(()) => {},
        Err(ReadlineError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            info!("no prior history found at {}, starting fresh", path.display());
        },
        Err(err) => warn!("failed to load history from {}: {err}", path.display()),
    }
}

fn wrap(game: &Game, text: &str) -> String {
    fill(text, Options::new(game.config.wrap_width))
}

fn print_room(game: &Game, view: &RoomView) {
    println!("\n{}", view.title.room_titlebar_style());
    println!("{}", wrap(game, &view.desc).description_style());
    if !view.sky.is_empty() {
        println!("{}", wrap(game, &view.sky).sky_style());
    }
    for name in &view.entities {
        println!("You see {}.", name.entity_style());
    }
    let exits: Vec<String> = view
        .exits
        .iter()
        .map(|(dir, state)| match state {
            ExitState::Unexplored => dir.name().exit_style().to_string(),
            ExitState::Explored => dir.name().exit_explored_style().to_string(),
            ExitState::Closed => format!("{} (closed)", dir.name()).exit_style().to_string(),
            ExitState::Locked => format!("{} (locked)", dir.name()).exit_locked_style().to_string(),
        })
        .collect();
    if exits.is_empty() {
        println!("There is no obvious way out.");
    } else {
        println!("{} {}", "Exits:".subheading_style(), exits.join(", "));
    }
}

fn print_messages(game: &Game, messages: &[String]) {
    for message in messages {
        println!("{}", wrap(game, message).sky_style());
    }
}

fn print_time(game: &Game) {
    let clock = game.sky.clock();
    println!(
        "It is {} on {}. The moon is {}, and the wind is from the {}.",
        clock.time_string().clock_style(),
        clock.date_string().clock_style(),
        clock.moon_phase().name(),
        game.sky.wind().direction_name()
    );
}

fn print_slots(game: &Game) -> Result<()> {
    let slots = collect_save_slots(&game.config.save_dir)?;
    if slots.is_empty() {
        println!("No saved games.");
    }
    for slot in slots {
        let when = slot.modified.map_or_else(|| "unknown".to_string(), format_modified);
        println!("{} ({when}, {} regions, {:?})", slot.slot.subheading_style(), slot.regions, slot.status);
    }
    Ok(())
}

fn handle(game: &mut Game, command: Command) -> Result<ReplControl, GaleError> {
    match command {
        Command::Look => {
            let view = game.look()?;
            print_room(game, &view);
        },
        Command::Go(direction) => {
            let walk = game.walk(direction)?;
            match walk.movement {
                Movement::Moved(_) => {
                    let view = game.look()?;
                    print_room(game, &view);
                    print_messages(game, &walk.messages);
                },
                Movement::NoExit => println!("{}", "You can't go that way.".denied_style()),
                Movement::Blocked => println!("{}", "The way is shut.".denied_style()),
            }
        },
        Command::Open(direction) | Command::Close(direction) => {
            let open = matches!(command, Command::Open(_));
            let reply = match game.set_door(direction, open)? {
                DoorOutcome::Done if open => "Opened.",
                DoorOutcome::Done => "Closed.",
                DoorOutcome::AlreadyThat => "It already is.",
                DoorOutcome::NotADoor => "There's nothing there to open or close.",
                DoorOutcome::Locked => "It's locked.",
            };
            println!("{reply}");
        },
        Command::Wait(minutes) => {
            let passed = game.wait(f64::from(minutes) * 60.0)?;
            print_messages(game, &passed.messages);
            if passed.interrupted {
                println!("You stop waiting after {} minutes.", passed.seconds / 60);
            } else {
                println!("Time passes.");
            }
        },
        Command::Time => print_time(game),
        Command::Save => {
            game.save()?;
            println!("Game saved to slot '{}'.", game.config.slot);
        },
        Command::Slots => {
            if let Err(err) = print_slots(game) {
                warn!("listing save slots failed: {err:#}");
                println!("{}", "Could not list saved games.".error_style());
            }
        },
        Command::Help => {
            println!("Commands: look, <direction>, open/close <direction>, wait [minutes], time, save, slots, quit");
        },
        Command::Quit => return Ok(ReplControl::Quit),
        Command::Unknown(text) => println!("{} '{}'", "I don't understand".denied_style(), text),
    }
    Ok(ReplControl::Continue)
}

/// Run the read-eval-print loop until the user quits.
///
/// # Errors
/// - on terminal failures, or any fatal game error
pub fn run_repl(game: &mut Game) -> Result<()> {
    let mut editor = rustyline::Editor::<GaleHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(GaleHelper));
    let history = history_path(game);
    load_history(&mut editor, &history);

    let view = game.look()?;
    print_room(game, &view);

    let mut turn = 0u64;
    loop {
        let prompt = format!("\n[{}]>> ", game.sky.clock().time_string()).bright_black().to_string();
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("Command canceled.");
                continue;
            },
            Err(ReadlineError::Eof) => "quit".to_string(),
            Err(err) => return Err(err.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Err(err) = editor.add_history_entry(line.as_str()) {
            warn!("failed to append to history: {err}");
        }
        if let Err(err) = editor.save_history(&history) {
            warn!("failed to persist history to {}: {err}", history.display());
        }

        turn += 1;
        info!("================> BEGIN TURN {turn} <================");
        if let ReplControl::Quit = handle(game, parse_command(&line))? {
            break;
        }
    }
    game.save()?;
    println!("Your progress is saved. Farewell.");
    Ok(())
}
