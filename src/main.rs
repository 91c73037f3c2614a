use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colored::Colorize;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};

use slotwatch::config::{self, Config};
use slotwatch::display::{self, Terminal};
use slotwatch::{Command, TimerBoard};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use. [default: ${XDG_CONFIG_DIR}/slotwatch/config.toml]
    config: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

/// What the event loop should do after handling a line of input
enum Flow {
    Continue,
    Quit,
}

fn handle(line: &str, board: &mut TimerBoard, terminal: &mut Terminal) -> Result<Flow> {
    let Some(command) = Command::parse(line)? else {
        return Ok(Flow::Continue);
    };

    match command {
        Command::StartStop(slot) => {
            let first_start = board.timer(slot).is_some_and(|t| t.start_time().is_none());
            board.start_stop(slot)?;

            if first_start {
                if let Some(text) = board.timer(slot).and_then(display::started_notice) {
                    terminal.notify(text);
                }
            }
        }
        Command::Reset(slot) => {
            board.reset(slot)?;
        }
        Command::SetDuration(slot, seconds) => {
            board.set_duration(slot, seconds)?;
        }
        Command::Acknowledge(slot) => {
            board.acknowledge(slot)?;
        }
        Command::Save => {
            board.save()?;
            terminal.notify(format!("Saved {} timers", board.timers().len()));
        }
        Command::Show => {}
        Command::Help => terminal.help(),
        Command::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let config_path = match args.config {
        Some(conf_path) => conf_path,
        None => config::default_config_path()?,
    };
    let config = Config::init(&config_path)?;

    let mut board = TimerBoard::load(&config);
    let mut terminal = Terminal::new(config.columns);

    if let Some(summary) = board.poll() {
        terminal.render(&board, &summary);
    }

    let mut clock = interval(Duration::from_secs(1));
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately.
    clock.tick().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = clock.tick() => {
                if let Some(summary) = board.advance() {
                    terminal.render(&board, &summary);
                }
            }
            line = lines.next_line(), if input_open => {
                match line {
                    Ok(Some(line)) => {
                        terminal.clear_notice();

                        match handle(&line, &mut board, &mut terminal) {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Quit) => break,
                            Err(e) => terminal.error(&e),
                        }

                        terminal.render(&board, &board.summary());
                    }
                    Ok(None) => {
                        info!("Input closed, timers keep running until interrupted");
                        input_open = false;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }
    }

    match board.save() {
        Ok(()) => println!("Saved timers to {}", config.state_file_path.display().to_string().cyan()),
        Err(e) => error!("Failed to save timers on exit: {:#}", e),
    }

    Ok(())
}
