//! gridview - browse tabular data in the terminal
//!
//! Loads a CSV file into a `gridview::table::Table` and drives it through
//! the component/action loop.

mod action;
mod app;
mod args;
mod component;
mod components;
mod config;
mod model;
mod services;
mod tui;

use crate::action::Action;
use crate::app::App;
use crate::args::Cli;
use crate::component::Component;
use crate::config::Config;
use crate::tui::Tui;
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::Event;
use log::LevelFilter;
use simplelog::WriteLogger;
use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    // Load before touching the terminal so errors print normally
    let mut app = App::new(&cli, &config)
        .with_context(|| format!("Failed to open {}", cli.data.display()))?;
    app.init()?;

    let mut tui = Tui::new()?.with_tick_rate(Duration::from_millis(100));
    tui.enter()?;

    let result = run_app(&mut tui, &mut app);

    tui.exit()?;

    if let Err(err) = result {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }

    Ok(())
}

/// Log to a file in the config directory; stdout belongs to the terminal UI
///
/// Runs before the terminal is taken over, so failures are reported on
/// stderr and the app carries on without a log.
fn init_logging(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let Some(dir) = Config::config_dir() else {
        eprintln!("Warning: logging disabled: HOME is not set");
        return;
    };
    let result = open_log_file(&dir).and_then(|log_file| {
        WriteLogger::init(level, simplelog::Config::default(), log_file)
            .context("Failed to install logger")
    });
    if let Err(e) = result {
        eprintln!("Warning: logging disabled: {:#}", e);
    }
}

fn open_log_file(dir: &Path) -> Result<File> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join("gridview.log");
    File::create(&path).with_context(|| format!("Failed to create {}", path.display()))
}

/// Run the main application loop
fn run_app(tui: &mut Tui, app: &mut App) -> Result<()> {
    while !app.should_quit {
        tui.draw(|frame| {
            if let Err(e) = app.draw(frame, frame.area()) {
                log::error!("draw failed: {}", e);
            }
        })?;

        if let Some(event) = tui.next_event()? {
            let action = match event {
                Event::Key(key) => app.handle_key_event(key)?,
                Event::Resize(w, h) => Some(Action::Resize(w, h)),
                _ => None,
            };

            // An update may chain into a follow-up action
            let mut current_action = action;
            while let Some(a) = current_action {
                current_action = app.update(a)?;
            }
        } else {
            app.update(Action::Tick)?;
        }
    }

    Ok(())
}
