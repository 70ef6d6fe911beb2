// Defensive programming lints - prevent panics and unsafe patterns
#![deny(clippy::indexing_slicing)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::fallible_impl_from)]
#![warn(clippy::wildcard_enum_match_arm)]
#![warn(clippy::fn_params_excessive_bools)]
// Idiomatic Rust lints
#![warn(clippy::needless_return)]
#![warn(clippy::let_and_return)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::map_unwrap_or)]
#![warn(clippy::explicit_iter_loop)]
// Tests assert with indexing and expect
#![cfg_attr(
    test,
    allow(clippy::indexing_slicing, clippy::unwrap_used, clippy::expect_used)
)]

mod app;
mod background;
mod capability;
mod config;
mod error;
mod logging;
mod router;
mod services;
mod session;
mod storage;
mod types;
mod ui;

use app::{App, AppMode, Focus, Navigable};
use background::Background;
use capability::DownloadProgress;
use color_eyre::Result;
use config::Config;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use router::{Request, Response};
use services::clipboard::ClipboardService;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use storage::NoteStore;
use tokio::runtime::Runtime;
use tracing::debug;
use types::NoteKind;

fn main() -> Result<()> {
    // Setup error handling
    color_eyre::install()?;

    let config = Config::load()?;
    logging::init(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => run_interactive(&runtime, &config, AppMode::Popup),
        Some("research") => run_interactive(&runtime, &config, AppMode::Research),
        Some(_) => handle_cli_args(&runtime, &config, &args),
    }
}

fn run_interactive(runtime: &Runtime, config: &Config, mode: AppMode) -> Result<()> {
    let _guard = runtime.enter();
    let mut background = runtime.block_on(Background::start(config))?;
    background.watch_store();

    let mut app = App::new(
        background.router.clone(),
        background.store.clone(),
        runtime.handle().clone(),
    )
    .with_status_feeds(background.subscribe_progress(), background.subscribe_session())
    .with_export_path(config.export_path()?);
    app.mode = mode;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn handle_cli_args(runtime: &Runtime, config: &Config, args: &[String]) -> Result<()> {
    let cmd = args
        .get(1)
        .ok_or_else(|| color_eyre::eyre::eyre!("No command provided"))?;
    let program_name = args.first().map_or("inquira", String::as_str);
    let rest = args.get(2..).unwrap_or_default();

    match cmd.as_str() {
        "--help" | "-h" | "help" => print_help(program_name),
        "--version" | "-v" => println!("Inquira v{}", env!("CARGO_PKG_VERSION")),
        "capture" => capture(runtime, config, rest)?,
        "message" => send_message(runtime, config, rest)?,
        "reset" => {
            let data_dir = config.data_dir()?;
            runtime.block_on(async {
                let store = NoteStore::open(&data_dir).await?;
                store.reset().await
            })?;
            println!("All notes have been reset.");
        }
        "export" => {
            let path = match rest.first() {
                Some(path) => PathBuf::from(path),
                None => config.export_path()?,
            };
            let data_dir = config.data_dir()?;
            let notes = runtime.block_on(async {
                let store = NoteStore::open(&data_dir).await?;
                store.load_all().await
            })?;
            services::export::export_notes(&notes, &path)?;
            println!("Exported {} notes to {}", notes.len(), path.display());
        }
        cmd_str => {
            eprintln!("Unknown command: {}", cmd_str);
            eprintln!("Run with --help for available commands.");
            std::process::exit(1);
        }
    }
    Ok(())
}

/// `capture [--summary] [text]`: the context-menu entries of the hub, from a shell
fn capture(runtime: &Runtime, config: &Config, args: &[String]) -> Result<()> {
    let summary = args.iter().any(|arg| arg == "--summary" || arg == "-s");
    let text = args
        .iter()
        .filter(|arg| !matches!(arg.as_str(), "--summary" | "-s"))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let text = if text.trim().is_empty() {
        ClipboardService::new().read_selection()?
    } else {
        text
    };
    if text.trim().is_empty() {
        return Err(color_eyre::eyre::eyre!("Nothing selected to capture"));
    }

    let (request, kind) = if summary {
        (Request::AddSummaryNote { text }, NoteKind::Summary)
    } else {
        (Request::AddRawNote { text }, NoteKind::Raw)
    };

    let response = runtime.block_on(async {
        let background = Background::start(config).await?;
        let mut progress = background.subscribe_progress();
        let reporter = tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let current = *progress.borrow_and_update();
                if let Some(current) = current {
                    if let Err(err) = report_download(&mut io::stderr(), current) {
                        debug!(error = %err, "could not write download progress");
                    }
                }
            }
        });
        let response = background.router.request(request).await;
        reporter.abort();
        Ok::<_, color_eyre::Report>(response)
    })?;

    match response {
        Response::Failure { error } => Err(color_eyre::eyre::eyre!(error)),
        Response::Text(_) | Response::Empty => {
            match kind {
                NoteKind::Raw => println!("Note added."),
                NoteKind::Summary => println!("Summary note added."),
            }
            Ok(())
        }
    }
}

/// `message <json>`: routes one raw `{type, payload}` message and prints the reply
fn send_message(runtime: &Runtime, config: &Config, args: &[String]) -> Result<()> {
    let raw = args.join(" ");
    if raw.trim().is_empty() {
        return Err(color_eyre::eyre::eyre!("Usage: inquira message '<json>'"));
    }
    let message: serde_json::Value = serde_json::from_str(&raw)?;

    let response = runtime.block_on(async {
        let background = Background::start(config).await?;
        Ok::<_, color_eyre::Report>(background.route_json(message).await)
    })?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn report_download(out: &mut impl Write, progress: DownloadProgress) -> io::Result<()> {
    write!(out, "\rDownloading model: {:>3}%", progress.percent())?;
    out.flush()
}

fn print_help(program_name: &str) {
    println!("Inquira - research notes with on-device AI");
    println!();
    println!("Usage: {} [command]", program_name);
    println!();
    println!("Commands:");
    println!("  research                  - Open the Research Hub");
    println!("  capture [text]            - Add to Note (selection when no text)");
    println!("  capture --summary [text]  - Add Summary to Note");
    println!("  export [path]             - Write notes as JSON (default notes.json)");
    println!("  message <json>            - Route a {{type, payload}} message, print the reply");
    println!("  reset                     - Delete all notes");
    println!("  --help                    - Show this help");
    println!("  --version                 - Show version");
    println!();
    println!("Run without arguments to open the launcher.");
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.update();

        terminal.draw(|f| ui::render(f, app))?;

        if app.should_quit {
            break;
        }

        // Poll for events with a timeout
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle KeyPress events to avoid duplicate handling
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        app.should_quit = true;
                        continue;
                    }
                    if app.alert.is_some() {
                        app.dismiss_alert();
                        continue;
                    }

                    match app.mode {
                        AppMode::Popup => handle_popup_mode(app, key.code),
                        AppMode::Research => match app.focus {
                            Focus::Notes => handle_notes_mode(app, key.code),
                            Focus::Chat => handle_chat_mode(app, key.code, key.modifiers),
                        },
                        AppMode::Help => handle_help_mode(app, key.code),
                    }
                }
                Event::Mouse(mouse) => handle_mouse_event(app, mouse),
                Event::Paste(paste) => {
                    if app.mode == AppMode::Research && app.focus == Focus::Chat {
                        app.chat_input.insert_str(&paste);
                    }
                }
                Event::FocusGained | Event::FocusLost | Event::Resize(_, _) => {}
            }
        }
    }

    Ok(())
}

fn handle_popup_mode(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.previous_popup_item(),
        KeyCode::Down | KeyCode::Char('j') => app.next_popup_item(),
        KeyCode::Enter => app.execute_popup_item(),
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Backspace
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Home
        | KeyCode::End
        | KeyCode::PageUp
        | KeyCode::PageDown
        | KeyCode::Tab
        | KeyCode::BackTab
        | KeyCode::Delete
        | KeyCode::Insert
        | KeyCode::F(_)
        | KeyCode::Char(_)
        | KeyCode::Null
        | KeyCode::CapsLock
        | KeyCode::ScrollLock
        | KeyCode::NumLock
        | KeyCode::PrintScreen
        | KeyCode::Pause
        | KeyCode::Menu
        | KeyCode::KeypadBegin
        | KeyCode::Media(_)
        | KeyCode::Modifier(_) => {}
    }
}

fn handle_notes_mode(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc => app.open_popup(),
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.previous_item(),
        KeyCode::Down | KeyCode::Char('j') => app.next_item(),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selection_at_cursor(),
        KeyCode::Char('f') => app.cycle_filter(),
        KeyCode::Delete | KeyCode::Char('d') => app.delete_note_at_cursor(),
        KeyCode::Char('a') => app.capture_selection(NoteKind::Raw),
        KeyCode::Char('s') => app.capture_selection(NoteKind::Summary),
        KeyCode::Char('e') => app.export_notes(),
        KeyCode::Char('c') => app.open_chat(),
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
        KeyCode::Backspace
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Home
        | KeyCode::End
        | KeyCode::PageUp
        | KeyCode::PageDown
        | KeyCode::Insert
        | KeyCode::F(_)
        | KeyCode::Char(_)
        | KeyCode::Null
        | KeyCode::CapsLock
        | KeyCode::ScrollLock
        | KeyCode::NumLock
        | KeyCode::PrintScreen
        | KeyCode::Pause
        | KeyCode::Menu
        | KeyCode::KeypadBegin
        | KeyCode::Media(_)
        | KeyCode::Modifier(_) => {}
    }
}

fn handle_chat_mode(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    match (key_code, modifiers) {
        (KeyCode::Char('r'), key_modifiers) if key_modifiers.contains(KeyModifiers::CONTROL) => {
            app.rewrite(false)
        }
        (KeyCode::Char('s'), key_modifiers) if key_modifiers.contains(KeyModifiers::CONTROL) => {
            app.rewrite(true)
        }
        (KeyCode::Char('y'), key_modifiers) if key_modifiers.contains(KeyModifiers::CONTROL) => {
            app.copy_last_answer()
        }
        (KeyCode::Esc, _) => app.close_chat(),
        (KeyCode::Tab, _) | (KeyCode::BackTab, _) => app.toggle_focus(),
        (KeyCode::Enter, _) => app.send_chat_message(),
        (KeyCode::Up, _) => app.scroll_chat_up_lines(3),
        (KeyCode::Down, _) => app.scroll_chat_down_lines(3),
        (KeyCode::PageUp, _) => app.scroll_chat_up_lines(20),
        (KeyCode::PageDown, _) => app.scroll_chat_down_lines(20),
        (KeyCode::Left, _) => app.chat_input.move_left(),
        (KeyCode::Right, _) => app.chat_input.move_right(),
        (KeyCode::Home, _) => app.chat_input.move_to_start(),
        (KeyCode::End, _) => app.chat_input.move_to_end(),
        (KeyCode::Backspace, _) => app.chat_input.remove_char(),
        (KeyCode::Delete, _) => app.chat_input.delete_char(),
        (KeyCode::Char(character), _) => app.chat_input.add_char(character),
        (KeyCode::Insert, _)
        | (KeyCode::F(_), _)
        | (KeyCode::Null, _)
        | (KeyCode::CapsLock, _)
        | (KeyCode::ScrollLock, _)
        | (KeyCode::NumLock, _)
        | (KeyCode::PrintScreen, _)
        | (KeyCode::Pause, _)
        | (KeyCode::Menu, _)
        | (KeyCode::KeypadBegin, _)
        | (KeyCode::Media(_), _)
        | (KeyCode::Modifier(_), _) => {}
    }
}

fn handle_help_mode(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => app.close_help(),
        KeyCode::Enter
        | KeyCode::Backspace
        | KeyCode::Up
        | KeyCode::Down
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Home
        | KeyCode::End
        | KeyCode::PageUp
        | KeyCode::PageDown
        | KeyCode::Tab
        | KeyCode::BackTab
        | KeyCode::Delete
        | KeyCode::Insert
        | KeyCode::F(_)
        | KeyCode::Char(_)
        | KeyCode::Null
        | KeyCode::CapsLock
        | KeyCode::ScrollLock
        | KeyCode::NumLock
        | KeyCode::PrintScreen
        | KeyCode::Pause
        | KeyCode::Menu
        | KeyCode::KeypadBegin
        | KeyCode::Media(_)
        | KeyCode::Modifier(_) => {}
    }
}

fn handle_mouse_event(app: &mut App, mouse: event::MouseEvent) {
    if app.mode != AppMode::Research {
        return;
    }

    match mouse.kind {
        event::MouseEventKind::ScrollUp if app.chat_open => app.scroll_chat_up_lines(3),
        event::MouseEventKind::ScrollDown if app.chat_open => app.scroll_chat_down_lines(3),
        event::MouseEventKind::ScrollUp
        | event::MouseEventKind::ScrollDown
        | event::MouseEventKind::ScrollLeft
        | event::MouseEventKind::ScrollRight
        | event::MouseEventKind::Down(_)
        | event::MouseEventKind::Up(_)
        | event::MouseEventKind::Drag(_)
        | event::MouseEventKind::Moved => {}
    }
}
