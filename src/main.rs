use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use addrlabel::config::{self, Config};
use addrlabel::core::DomRewriter;
use addrlabel::dom::inner_html;
use addrlabel::domain::{classify_exact, normalize};
use addrlabel::modules::export::{self, ExportFormat};
use addrlabel::modules::manage::{ManageState, Mode, StatusLevel};
use addrlabel::modules::scan;
use addrlabel::page::{Clipboard, SystemClipboard};
use addrlabel::store::{
    remove_nickname, upsert_nickname, NicknameCache, NicknameStore, SqliteNicknameStore,
};
use addrlabel::ui;

#[derive(Debug, Parser)]
#[command(
    name = "addrlabel",
    version,
    about = "Label crypto addresses with your own nicknames"
)]
struct Args {
    /// Nickname database (defaults to the config `store_path` or the data dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every nickname, sorted by name
    List,
    /// Add or replace the nickname for an address
    Set { address: String, nickname: String },
    /// Delete the nickname for an address
    Remove { address: String },
    /// Label addresses in a text file ("-" reads stdin)
    Scan {
        input: String,
        /// Print the rewritten page markup instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Write the nickname map to JSON or CSV
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Output file (defaults to a timestamped file under the data dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Interactive nickname manager
    Manage,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load();
    if !matches!(args.command, Command::Manage) {
        init_tracing(&config);
    }

    let db_path = args
        .store
        .clone()
        .or_else(|| config.nicknames_db_path())
        .context("no data directory available; pass --store")?;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = SqliteNicknameStore::open(&db_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;

    match args.command {
        Command::List => runtime.block_on(list(&store)),
        Command::Set { address, nickname } => {
            let key = runtime.block_on(upsert_nickname(&store, &address, &nickname))?;
            println!("{key} -> {}", nickname.trim());
            Ok(())
        }
        Command::Remove { address } => {
            if !runtime.block_on(remove_nickname(&store, &address))? {
                bail!("no nickname stored for {}", normalize(address.trim()));
            }
            Ok(())
        }
        Command::Scan { input, html } => {
            runtime.block_on(scan_input(&store, &config, &input, html))
        }
        Command::Export { format, out } => {
            let map = runtime.block_on(store.get())?;
            let (path, count) = export::export_nicknames(&map, format, out.as_deref())?;
            println!("Exported {} nicknames to {}", count, path.display());
            Ok(())
        }
        Command::Manage => run_manage(&runtime, &store, &db_path.display().to_string()),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log.as_deref().unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn list(store: &dyn NicknameStore) -> Result<()> {
    let map = store.get().await?;
    for entry in export::sorted_entries(&map) {
        let family = classify_exact(&entry.address)
            .map(|family| family.title())
            .unwrap_or("?");
        println!("{}\t{}\t{}", entry.nickname, entry.address, family);
    }
    Ok(())
}

async fn scan_input(
    store: &dyn NicknameStore,
    config: &Config,
    input: &str,
    html: bool,
) -> Result<()> {
    let text = if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        text
    } else {
        fs::read_to_string(input).with_context(|| format!("reading {input}"))?
    };

    let mut doc = scan::document_from_text(&text)?;
    let mut cache = NicknameCache::new();
    cache.replace(store.get().await?);
    let report = DomRewriter::from_config(config).scan_document(&mut doc, &cache);
    tracing::info!(
        examined = report.text_nodes_examined,
        labels = report.labels_created,
        "scan complete"
    );

    if html {
        println!("{}", inner_html(&doc, doc.body()));
    } else {
        println!("{}", scan::render_text(&doc));
    }
    Ok(())
}

fn run_manage(runtime: &Runtime, store: &SqliteNicknameStore, store_label: &str) -> Result<()> {
    let mut state = ManageState::new();
    runtime.block_on(state.reload(store));

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = manage_loop(&mut terminal, runtime, store, store_label, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

fn manage_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    runtime: &Runtime,
    store: &SqliteNicknameStore,
    store_label: &str,
    state: &mut ManageState,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let mut clipboard = SystemClipboard::new();

    loop {
        terminal.draw(|f| ui::draw(f, state, store_label))?;
        if state.should_quit {
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(state, key, runtime, store, &mut clipboard);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            state.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn handle_key(
    state: &mut ManageState,
    key: KeyEvent,
    runtime: &Runtime,
    store: &dyn NicknameStore,
    clipboard: &mut dyn Clipboard,
) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    let result = match state.mode() {
        Mode::Browse => {
            handle_browse_key(state, key, runtime, store, clipboard);
            Ok(())
        }
        Mode::Form(_) => handle_form_key(state, key, runtime, store),
        Mode::ConfirmDelete { .. } => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                runtime.block_on(state.confirm_delete(store)).map(|_| ())
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                state.cancel();
                Ok(())
            }
            _ => Ok(()),
        },
    };

    if let Err(err) = result {
        state.cancel();
        state.set_status(format!("Write failed: {err:#}"), StatusLevel::Error);
    }
}

fn handle_browse_key(
    state: &mut ManageState,
    key: KeyEvent,
    runtime: &Runtime,
    store: &dyn NicknameStore,
    clipboard: &mut dyn Clipboard,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), mods) if mods.contains(KeyModifiers::CONTROL) => {
            state.should_quit = true;
        }
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => state.should_quit = true,
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => state.select_next(),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => state.select_prev(),
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => state.go_to_top(),
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => state.go_to_bottom(),
        (KeyCode::Char('a'), _) => state.start_add(),
        (KeyCode::Char('e'), _) | (KeyCode::Enter, _) => state.start_edit(),
        (KeyCode::Char('d'), _) | (KeyCode::Delete, _) => state.request_delete(),
        (KeyCode::Char('r'), _) => runtime.block_on(state.reload(store)),
        (KeyCode::Char('y'), _) => {
            state.copy_selected(clipboard);
        }
        _ => {}
    }
}

fn handle_form_key(
    state: &mut ManageState,
    key: KeyEvent,
    runtime: &Runtime,
    store: &dyn NicknameStore,
) -> Result<()> {
    match key.code {
        KeyCode::Esc => state.cancel(),
        KeyCode::Enter => {
            runtime.block_on(state.submit_form(store))?;
        }
        KeyCode::Tab | KeyCode::BackTab => state.toggle_field(),
        KeyCode::Backspace => state.pop_char(),
        KeyCode::Char(ch) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(());
            }
            state.push_char(ch);
        }
        _ => {}
    }
    Ok(())
}
