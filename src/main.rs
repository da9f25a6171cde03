mod action;
mod api;
mod app;
mod config;
mod constants;
mod engine;
mod input;
mod logging;
mod mpv;
mod search;
mod server;
mod session;
mod store;
mod surface;
mod theme;
mod ui;
mod video;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
  },
};
use std::io;
use std::time::Duration;
use tracing::info;

use api::ApiClient;
use app::App;
use config::Config;
use constants::constants;
use engine::Surface;
use mpv::MpvEngine;
use surface::SurfaceController;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Base URL of the search proxy (default: config file, then the built-in address)
  #[arg(long)]
  api_base: Option<String>,

  /// Play sound only; the modal player opens no video window
  #[arg(long)]
  audio_only: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the proxy that keeps the YouTube API key off the client
  Serve {
    #[arg(long, default_value_t = constants().default_listen_addr.clone())]
    addr: String,
  },
  /// Print shell completions to stdout
  Completions { shell: clap_complete::Shell },
}

// --- Main ---

fn main() -> Result<()> {
  let args = Args::parse();

  match args.command {
    Some(Command::Serve { ref addr }) => {
      logging::init_stderr()?;
      server::serve(addr)
    }
    Some(Command::Completions { shell }) => {
      let mut cmd = Args::command();
      let name = cmd.get_name().to_string();
      clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
      Ok(())
    }
    None => {
      let _guard = logging::init_file()?;
      let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
      runtime.block_on(run_tui(args))
    }
  }
}

async fn run_tui(args: Args) -> Result<()> {
  let config = Config::load();
  let base = args
    .api_base
    .clone()
    .or_else(|| config.api_base.clone())
    .unwrap_or_else(|| constants().default_api_base.clone());
  let client = ApiClient::new(&base)?;
  let audio_only = args.audio_only || config.audio_only.unwrap_or(false);

  let modal = MpvEngine::spawn(Surface::Modal, !audio_only)?;
  let mini = MpvEngine::spawn(Surface::Mini, false)?;
  info!(api_base = %client.base(), audio_only, "starting");

  let mut app = App::new(config, client, SurfaceController::new(modal, mini));

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  execute!(io::stdout(), EnableMouseCapture)?;
  let result = run(&mut terminal, &mut app);
  execute!(io::stdout(), DisableMouseCapture)?;
  ratatui::restore();
  result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App<MpvEngine>) -> Result<()> {
  loop {
    app.tick();

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(app, key),
        Event::Mouse(mouse) => input::handle_mouse_event(app, mouse),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  info!("quit");
  Ok(())
}
