//! mpv-backed `PlayerEngine`.
//!
//! Each surface gets its own idle mpv process. The engine talks to it over the
//! JSON IPC socket: commands go out through an unbounded channel to a writer,
//! and a reader task turns mpv events into `MpvMessage`s that `poll_event`
//! folds into the cached state. The engine is ready once the socket accepts a
//! connection and the property observers are registered.

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBufReader},
  net::{UnixStream, unix::OwnedWriteHalf},
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::engine::{EngineEvent, EngineState, PlayerEngine, Surface};

const TIME_POS_ID: u64 = 1;
const PAUSE_ID: u64 = 2;

#[derive(Debug, Clone, PartialEq)]
enum MpvMessage {
  Connected,
  TimePos(f64),
  Pause(bool),
  StartFile,
  PlaybackRestart,
  EndFile { eof: bool },
  Failed(String),
}

pub struct MpvEngine {
  surface: Surface,
  _process: Option<TokioChild>,
  socket_path: Option<PathBuf>,
  cmd_tx: mpsc::UnboundedSender<Value>,
  msg_rx: mpsc::UnboundedReceiver<MpvMessage>,
  io_handle: Option<JoinHandle<()>>,
  ready: bool,
  state: EngineState,
  time_pos: f64,
  paused: bool,
}

impl MpvEngine {
  /// Start an idle mpv for `surface`. Returns immediately; readiness is
  /// reported later through `poll_event`.
  pub fn spawn(surface: Surface, with_video: bool) -> Result<Self> {
    let socket_path =
      std::env::temp_dir().join(format!("amfilter-mpv-{}-{}.sock", surface.label(), std::process::id()));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args([
      "--idle=yes",
      "--no-terminal",
      "--keep-open=no",
      &format!("--input-ipc-server={}", socket_path_str),
      &format!("--title=amfilter ({})", surface),
    ]);
    if !with_video {
      cmd.arg("--no-video");
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let io_handle = tokio::spawn(run_ipc(surface, socket_path.clone(), cmd_rx, msg_tx));
    info!(%surface, with_video, socket = %socket_path_str, "mpv: spawned");

    Ok(Self::from_parts(surface, Some(child), Some(socket_path), cmd_tx, msg_rx, Some(io_handle)))
  }

  fn from_parts(
    surface: Surface,
    process: Option<TokioChild>,
    socket_path: Option<PathBuf>,
    cmd_tx: mpsc::UnboundedSender<Value>,
    msg_rx: mpsc::UnboundedReceiver<MpvMessage>,
    io_handle: Option<JoinHandle<()>>,
  ) -> Self {
    Self {
      surface,
      _process: process,
      socket_path,
      cmd_tx,
      msg_rx,
      io_handle,
      ready: false,
      state: EngineState::Unstarted,
      time_pos: 0.0,
      paused: false,
    }
  }

  fn send(&self, command: Value) {
    if self.cmd_tx.send(json!({ "command": command })).is_err() {
      warn!(surface = %self.surface, "mpv: IPC writer gone, command dropped");
    }
  }

  fn set_state(&mut self, next: EngineState) -> Option<EngineEvent> {
    if next == self.state {
      return None;
    }
    self.state = next;
    Some(EngineEvent::StateChange(next))
  }
}

impl PlayerEngine for MpvEngine {
  fn load_video_by_id(&mut self, video_id: &str, start_seconds: f64) {
    let url = format!("{}{}", constants().watch_url_prefix, video_id);
    self.send(json!(["set_property", "start", format!("{:.3}", start_seconds.max(0.0))]));
    self.send(json!(["loadfile", url, "replace"]));
    self.time_pos = start_seconds;
    self.state = EngineState::Buffering;
  }

  fn play_video(&mut self) {
    self.send(json!(["set_property", "pause", false]));
    self.paused = false;
    if self.state == EngineState::Paused {
      self.state = EngineState::Playing;
    }
  }

  fn pause_video(&mut self) {
    self.send(json!(["set_property", "pause", true]));
    self.paused = true;
    if matches!(self.state, EngineState::Playing | EngineState::Buffering) {
      self.state = EngineState::Paused;
    }
  }

  fn stop_video(&mut self) {
    self.send(json!(["stop"]));
    self.state = EngineState::Unstarted;
    self.time_pos = 0.0;
  }

  fn current_time(&self) -> f64 {
    self.time_pos
  }

  fn player_state(&self) -> EngineState {
    self.state
  }

  fn is_ready(&self) -> bool {
    self.ready
  }

  fn poll_event(&mut self) -> Option<EngineEvent> {
    while let Ok(msg) = self.msg_rx.try_recv() {
      let event = match msg {
        MpvMessage::Connected => {
          self.ready = true;
          Some(EngineEvent::Ready)
        }
        MpvMessage::TimePos(t) => {
          self.time_pos = t;
          None
        }
        MpvMessage::Pause(paused) => {
          self.paused = paused;
          match self.state {
            EngineState::Playing | EngineState::Paused => {
              self.set_state(if paused { EngineState::Paused } else { EngineState::Playing })
            }
            _ => None,
          }
        }
        MpvMessage::StartFile => self.set_state(EngineState::Buffering),
        MpvMessage::PlaybackRestart => {
          self.set_state(if self.paused { EngineState::Paused } else { EngineState::Playing })
        }
        MpvMessage::EndFile { eof } => self.set_state(if eof { EngineState::Ended } else { EngineState::Unstarted }),
        MpvMessage::Failed(err) => {
          warn!(surface = %self.surface, err = %err, "mpv: IPC failed");
          self.ready = false;
          Some(EngineEvent::Failed(err))
        }
      };
      if event.is_some() {
        return event;
      }
    }
    None
  }
}

impl Drop for MpvEngine {
  fn drop(&mut self) {
    if let Some(handle) = self.io_handle.take() {
      handle.abort();
    }
    if let Some(path) = self.socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
  }
}

// --- IPC task ---

async fn write_command(writer: &mut OwnedWriteHalf, command: &Value) -> Result<()> {
  let mut line = serde_json::to_vec(command).context("Failed to encode mpv command")?;
  line.push(b'\n');
  writer.write_all(&line).await.context("Failed to write to mpv IPC socket")
}

async fn connect(socket_path: &Path) -> Result<UnixStream> {
  let c = constants();
  let mut last_err = None;
  for attempt in 0..c.ipc_connect_attempts {
    tokio::time::sleep(Duration::from_millis(c.ipc_connect_delay_ms * u64::from(attempt + 1))).await;
    match UnixStream::connect(socket_path).await {
      Ok(stream) => return Ok(stream),
      Err(e) => {
        debug!(attempt, err = %e, "mpv: IPC connect failed, retrying");
        last_err = Some(e);
      }
    }
  }
  Err(anyhow!("mpv IPC socket never came up: {:?}", last_err))
}

async fn run_ipc(
  surface: Surface,
  socket_path: PathBuf,
  mut cmd_rx: mpsc::UnboundedReceiver<Value>,
  msg_tx: mpsc::UnboundedSender<MpvMessage>,
) {
  let stream = match connect(&socket_path).await {
    Ok(s) => s,
    Err(e) => {
      let _ = msg_tx.send(MpvMessage::Failed(format!("{:#}", e)));
      return;
    }
  };
  let (read_half, mut writer) = stream.into_split();

  for observe in [
    json!({ "command": ["observe_property", TIME_POS_ID, "time-pos"] }),
    json!({ "command": ["observe_property", PAUSE_ID, "pause"] }),
  ] {
    if let Err(e) = write_command(&mut writer, &observe).await {
      let _ = msg_tx.send(MpvMessage::Failed(format!("{:#}", e)));
      return;
    }
  }
  debug!(%surface, "mpv: IPC connected");
  if msg_tx.send(MpvMessage::Connected).is_err() {
    return;
  }

  let mut lines = TokioBufReader::new(read_half).lines();
  loop {
    tokio::select! {
      cmd = cmd_rx.recv() => {
        let Some(cmd) = cmd else { break };
        if let Err(e) = write_command(&mut writer, &cmd).await {
          let _ = msg_tx.send(MpvMessage::Failed(format!("{:#}", e)));
          break;
        }
      }
      line = lines.next_line() => {
        match line {
          Ok(Some(line)) => {
            if let Some(msg) = parse_event(&line)
              && msg_tx.send(msg).is_err()
            {
              break;
            }
          }
          Ok(None) => {
            let _ = msg_tx.send(MpvMessage::Failed("mpv closed the IPC socket".to_string()));
            break;
          }
          Err(e) => {
            let _ = msg_tx.send(MpvMessage::Failed(format!("Failed to read from mpv IPC socket: {}", e)));
            break;
          }
        }
      }
    }
  }
}

/// Map one line of mpv IPC output to a message. Command replies and events we
/// don't track yield `None`.
fn parse_event(line: &str) -> Option<MpvMessage> {
  let val: Value = serde_json::from_str(line).ok()?;
  match val.get("event")?.as_str()? {
    "property-change" => match val.get("id")?.as_u64()? {
      TIME_POS_ID => val.get("data")?.as_f64().map(MpvMessage::TimePos),
      PAUSE_ID => val.get("data")?.as_bool().map(MpvMessage::Pause),
      _ => None,
    },
    "start-file" => Some(MpvMessage::StartFile),
    "playback-restart" => Some(MpvMessage::PlaybackRestart),
    "end-file" => Some(MpvMessage::EndFile { eof: val.get("reason").and_then(Value::as_str) == Some("eof") }),
    _ => None,
  }
}
