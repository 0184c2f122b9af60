use std::{
    env::current_exe,
    fs,
    io::stdout,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, bail};
use backend::{BotOperationUpdate, FarmingStatus, Settings};
use clap::Parser;
use fern::Dispatch;
use log::{LevelFilter, debug, info, warn};
use opencv::{
    core::{Mat, MatTraitConst, MatTraitConstManual},
    imgcodecs::{IMREAD_COLOR, imread},
    imgproc::{COLOR_BGR2BGRA, cvt_color_def},
};
use platforms::{
    capture::{Frame, FrameSlot},
    input::{Emitter, KeyKind, MouseKind},
};
use tokio::sync::broadcast::error::RecvError;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "bmp"];

/// Replays captured game screenshots through the farming loop and logs every input it decides on.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory of screenshots, replayed in file name order.
    frames: PathBuf,

    /// Frames pushed per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,

    /// Restarts from the first screenshot after the last one.
    #[arg(long = "loop")]
    repeat: bool,

    /// JSON settings file used instead of the stored settings.
    #[arg(long)]
    settings: Option<PathBuf>,
}

/// An [`Emitter`] that only logs what would have been sent to the client.
#[derive(Debug)]
struct LoggingEmitter;

impl Emitter for LoggingEmitter {
    fn send_key_down(&self, kind: KeyKind) -> platforms::Result<()> {
        debug!(target: "input", "key down {kind:?}");
        Ok(())
    }

    fn send_key_up(&self, kind: KeyKind) -> platforms::Result<()> {
        debug!(target: "input", "key up {kind:?}");
        Ok(())
    }

    fn send_key(&self, kind: KeyKind) -> platforms::Result<()> {
        info!(target: "input", "key {kind:?}");
        Ok(())
    }

    fn send_mouse(&self, x: i32, y: i32, kind: MouseKind) -> platforms::Result<()> {
        info!(target: "input", "mouse {kind:?} at ({x}, {y})");
        Ok(())
    }

    fn send_text(&self, text: &str) -> platforms::Result<()> {
        info!(target: "input", "text {text:?}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_path = current_exe()?
        .parent()
        .context("executable has no parent directory")?
        .join("log.txt");
    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(stdout())
        .chain(fern::log_file(log_path)?)
        .apply()?;
    log_panics::init();

    let args = Args::parse();
    let frames = load_frames(&args.frames)?;
    if frames.is_empty() {
        bail!("no screenshot found in {}", args.frames.display());
    }
    info!(target: "runner", "loaded {} screenshots", frames.len());

    let slot = FrameSlot::default();
    let producer = spawn_producer(slot.clone(), frames, args.fps.max(1), args.repeat);
    backend::init(slot, LoggingEmitter);

    if let Some(path) = args.settings {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("cannot read settings {}", path.display()))?;
        let settings = serde_json::from_str::<Settings>(&content)?;
        backend::update_settings(settings).await;
    }
    let mut receiver = backend::status_receiver().await;
    backend::update_operation(BotOperationUpdate::Run).await;

    let mut last = None::<FarmingStatus>;
    loop {
        match receiver.recv().await {
            Ok(status) => {
                log_status(last.as_ref(), &status);
                last = Some(status);
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    if producer.join().is_err() {
        warn!(target: "runner", "screenshot producer panicked");
    }
    if let Some(status) = last {
        info!(target: "runner", "replay finished with {} kills", status.kills);
    }

    Ok(())
}

fn log_status(last: Option<&FarmingStatus>, status: &FarmingStatus) {
    if last.is_none_or(|last| last.stage != status.stage) {
        info!(
            target: "runner",
            "stage {} hp {} mp {} fp {} target {}",
            status.stage, status.hp, status.mp, status.fp, status.target_hp
        );
    }
    if last.is_some_and(|last| last.kills != status.kills) {
        info!(
            target: "runner",
            "kill {} at {:.1}/min, searched {:?} fought {:?}",
            status.kills, status.kills_per_minute, status.last_search, status.last_fight
        );
    }
}

fn load_frames(dir: &Path) -> Result<Vec<Frame>> {
    let mut paths = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect::<Vec<_>>();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        match load_frame(&path) {
            Ok(frame) => frames.push(frame),
            Err(err) => warn!(target: "runner", "skipping {}: {err}", path.display()),
        }
    }

    Ok(frames)
}

fn load_frame(path: &Path) -> Result<Frame> {
    let bgr = imread(&path.to_string_lossy(), IMREAD_COLOR)?;
    if bgr.empty() {
        bail!("not a readable image");
    }
    let mut bgra = Mat::default();
    cvt_color_def(&bgr, &mut bgra, COLOR_BGR2BGRA)?;

    Ok(Frame::new(bgra.cols(), bgra.rows(), bgra.data_bytes()?.to_vec())?)
}

fn spawn_producer(slot: FrameSlot, frames: Vec<Frame>, fps: u32, repeat: bool) -> JoinHandle<()> {
    let interval = Duration::from_secs(1) / fps;

    thread::spawn(move || {
        loop {
            for frame in &frames {
                slot.push(frame.clone());
                thread::sleep(interval);
            }
            if !repeat {
                break;
            }
        }
        slot.close();
    })
}
