//! ppe_detect - run the PPE detector over a video file or a live camera
//!
//! With a subcommand the binary performs that one action. Without one it
//! shows a two-action menu and returns to it after every run, successful or
//! not. Press `q` or Escape in the window to stop a run; Ctrl-C stops a run in
//! progress, or exits when idle.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ppe_detect::config::{AppConfig, ConfigOverrides, DisplayBackend};
use ppe_detect::detect::load_backend;
use ppe_detect::display::open_display;
use ppe_detect::ui::Ui;
use ppe_detect::{
    CancellationToken, DetectionSession, RunConfig, SourceHandle, PPE_CLASSES,
};

const WINDOW_TITLE: &str = "Object Detection GUI";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Model to load instead of the configured one (ONNX file or stub://name).
    #[arg(long, value_name = "PATH")]
    model: Option<String>,
    /// Display backend (auto|window|headless).
    #[arg(long, value_name = "BACKEND")]
    display: Option<String>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select Video for Detection: play a recorded file through the detector.
    Video {
        /// Local video file.
        path: String,
    },
    /// Start Live Detection: run the detector on a camera.
    Live {
        /// Camera index (default: the configured camera, normally 0).
        #[arg(long)]
        device: Option<u32>,
    },
}

enum Action {
    Video(String),
    Live(Option<u32>),
}

struct App {
    cfg: AppConfig,
    ui: Ui,
    session: DetectionSession,
    token: CancellationToken,
    running: Arc<AtomicBool>,
}

impl App {
    /// Run one action to completion. Failures are alerted, never propagated.
    fn perform(&mut self, action: Action) -> bool {
        let (handle, run_config) = match action {
            Action::Video(path) => (
                SourceHandle::File(self.cfg.file.file_config(path)),
                RunConfig::file(),
            ),
            Action::Live(index) => (
                SourceHandle::Camera(self.cfg.camera.camera_config(index)),
                RunConfig::live(),
            ),
        };
        log::info!("starting run on {}", handle.describe());

        let mut display = match open_display(&self.cfg.display) {
            Ok(display) => display,
            Err(err) => {
                self.ui.alert(WINDOW_TITLE, &format!("{:#}", err));
                return false;
            }
        };

        self.token.reset();
        self.running.store(true, Ordering::SeqCst);
        let outcome = self
            .session
            .run(handle, &run_config, display.as_mut(), &self.token);
        self.running.store(false, Ordering::SeqCst);

        match outcome {
            Ok(summary) => {
                self.ui.report(&summary);
                true
            }
            Err(err) => {
                log::debug!("run failed: {:?}", err);
                self.ui.alert(WINDOW_TITLE, &run_config.alert_for(&err));
                false
            }
        }
    }

    fn menu(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            eprintln!();
            eprintln!("{}", WINDOW_TITLE);
            eprintln!("  1) Select Video for Detection");
            eprintln!("  2) Start Live Detection");
            eprintln!("  q) Quit");
            let Some(choice) = prompt(&mut lines, "> ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => {
                    let Some(path) = prompt(&mut lines, "Video file: ")? else {
                        return Ok(());
                    };
                    self.perform(Action::Video(path));
                }
                "2" => {
                    self.perform(Action::Live(None));
                }
                "q" | "quit" => return Ok(()),
                "" => {}
                other => eprintln!("unknown choice '{}'", other),
            }
        }
    }
}

/// Print `label` and read one trimmed line; `None` at end of input.
fn prompt<B: BufRead>(lines: &mut std::io::Lines<B>, label: &str) -> Result<Option<String>> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::from_flag(Some(&args.ui), std::io::stderr().is_terminal());

    let overrides = ConfigOverrides {
        model_path: args.model,
        display: args
            .display
            .as_deref()
            .map(str::parse::<DisplayBackend>)
            .transpose()?,
    };
    let cfg = {
        let _stage = ui.stage("Load configuration");
        AppConfig::load(args.config.as_deref(), &overrides)?
    };
    let detector = {
        let _stage = ui.stage("Load detector");
        load_backend(&cfg.model, PPE_CLASSES.len())?
    };
    let session = DetectionSession::new(detector);
    log::info!(
        "detector {} ready (model {}, display {:?})",
        session.detector_name(),
        cfg.model.path,
        cfg.display.backend
    );

    let token = CancellationToken::new();
    let running = Arc::new(AtomicBool::new(false));
    {
        let token = token.clone();
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            if running.load(Ordering::SeqCst) {
                token.cancel();
            } else {
                std::process::exit(130);
            }
        })?;
    }

    let mut app = App {
        cfg,
        ui,
        session,
        token,
        running,
    };

    let ok = match args.command {
        Some(Command::Video { path }) => app.perform(Action::Video(path)),
        Some(Command::Live { device }) => app.perform(Action::Live(device)),
        None => {
            app.menu()?;
            true
        }
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
