use anyhow::Result;

use ppe_detect::detect::{Detection, StubBackend};
use ppe_detect::display::{DisplaySurface, Key};
use ppe_detect::frame::{CANVAS_HEIGHT, CANVAS_WIDTH};
use ppe_detect::ingest::CameraConfig;
use ppe_detect::{
    CancellationToken, DetectionSession, Frame, RunConfig, SessionError, SessionErrorKind,
    SourceHandle, StopReason,
};

/// Display that records what it was shown and replays scripted keys.
#[derive(Default)]
struct RecordingDisplay {
    sizes: Vec<(u32, u32)>,
    keys: Vec<Option<Key>>,
    polls: usize,
    closes: usize,
}

impl RecordingDisplay {
    fn with_keys(keys: Vec<Option<Key>>) -> Self {
        Self {
            keys,
            ..Self::default()
        }
    }
}

impl DisplaySurface for RecordingDisplay {
    fn name(&self) -> &str {
        "recording"
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.sizes.push((frame.width(), frame.height()));
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<Key>> {
        let key = self.keys.get(self.polls).copied().flatten();
        self.polls += 1;
        Ok(key)
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

fn session() -> DetectionSession {
    DetectionSession::new(Box::new(StubBackend::with_detections(vec![
        Detection::new([10.0, 40.0, 60.0, 90.0], 2, 0.87),
        Detection::new([70.0, 40.0, 120.0, 90.0], 5, 0.95),
    ])))
}

fn camera(device: &str) -> SourceHandle {
    let mut config = CameraConfig::for_index(0);
    config.device = device.to_string();
    SourceHandle::Camera(config)
}

#[test]
fn missing_file_fails_without_presenting() {
    let mut session = session();
    let mut display = RecordingDisplay::default();
    let token = CancellationToken::new();

    let err = session
        .run(
            SourceHandle::file("/nonexistent/site.mp4"),
            &RunConfig::file(),
            &mut display,
            &token,
        )
        .unwrap_err();

    let typed = err.downcast_ref::<SessionError>().expect("typed error");
    assert_eq!(typed.kind, SessionErrorKind::InvalidSourcePath);
    assert_eq!(RunConfig::file().alert_for(&err), "Please select a valid video file.");
    assert!(display.sizes.is_empty());
    assert_eq!(display.polls, 0);
    assert_eq!(display.closes, 1);
}

#[test]
fn unavailable_camera_reports_device_error() {
    let mut session = session();
    let mut display = RecordingDisplay::default();

    let err = session
        .run(
            camera("stub://cam?width=0"),
            &RunConfig::live(),
            &mut display,
            &CancellationToken::new(),
        )
        .unwrap_err();

    let typed = err.downcast_ref::<SessionError>().expect("typed error");
    assert_eq!(typed.kind, SessionErrorKind::DeviceUnavailable);
    assert_eq!(RunConfig::live().alert_for(&err), "Failed to open the camera.");
    assert!(display.sizes.is_empty());
}

#[test]
fn file_plays_to_end_at_native_size() -> Result<()> {
    let mut session = session();
    let mut display = RecordingDisplay::default();

    let summary = session.run(
        SourceHandle::file("stub://clip?frames=4&width=320&height=240"),
        &RunConfig::file(),
        &mut display,
        &CancellationToken::new(),
    )?;

    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.frames_processed, 4);
    assert_eq!(display.sizes, vec![(320, 240); 4]);
    assert_eq!(display.closes, 1);
    Ok(())
}

#[test]
fn live_frames_are_resized_to_canvas() -> Result<()> {
    let mut session = session();
    let mut display = RecordingDisplay::default();

    let summary = session.run(
        camera("stub://cam?frames=2&width=320&height=240"),
        &RunConfig::live(),
        &mut display,
        &CancellationToken::new(),
    )?;

    assert_eq!(summary.frames_processed, 2);
    assert_eq!(display.sizes, vec![(CANVAS_WIDTH, CANVAS_HEIGHT); 2]);
    Ok(())
}

#[test]
fn quit_key_stops_mid_stream() -> Result<()> {
    let mut session = session();
    let mut display = RecordingDisplay::with_keys(vec![None, Some(Key::Char('p')), Some(Key::Char('q'))]);
    let token = CancellationToken::new();

    let summary = session.run(camera("stub://cam"), &RunConfig::live(), &mut display, &token)?;

    assert_eq!(summary.stop, StopReason::QuitRequested);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(display.sizes.len(), 3);
    assert_eq!(display.closes, 1);
    assert!(token.is_cancelled());
    Ok(())
}

#[test]
fn escape_also_quits() -> Result<()> {
    let mut session = session();
    let mut display = RecordingDisplay::with_keys(vec![Some(Key::Escape)]);

    let summary = session.run(
        SourceHandle::file("stub://clip"),
        &RunConfig::file(),
        &mut display,
        &CancellationToken::new(),
    )?;

    assert_eq!(summary.stop, StopReason::QuitRequested);
    assert_eq!(summary.frames_processed, 1);
    Ok(())
}

#[test]
fn cancelled_token_stops_before_first_frame() -> Result<()> {
    let mut session = session();
    let mut display = RecordingDisplay::default();
    let token = CancellationToken::new();
    token.cancel();

    let summary = session.run(camera("stub://cam"), &RunConfig::live(), &mut display, &token)?;

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.frames_processed, 0);
    assert!(display.sizes.is_empty());
    assert_eq!(display.closes, 1);
    Ok(())
}

#[test]
fn session_is_reusable_across_runs() -> Result<()> {
    let mut session = session();
    let token = CancellationToken::new();

    let mut first = RecordingDisplay::with_keys(vec![Some(Key::Char('q'))]);
    session.run(camera("stub://cam"), &RunConfig::live(), &mut first, &token)?;

    token.reset();
    let mut second = RecordingDisplay::default();
    let summary = session.run(
        SourceHandle::file("stub://clip?frames=2"),
        &RunConfig::file(),
        &mut second,
        &token,
    )?;
    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.frames_processed, 2);
    Ok(())
}
