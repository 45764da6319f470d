//! Live capture pipeline.
//!
//! One background thread opens the frame source and publishes frames into a
//! [`FrameSlot`]. The UI calls [`CapturePipeline::poll`] on a timer: it
//! advances the state machine, drains at most one frame, and keeps that
//! frame as the exportable one.
//!
//! State flow: Stopped -> Starting -> Streaming -> Stopping -> Stopped.
//! A failed open, a failed grab or an open timeout all fall back to Stopped.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::frame::Frame;
use super::slot::FrameSlot;
use super::source::{source_factory, SourceFactory};
use crate::config::CameraConfig;

/// Pipeline state as seen by the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Stopped,
    /// Acquisition thread is opening the source
    Starting,
    Streaming,
    /// Stop requested; waiting for the thread to exit
    Stopping,
}

impl CaptureState {
    pub fn description(&self) -> &'static str {
        match self {
            CaptureState::Stopped => "Stopped",
            CaptureState::Starting => "Starting...",
            CaptureState::Streaming => "Streaming",
            CaptureState::Stopping => "Stopping...",
        }
    }
}

/// Something the UI should react to, reported by [`CapturePipeline::poll`].
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// Source opened; frames will follow
    Started { source: String },
    /// A new frame was retained
    NewFrame,
    /// Acquisition failed; the pipeline is stopping or stopped
    Error(String),
    /// The pipeline reached Stopped
    Stopped,
}

/// Timing and resolution settings, taken from the `camera` config section.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub preview_size: (u32, u32),
    pub still_size: (u32, u32),
    pub warmup_frames: u32,
    pub open_timeout: Duration,
    pub stop_grace: Duration,
}

impl From<&CameraConfig> for PipelineSettings {
    fn from(config: &CameraConfig) -> Self {
        Self {
            preview_size: config.preview_size,
            still_size: config.still_size,
            warmup_frames: config.warmup_frames,
            open_timeout: Duration::from_millis(config.open_timeout_ms),
            stop_grace: Duration::from_millis(config.stop_grace_ms),
        }
    }
}

/// Messages from the acquisition thread.
#[derive(Debug)]
enum WorkerMessage {
    Opened(String),
    Failed(String),
    Finished,
}

/// Handle to a running acquisition thread.
struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    messages: Receiver<WorkerMessage>,
    started_at: Instant,
    stop_requested_at: Option<Instant>,
}

pub struct CapturePipeline {
    factory: SourceFactory,
    settings: PipelineSettings,
    state: CaptureState,
    slot: Arc<FrameSlot>,
    worker: Option<Worker>,
    /// Most recent frame handed to the UI; the only frame that can be exported
    retained: Option<Frame>,
    frames_received: u64,
    stills_captured: u64,
    source_name: Option<String>,
}

impl CapturePipeline {
    pub fn new(factory: SourceFactory, settings: PipelineSettings) -> Self {
        Self {
            factory,
            settings,
            state: CaptureState::Stopped,
            slot: Arc::new(FrameSlot::new()),
            worker: None,
            retained: None,
            frames_received: 0,
            stills_captured: 0,
            source_name: None,
        }
    }

    /// Pipeline using the backend selected in config.json.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(source_factory(config.clone()), PipelineSettings::from(config))
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == CaptureState::Stopped
    }

    /// Frame most recently shown (streamed or still).
    pub fn latest_frame(&self) -> Option<&Frame> {
        self.retained.as_ref()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Frames overwritten in the slot before the UI picked them up.
    pub fn frames_dropped(&self) -> u64 {
        self.slot.dropped()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Starts streaming. Returns `Ok(false)` if the pipeline is not stopped.
    ///
    /// Never blocks on the camera: the source is opened on the acquisition
    /// thread and the result arrives through [`CapturePipeline::poll`].
    pub fn start(&mut self) -> Result<bool> {
        if self.state != CaptureState::Stopped {
            log::debug!("Start ignored: pipeline is {}", self.state.description());
            return Ok(false);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (sender, messages) = channel();
        self.slot.clear();
        self.slot.reset_counters();

        let handle = {
            let factory = Arc::clone(&self.factory);
            let slot = Arc::clone(&self.slot);
            let stop = Arc::clone(&stop);
            let size = self.settings.preview_size;
            let warmup = self.settings.warmup_frames;
            thread::Builder::new()
                .name("camera-acquisition".to_string())
                .spawn(move || run_acquisition(factory, size, warmup, slot, stop, sender))
                .context("Failed to spawn acquisition thread")?
        };

        self.worker = Some(Worker {
            handle,
            stop,
            messages,
            started_at: Instant::now(),
            stop_requested_at: None,
        });
        self.frames_received = 0;
        self.state = CaptureState::Starting;
        log::info!(
            "Camera starting ({}x{})",
            self.settings.preview_size.0,
            self.settings.preview_size.1
        );
        Ok(true)
    }

    /// Asks the acquisition thread to exit. Returns false if there was nothing to stop.
    ///
    /// Safe to call after the thread has already died on its own; the
    /// transition to Stopped is completed by [`CapturePipeline::poll`].
    pub fn stop(&mut self) -> bool {
        if !matches!(self.state, CaptureState::Starting | CaptureState::Streaming) {
            return false;
        }

        if let Some(worker) = self.worker.as_mut() {
            worker.stop.store(true, Ordering::SeqCst);
            worker.stop_requested_at = Some(Instant::now());
        }
        self.state = CaptureState::Stopping;
        log::info!("Camera stop requested");
        true
    }

    /// Advances the pipeline. Call periodically from the UI thread.
    pub fn poll(&mut self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        let Some(worker) = self.worker.as_ref() else {
            return events;
        };

        let mut finished = false;
        loop {
            match worker.messages.try_recv() {
                Ok(WorkerMessage::Opened(name)) => {
                    if self.state == CaptureState::Starting {
                        log::info!("Camera streaming from {}", name);
                        self.state = CaptureState::Streaming;
                        events.push(PipelineEvent::Started {
                            source: name.clone(),
                        });
                    }
                    self.source_name = Some(name);
                }
                Ok(WorkerMessage::Failed(msg)) => {
                    log::error!("Camera error: {}", msg);
                    events.push(PipelineEvent::Error(msg));
                    finished = true;
                }
                Ok(WorkerMessage::Finished) => finished = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Sender dropped without a final message: the thread panicked
                    if !finished {
                        events.push(PipelineEvent::Error(
                            "Acquisition thread exited unexpectedly".to_string(),
                        ));
                    }
                    finished = true;
                    break;
                }
            }
        }

        if !finished && self.state == CaptureState::Starting {
            if worker.started_at.elapsed() > self.settings.open_timeout {
                let msg = format!(
                    "Camera did not open within {} ms",
                    self.settings.open_timeout.as_millis()
                );
                log::error!("{}", msg);
                worker.stop.store(true, Ordering::SeqCst);
                events.push(PipelineEvent::Error(msg));
                finished = true;
            }
        }

        if !finished && self.state == CaptureState::Stopping {
            let waited = worker
                .stop_requested_at
                .map_or(Duration::ZERO, |t| t.elapsed());
            if worker.handle.is_finished() || waited > self.settings.stop_grace {
                finished = true;
            }
        }

        if self.state == CaptureState::Streaming {
            if let Some(frame) = self.slot.take() {
                self.frames_received += 1;
                self.retained = Some(frame);
                events.push(PipelineEvent::NewFrame);
            }
        }

        if finished {
            self.finish_worker();
            events.push(PipelineEvent::Stopped);
        }

        events
    }

    /// Joins the worker if it has exited, otherwise detaches it, and settles in Stopped.
    fn finish_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            if worker.handle.is_finished() {
                if worker.handle.join().is_err() {
                    log::error!("Acquisition thread panicked");
                }
            } else {
                log::warn!("Acquisition thread still busy after stop; detaching it");
            }
        }

        self.slot.clear();
        self.state = CaptureState::Stopped;
        log::info!(
            "Camera stopped ({} frames grabbed, {} shown, {} dropped)",
            self.slot.published(),
            self.frames_received,
            self.slot.dropped()
        );
    }

    /// Stops and waits up to the grace period for the thread to exit. For application exit.
    pub fn shutdown(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.stop();

        let deadline = Instant::now() + self.settings.stop_grace;
        while Instant::now() < deadline {
            if self.worker.as_ref().is_none_or(|w| w.handle.is_finished()) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.finish_worker();
    }

    /// Captures one frame at the still resolution and retains it.
    ///
    /// Opens the source, discards the warm-up frames, grabs one frame and
    /// releases the source again. Refused unless the pipeline is stopped.
    pub fn capture_still(&mut self) -> Result<&Frame> {
        if self.state != CaptureState::Stopped {
            bail!("Stop the live preview before capturing a still");
        }

        let size = self.settings.still_size;
        let mut source = (self.factory)(size)?;
        for _ in 0..self.settings.warmup_frames {
            source.grab().context("Camera failed during warm-up")?;
        }
        let image = source.grab().context("Failed to capture still")?;
        let name = source.name().to_string();
        drop(source);

        self.stills_captured += 1;
        let frame = Frame::new(image, self.stills_captured);
        log::info!(
            "Captured still #{} from {} ({}x{})",
            frame.sequence,
            name,
            frame.image.width(),
            frame.image.height()
        );
        Ok(&*self.retained.insert(frame))
    }

    /// Writes the retained frame to `path`. Refused if no frame has been retained yet.
    pub fn save_current_frame(&self, path: &Path) -> Result<()> {
        let Some(frame) = self.retained.as_ref() else {
            bail!("No image data to save!");
        };
        frame.save(path)?;
        log::info!("Saved frame #{} to {}", frame.sequence, path.display());
        Ok(())
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of the acquisition thread.
fn run_acquisition(
    factory: SourceFactory,
    size: (u32, u32),
    warmup_frames: u32,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    sender: Sender<WorkerMessage>,
) {
    let mut source = match factory(size) {
        Ok(source) => source,
        Err(e) => {
            let _ = sender.send(WorkerMessage::Failed(format!("{:#}", e)));
            return;
        }
    };

    for _ in 0..warmup_frames {
        if stop.load(Ordering::SeqCst) {
            let _ = sender.send(WorkerMessage::Finished);
            return;
        }
        if let Err(e) = source.grab() {
            let _ = sender.send(WorkerMessage::Failed(format!("Warm-up failed: {:#}", e)));
            return;
        }
    }

    let _ = sender.send(WorkerMessage::Opened(source.name().to_string()));

    let mut sequence = 0u64;
    while !stop.load(Ordering::SeqCst) {
        match source.grab() {
            Ok(image) => {
                sequence += 1;
                slot.publish(Frame::new(image, sequence));
            }
            Err(e) => {
                drop(source);
                let _ = sender.send(WorkerMessage::Failed(format!(
                    "Acquisition failed after {} frames: {:#}",
                    sequence, e
                )));
                return;
            }
        }
    }

    drop(source);
    let _ = sender.send(WorkerMessage::Finished);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::source::FrameSource;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    /// Solid-color source that can be told to fail after a number of grabs.
    struct TestSource {
        size: (u32, u32),
        grabs: usize,
        fail_after: Option<usize>,
        released: Arc<AtomicUsize>,
    }

    impl FrameSource for TestSource {
        fn name(&self) -> &str {
            "test source"
        }

        fn grab(&mut self) -> Result<RgbImage> {
            if self.fail_after.is_some_and(|n| self.grabs >= n) {
                bail!("sensor unplugged");
            }
            self.grabs += 1;
            thread::sleep(Duration::from_millis(1));
            Ok(RgbImage::from_pixel(self.size.0, self.size.1, Rgb([10, 20, 30])))
        }
    }

    impl Drop for TestSource {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Counters {
        opened: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    }

    fn test_factory(fail_after: Option<usize>) -> (SourceFactory, Counters) {
        let opened = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let counters = Counters {
            opened: Arc::clone(&opened),
            released: Arc::clone(&released),
        };
        let factory: SourceFactory =
            Arc::new(move |size: (u32, u32)| -> Result<Box<dyn FrameSource>> {
                opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(TestSource {
                    size,
                    grabs: 0,
                    fail_after,
                    released: Arc::clone(&released),
                }))
            });
        (factory, counters)
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            preview_size: (8, 6),
            still_size: (16, 12),
            warmup_frames: 2,
            open_timeout: Duration::from_secs(5),
            stop_grace: Duration::from_millis(500),
        }
    }

    /// Polls until `done` holds for the collected events, or panics after 5 seconds.
    fn poll_until(
        pipeline: &mut CapturePipeline,
        done: impl Fn(&CapturePipeline, &[PipelineEvent]) -> bool,
    ) -> Vec<PipelineEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        loop {
            events.extend(pipeline.poll());
            if done(pipeline, &events) {
                return events;
            }
            assert!(Instant::now() < deadline, "timed out; events: {:?}", events);
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_start_twice_is_idempotent() {
        let (factory, counters) = test_factory(None);
        let mut pipeline = CapturePipeline::new(factory, settings());

        assert!(pipeline.start().unwrap());
        assert!(!pipeline.start().unwrap());
        poll_until(&mut pipeline, |p, _| p.state() == CaptureState::Streaming);
        assert!(!pipeline.start().unwrap());

        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        pipeline.shutdown();
    }

    #[test]
    fn test_streaming_retains_frames() {
        let (factory, _counters) = test_factory(None);
        let mut pipeline = CapturePipeline::new(factory, settings());
        pipeline.start().unwrap();

        let events = poll_until(&mut pipeline, |p, _| p.frames_received() >= 3);
        assert!(matches!(events.first(), Some(PipelineEvent::Started { .. })));
        assert_eq!(pipeline.source_name(), Some("test source"));
        assert_eq!(pipeline.latest_frame().unwrap().dimensions(), (8, 6));
        pipeline.shutdown();
    }

    #[test]
    fn test_stop_releases_source_once() {
        let (factory, counters) = test_factory(None);
        let mut pipeline = CapturePipeline::new(factory, settings());
        pipeline.start().unwrap();
        poll_until(&mut pipeline, |p, _| p.frames_received() >= 1);

        assert!(pipeline.stop());
        assert!(!pipeline.stop());
        assert_eq!(pipeline.state(), CaptureState::Stopping);
        let events = poll_until(&mut pipeline, |p, _| p.is_stopped());

        assert_eq!(events.last(), Some(&PipelineEvent::Stopped));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        // Retained frame survives the stop
        assert!(pipeline.latest_frame().is_some());
    }

    #[test]
    fn test_open_failure_returns_to_stopped() {
        let factory: SourceFactory =
            Arc::new(|_: (u32, u32)| -> Result<Box<dyn FrameSource>> { bail!("no camera attached") });
        let mut pipeline = CapturePipeline::new(factory, settings());
        pipeline.start().unwrap();

        let events = poll_until(&mut pipeline, |p, _| p.is_stopped());
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Error(msg) if msg.contains("no camera attached"))));
        assert!(pipeline.latest_frame().is_none());

        // Start is available again after the failure
        assert!(pipeline.start().unwrap());
        poll_until(&mut pipeline, |p, _| p.is_stopped());
    }

    #[test]
    fn test_mid_stream_failure_returns_to_stopped() {
        let (factory, counters) = test_factory(Some(10));
        let mut pipeline = CapturePipeline::new(factory, settings());
        pipeline.start().unwrap();

        let events = poll_until(&mut pipeline, |p, _| p.is_stopped());
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Error(msg) if msg.contains("sensor unplugged"))));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);

        // Stopping after the thread died on its own is harmless
        assert!(!pipeline.stop());
        assert!(pipeline.poll().is_empty());
    }

    #[test]
    fn test_open_timeout() {
        let factory: SourceFactory =
            Arc::new(|size: (u32, u32)| -> Result<Box<dyn FrameSource>> {
                thread::sleep(Duration::from_millis(300));
                Ok(Box::new(SlowSource(size)))
            });
        let mut pipeline = CapturePipeline::new(
            factory,
            PipelineSettings {
                open_timeout: Duration::from_millis(50),
                ..settings()
            },
        );
        pipeline.start().unwrap();

        let events = poll_until(&mut pipeline, |p, _| p.is_stopped());
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Error(msg) if msg.contains("did not open"))));
    }

    struct SlowSource((u32, u32));

    impl FrameSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        fn grab(&mut self) -> Result<RgbImage> {
            Ok(RgbImage::new(self.0 .0, self.0 .1))
        }
    }

    #[test]
    fn test_save_refused_before_any_frame() {
        let (factory, _counters) = test_factory(None);
        let pipeline = CapturePipeline::new(factory, settings());

        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let err = pipeline.save_current_frame(&path).unwrap_err();

        assert!(err.to_string().contains("No image data"));
        assert!(!path.exists());
    }

    #[test]
    fn test_capture_still_and_save() {
        let (factory, counters) = test_factory(None);
        let mut pipeline = CapturePipeline::new(factory, settings());

        let frame = pipeline.capture_still().unwrap();
        assert_eq!(frame.dimensions(), (16, 12));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);

        let dir = tempdir().unwrap();
        let path = dir.path().join("still.png");
        pipeline.save_current_frame(&path).unwrap();
        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 12));
    }

    #[test]
    fn test_capture_still_refused_while_streaming() {
        let (factory, _counters) = test_factory(None);
        let mut pipeline = CapturePipeline::new(factory, settings());
        pipeline.start().unwrap();

        assert!(pipeline.capture_still().is_err());
        pipeline.shutdown();
        assert!(pipeline.is_stopped());
    }

    #[test]
    fn test_shutdown_when_stopped_is_noop() {
        let (factory, counters) = test_factory(None);
        let mut pipeline = CapturePipeline::new(factory, settings());
        pipeline.shutdown();
        assert!(pipeline.is_stopped());
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }
}
