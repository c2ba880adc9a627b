use std::sync::mpsc;
use std::time::{Duration, Instant};

use log::{debug, info};
use shared::{BackendClient, RankedLabel, Recognition};
use uuid::Uuid;

/// Hard upper bound on the classification request rate.
pub const PRED_INTERVAL: Duration = Duration::from_millis(180);
/// Centered square crop, as a fraction of the shorter camera dimension.
pub const ROI_SCALE: f32 = 0.6;
/// Side length the crop is downsampled to before encoding.
pub const IMG_SIZE: i32 = 160;
pub const JPEG_QUALITY: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeStatus {
    Idle,
    Running,
    Error,
}

#[derive(Debug)]
pub enum PracticeEvent {
    Recognized(Recognition),
    Failed(String),
}

/// Rate gate for the capture loop: a minimum spacing between attempts and
/// at most one classification in flight. The attempt timestamp advances
/// even when the in-flight check then skips, so a slow response never
/// causes a burst of requests afterwards.
pub struct FrameGate {
    min_interval: Duration,
    last_attempt: Option<Instant>,
    in_flight: bool,
}

impl FrameGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_attempt: None,
            in_flight: false,
        }
    }

    /// Returns true when a classification may start now; the caller must
    /// pair every acquisition with a `finish`.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_attempt = Some(now);
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}

/// Centered square crop covering `scale` of the shorter dimension,
/// as (x, y, side) in source pixels.
pub fn roi_rect(width: u32, height: u32, scale: f32) -> (i32, i32, i32) {
    let side = (width.min(height) as f32 * scale).floor() as i32;
    let x = ((width as i32 - side) / 2).max(0);
    let y = ((height as i32 - side) / 2).max(0);
    (x, y, side)
}

/// Live recognition state for one practice run. Recomputed on every
/// successful classification, cleared on stop or lesson change.
pub struct PracticeSession {
    pub id: Uuid,
    pub target: Option<String>,
    pub predicted: Option<String>,
    pub top3: Vec<RankedLabel>,
    pub is_match: Option<bool>,
    pub score: u8,
    pub status: PracticeStatus,
    pub error: Option<String>,
}

impl PracticeSession {
    pub fn new(target: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            predicted: None,
            top3: Vec::new(),
            is_match: None,
            score: 0,
            status: PracticeStatus::Idle,
            error: None,
        }
    }

    /// Reconciles a prediction against the target. The score rewards a
    /// correct (or untargeted) prediction with its true confidence and a
    /// confident-but-wrong prediction with zero. Matching uses the top-1
    /// label only; top-3 is display-only.
    pub fn apply(&mut self, recognition: Recognition) {
        let normalized = recognition.label.trim().to_lowercase();
        let is_match = self
            .target
            .as_ref()
            .map(|t| normalized == t.trim().to_lowercase());
        self.score = if is_match == Some(false) {
            0
        } else {
            (recognition.confidence * 100.0).round().clamp(0.0, 100.0) as u8
        };
        self.is_match = is_match;
        self.predicted = Some(recognition.label);
        self.top3 = recognition.top3;
        self.status = PracticeStatus::Running;
        self.error = None;
    }

    /// A single failed frame surfaces inline but does not stop practice.
    pub fn fail(&mut self, message: String) {
        self.status = PracticeStatus::Error;
        self.error = Some(message);
    }

    /// Retargets the session when the lesson changes mid-practice.
    pub fn set_target(&mut self, target: Option<String>) {
        self.target = target;
        self.predicted = None;
        self.top3.clear();
        self.is_match = None;
        self.score = 0;
    }
}

/// Long-lived classification worker. Frames go in over a channel, events
/// come back; dropping the `Classifier` closes the channel and the worker
/// thread exits.
pub struct Classifier {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<PracticeEvent>,
}

impl Classifier {
    pub fn start(client: BackendClient) -> Self {
        let (tx, frame_rx) = mpsc::channel::<Vec<u8>>();
        let (event_tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            info!("classification worker started");
            while let Ok(jpeg) = frame_rx.recv() {
                let event = match rt.block_on(client.recognize(jpeg)) {
                    Ok(recognition) => PracticeEvent::Recognized(recognition),
                    Err(e) => PracticeEvent::Failed(e.to_string()),
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            debug!("classification worker stopped");
        });
        Self { tx, rx }
    }

    pub fn submit(&self, jpeg: Vec<u8>) -> bool {
        self.tx.send(jpeg).is_ok()
    }

    pub fn poll(&self) -> Option<PracticeEvent> {
        self.rx.try_recv().ok()
    }
}
