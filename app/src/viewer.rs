use std::sync::mpsc;
use std::time::{Duration, Instant};

use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};
use log::{debug, warn};
use shared::{BackendClient, PoseSequence};

/// Skip every other frame server-side to bound payload and render cost.
pub const POSE_STRIDE: u32 = 2;
const FALLBACK_FPS: f32 = 24.0;

const BACKDROP: Color32 = Color32::from_rgb(0x0b, 0x12, 0x20);
const POINT_COLOR: Color32 = Color32::from_rgb(0x7d, 0xd3, 0xfc);
const EDGE_COLOR: Color32 = Color32::from_rgb(0xf8, 0xfa, 0xfc);

pub enum PoseEvent {
    Loaded(PoseSequence),
    Failed(String),
}

enum ViewerState {
    Loading,
    Failed(String),
    Ready(Playback),
}

/// Fetches a job's pose sequence once and plays it back in a loop inside
/// an egui viewport. Dropping the viewer tears everything down; the fetch
/// thread at worst finishes into a dead channel.
pub struct PoseViewer {
    rx: mpsc::Receiver<PoseEvent>,
    state: ViewerState,
}

impl PoseViewer {
    pub fn open(client: BackendClient, job_id: String) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let event = match rt.block_on(client.fetch_pose(&job_id, POSE_STRIDE)) {
                Ok(sequence) => {
                    debug!(
                        "pose sequence for job {}: {} frames, {} joints",
                        job_id,
                        sequence.frames.len(),
                        sequence.joint_count()
                    );
                    PoseEvent::Loaded(sequence)
                }
                Err(e) => {
                    warn!("failed to load pose data for job {}: {}", job_id, e);
                    PoseEvent::Failed(e.to_string())
                }
            };
            let _ = tx.send(event);
        });
        Self {
            rx,
            state: ViewerState::Loading,
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        while let Ok(event) = self.rx.try_recv() {
            self.state = match event {
                PoseEvent::Loaded(sequence) if sequence.is_consistent() => {
                    ViewerState::Ready(Playback::new(sequence))
                }
                PoseEvent::Loaded(_) => {
                    ViewerState::Failed("Pose data is malformed.".to_string())
                }
                PoseEvent::Failed(message) => ViewerState::Failed(message),
            };
        }

        // 16:9 viewport, recomputed from the available width every repaint
        // so resizes never touch the animation phase.
        let width = ui.available_width();
        let (rect, _) = ui.allocate_exact_size(Vec2::new(width, width * 9.0 / 16.0), Sense::hover());
        ui.painter().rect_filled(rect, 6.0, BACKDROP);

        match &mut self.state {
            ViewerState::Loading => {
                ui.small("Loading 3D human preview...");
                // Nothing else schedules repaints while the fetch is pending,
                // so keep polling the channel until it resolves.
                ui.ctx().request_repaint_after(Duration::from_millis(100));
            }
            ViewerState::Failed(message) => {
                ui.colored_label(Color32::LIGHT_RED, message.as_str());
            }
            ViewerState::Ready(playback) => {
                playback.advance(Instant::now());
                playback.paint(ui.painter(), rect);
                ui.ctx().request_repaint();
            }
        }
    }
}

/// Looping skeleton playback. Frame advance is gated on wall-clock time so
/// the animation speed is independent of the repaint rate.
pub struct Playback {
    sequence: PoseSequence,
    center: (f32, f32),
    scale: f32,
    frame_delay: Duration,
    frame_index: usize,
    last_advance: Option<Instant>,
    points: Vec<(f32, f32)>,
}

impl Playback {
    pub fn new(sequence: PoseSequence) -> Self {
        let b = &sequence.bounds;
        let center = ((b.min_x + b.max_x) / 2.0, (b.min_y + b.max_y) / 2.0);
        let span = (b.max_x - b.min_x).max(b.max_y - b.min_y);
        // A degenerate box would divide by zero; fall back to a unit span.
        let span = if span > 0.0 { span } else { 1.0 };
        let fps = if sequence.fps > 0.0 {
            sequence.fps
        } else {
            FALLBACK_FPS
        };
        let joints = sequence.joint_count();
        Self {
            center,
            scale: 2.0 / span,
            frame_delay: Duration::from_secs_f32(1.0 / fps),
            frame_index: 0,
            last_advance: None,
            points: Vec::with_capacity(joints),
            sequence,
        }
    }

    /// Advances at most one frame per elapsed frame interval, wrapping
    /// modulo the sequence length. Calls in between re-render unchanged.
    pub fn advance(&mut self, now: Instant) {
        let frames = self.sequence.frames.len();
        if frames == 0 {
            return;
        }
        match self.last_advance {
            None => self.last_advance = Some(now),
            Some(last) if now.duration_since(last) >= self.frame_delay => {
                self.frame_index = (self.frame_index + 1) % frames;
                self.last_advance = Some(now);
            }
            Some(_) => {}
        }
    }

    /// Maps a raw joint into the [-1, 1] viewing volume. The vertical axis
    /// flips because pose coordinates are top-down. Joints without
    /// confidence collapse to the origin instead of showing stale data.
    pub fn project(&self, joint: [f32; 3]) -> (f32, f32) {
        let [x, y, conf] = joint;
        if conf > 0.0 {
            ((x - self.center.0) * self.scale, -((y - self.center.1) * self.scale))
        } else {
            (0.0, 0.0)
        }
    }

    fn project_current(&mut self) {
        let Some(frame) = self.sequence.frames.get(self.frame_index) else {
            return;
        };
        let projected: Vec<(f32, f32)> = frame.iter().map(|joint| self.project(*joint)).collect();
        self.points = projected;
    }

    pub fn paint(&mut self, painter: &egui::Painter, rect: Rect) {
        self.project_current();

        let half = rect.width().min(rect.height()) * 0.45;
        let center = rect.center();
        let to_screen =
            |(x, y): &(f32, f32)| Pos2::new(center.x + x * half, center.y - y * half);

        // Edge endpoints are copied from the joints' current positions so
        // they can never desynchronize from the points.
        for [a, b] in &self.sequence.edges {
            let (Some(pa), Some(pb)) = (self.points.get(*a), self.points.get(*b)) else {
                continue;
            };
            painter.line_segment([to_screen(pa), to_screen(pb)], Stroke::new(1.5, EDGE_COLOR));
        }
        for point in &self.points {
            painter.circle_filled(to_screen(point), 3.0, POINT_COLOR);
        }
    }
}
