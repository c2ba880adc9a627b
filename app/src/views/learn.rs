use std::time::Instant;

use egui::{Color32, TextureHandle, TextureOptions, Ui};
use log::{debug, info, warn};
use shared::{BackendClient, Config};

use crate::camera::{encode_roi_jpeg, frame_to_color_image, CameraStream};
use crate::practice::{
    roi_rect, Classifier, FrameGate, PracticeEvent, PracticeSession, PracticeStatus, IMG_SIZE,
    JPEG_QUALITY, PRED_INTERVAL, ROI_SCALE,
};

/// One sign in the lesson catalog.
struct Lesson {
    id: String,
    title: String,
}

fn lesson_catalog() -> Vec<Lesson> {
    ('a'..='z')
        .map(|letter| Lesson {
            id: letter.to_string(),
            title: format!("Letter {}", letter.to_ascii_uppercase()),
        })
        .collect()
}

/// Everything that only exists while practice is running: the camera, the
/// classification worker, the rate gate and the preview texture. Dropping
/// it releases the camera and stops the worker.
struct ActivePractice {
    camera: CameraStream,
    classifier: Classifier,
    gate: FrameGate,
    texture: Option<TextureHandle>,
}

/// The practice view: pick a letter, start the camera, and get live
/// feedback on the recognized sign.
pub struct LearnView {
    client: BackendClient,
    config: Config,
    lessons: Vec<Lesson>,
    selected: Option<usize>,
    session: PracticeSession,
    active: Option<ActivePractice>,
}

impl LearnView {
    pub fn new(client: BackendClient, config: Config) -> Self {
        Self {
            client,
            config,
            lessons: lesson_catalog(),
            selected: None,
            session: PracticeSession::new(None),
            active: None,
        }
    }

    fn target_label(&self) -> Option<String> {
        self.selected
            .map(|i| self.lessons[i].id.to_uppercase())
    }

    fn start(&mut self) {
        let Some(target) = self.target_label() else {
            self.session = PracticeSession::new(None);
            self.session
                .fail("Select a lesson before starting practice.".to_string());
            return;
        };

        self.session = PracticeSession::new(Some(target));
        match CameraStream::open(
            self.config.camera_index(),
            self.config.camera_width(),
            self.config.camera_height(),
        ) {
            Ok(camera) => {
                info!("practice session {} started", self.session.id);
                self.session.status = PracticeStatus::Running;
                self.active = Some(ActivePractice {
                    camera,
                    classifier: Classifier::start(self.client.clone()),
                    gate: FrameGate::new(PRED_INTERVAL),
                    texture: None,
                });
            }
            Err(e) => {
                warn!("camera open failed: {}", e);
                self.session.fail("Failed to access camera.".to_string());
            }
        }
    }

    fn stop(&mut self) {
        self.active = None;
        self.session.status = PracticeStatus::Idle;
        self.session.is_match = None;
    }

    fn select_lesson(&mut self, index: usize) {
        if self.selected == Some(index) {
            return;
        }
        self.selected = Some(index);
        let target = self.target_label();
        if self.active.is_some() {
            self.session.set_target(target);
        }
    }

    /// One tick of the capture loop, driven by the repaint cycle: drain
    /// worker events, refresh the preview texture, and submit a new frame
    /// if the gate allows one.
    fn tick(&mut self, ui: &mut Ui) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        while let Some(event) = active.classifier.poll() {
            active.gate.finish();
            match event {
                PracticeEvent::Recognized(recognition) => self.session.apply(recognition),
                PracticeEvent::Failed(message) => self.session.fail(message),
            }
        }

        let Some(frame) = active.camera.latest_frame() else {
            ui.ctx().request_repaint();
            return;
        };
        let (width, height) = active.camera.resolution();
        if width == 0 || height == 0 {
            ui.ctx().request_repaint();
            return;
        }

        match frame_to_color_image(&frame) {
            Ok(image) => match &mut active.texture {
                Some(texture) => texture.set(image, TextureOptions::LINEAR),
                None => {
                    active.texture = Some(ui.ctx().load_texture(
                        "practice-preview",
                        image,
                        TextureOptions::LINEAR,
                    ));
                }
            },
            Err(e) => debug!("preview conversion failed: {}", e),
        }

        if active.gate.try_begin(Instant::now()) {
            let roi = roi_rect(width, height, ROI_SCALE);
            match encode_roi_jpeg(&frame, roi, IMG_SIZE, JPEG_QUALITY) {
                Ok(jpeg) => {
                    if !active.classifier.submit(jpeg) {
                        active.gate.finish();
                    }
                }
                Err(e) => {
                    debug!("frame encode failed: {}", e);
                    active.gate.finish();
                }
            }
        }

        ui.ctx().request_repaint();
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        self.tick(ui);

        ui.heading("Learn ASL");
        ui.add_space(8.0);

        ui.columns(2, |columns| {
            self.lesson_panel(&mut columns[0]);
            self.practice_panel(&mut columns[1]);
        });
    }

    fn lesson_panel(&mut self, ui: &mut Ui) {
        ui.strong("Lessons");
        ui.add_space(4.0);
        egui::ScrollArea::vertical()
            .id_source("lesson-list")
            .max_height(480.0)
            .show(ui, |ui| {
                for index in 0..self.lessons.len() {
                    let checked = self.selected == Some(index);
                    if ui
                        .selectable_label(checked, &self.lessons[index].title)
                        .clicked()
                    {
                        self.select_lesson(index);
                    }
                }
            });
    }

    fn practice_panel(&mut self, ui: &mut Ui) {
        match self.target_label() {
            Some(target) => {
                ui.strong(format!("Practice: sign \"{}\"", target));
            }
            None => {
                ui.label("Pick a letter from the list to practice it.");
            }
        }
        ui.add_space(4.0);

        if self.active.is_none() {
            if ui.button("Start Practice").clicked() {
                self.start();
            }
        } else if ui.button("Stop Practice").clicked() {
            self.stop();
        }

        if let Some(error) = &self.session.error {
            ui.colored_label(Color32::LIGHT_RED, error);
        }

        if let Some(active) = &self.active {
            if let Some(texture) = &active.texture {
                let size = texture.size_vec2();
                let scale = (ui.available_width() / size.x).min(1.0);
                ui.image((texture.id(), size * scale));
            } else {
                ui.spinner();
                ui.label("Waiting for the camera...");
            }
        }

        if self.session.status == PracticeStatus::Running || self.session.predicted.is_some() {
            ui.add_space(8.0);
            ui.group(|ui| {
                ui.label(format!(
                    "Prediction: {}",
                    self.session.predicted.as_deref().unwrap_or("-")
                ));
                match self.session.is_match {
                    Some(true) => {
                        ui.colored_label(Color32::LIGHT_GREEN, "Match!");
                    }
                    Some(false) => {
                        ui.colored_label(Color32::LIGHT_RED, "Keep trying");
                    }
                    None => {}
                }
                ui.add(
                    egui::ProgressBar::new(self.session.score as f32 / 100.0)
                        .text(format!("{}%", self.session.score)),
                );
                if !self.session.top3.is_empty() {
                    ui.add_space(4.0);
                    ui.small("Top candidates");
                    for ranked in &self.session.top3 {
                        ui.small(format!(
                            "{} ({:.0}%)",
                            ranked.label,
                            ranked.score * 100.0
                        ));
                    }
                }
            });
        }
    }
}
