use std::time::Duration;

use egui::{Color32, Ui};
use shared::{AvatarType, BackendClient, Glosser, JobInput, JobRequest, SignLanguage};

use crate::controller::{JobController, JobPhase};
use crate::views::progress::{download_control, job_progress, result_texts};

/// The YouTube conversion view. Same lifecycle as the converter, but the
/// input is a URL plus caption preferences and the result is video-only,
/// so it always asks for the skeleton renderer.
pub struct YoutubeView {
    url: String,
    language: SignLanguage,
    prefer_captions: bool,
    controller: JobController,
}

impl YoutubeView {
    pub fn new(client: BackendClient) -> Self {
        Self {
            url: String::new(),
            language: SignLanguage::Asl,
            prefer_captions: true,
            controller: JobController::new(client),
        }
    }

    fn request(&self) -> JobRequest {
        JobRequest {
            input: JobInput::Youtube {
                url: self.url.clone(),
                prefer_captions: self.prefer_captions,
            },
            glosser: Glosser::Simple,
            language: self.language,
            avatar: AvatarType::Skeleton,
        }
    }

    fn reset(&mut self) {
        self.controller.reset();
        self.url.clear();
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        self.controller.process_events();

        if self.controller.is_generating() {
            ui.ctx().request_repaint_after(Duration::from_millis(200));
        }

        ui.heading("YouTube Converter");
        ui.add_space(8.0);

        ui.group(|ui| {
            ui.label("YouTube link");
            ui.text_edit_singleline(&mut self.url);

            ui.add_space(4.0);
            ui.strong("Select Sign Language");
            ui.radio_value(&mut self.language, SignLanguage::Asl, SignLanguage::Asl.label());
            ui.radio_value(&mut self.language, SignLanguage::Fsl, SignLanguage::Fsl.label());

            ui.checkbox(&mut self.prefer_captions, "Use uploaded captions when available");

            ui.add_space(8.0);
            let can_submit = !self.controller.is_generating() && self.request().validate().is_ok();
            let button_text = if self.controller.is_generating() {
                "Converting..."
            } else {
                "Convert Video"
            };
            if ui
                .add_enabled(can_submit, egui::Button::new(button_text))
                .clicked()
            {
                self.controller.submit(self.request());
            }

            if let Some(error) = self.controller.error() {
                ui.colored_label(Color32::LIGHT_RED, error);
            }
        });

        ui.add_space(8.0);
        match self.controller.phase() {
            JobPhase::Idle => {
                ui.label("Paste a YouTube link to get started.");
            }
            JobPhase::Submitting => {
                ui.spinner();
            }
            JobPhase::Active => {
                if let Some(job) = self.controller.job() {
                    job_progress(ui, job);
                }
            }
            JobPhase::Failed => {
                ui.strong("Conversion Failed");
                if let Some(job) = self.controller.job() {
                    ui.colored_label(Color32::LIGHT_RED, job.error_message());
                }
                if ui.button("Convert Another").clicked() {
                    self.reset();
                }
            }
            JobPhase::Completed => {
                let client = self.controller.client().clone();
                let video_url = self
                    .controller
                    .job()
                    .and_then(|job| job.video_file().map(|p| client.file_url(p)));

                match &video_url {
                    Some(url) => {
                        ui.strong("Converted video");
                        ui.hyperlink(url);
                    }
                    None => {
                        ui.label("Video output not available.");
                    }
                }
                if let Some(job) = self.controller.job() {
                    result_texts(ui, job);
                }
                ui.horizontal(|ui| {
                    download_control(ui, "Download Video", video_url);
                });
                if ui.button("Convert Another").clicked() {
                    self.reset();
                }
            }
        }
    }
}
