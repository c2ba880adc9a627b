use std::time::Duration;

use egui::{Color32, Ui};
use shared::{AvatarType, BackendClient, Glosser, JobInput, JobRequest, SignLanguage};

use crate::controller::{JobController, JobPhase};
use crate::viewer::PoseViewer;
use crate::views::progress::{download_control, job_progress, result_texts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Text,
    Audio,
    Video,
}

/// The text/audio/video conversion view: input form on top of one
/// `JobController`, plus the pose viewer once a human-avatar job lands.
pub struct ConverterView {
    mode: InputMode,
    text_input: String,
    file_path: String,
    language: SignLanguage,
    avatar: AvatarType,
    glosser: Glosser,
    controller: JobController,
    viewer: Option<PoseViewer>,
}

impl ConverterView {
    pub fn new(client: BackendClient) -> Self {
        Self {
            mode: InputMode::Text,
            text_input: String::new(),
            file_path: String::new(),
            language: SignLanguage::Asl,
            avatar: AvatarType::Human,
            glosser: Glosser::Simple,
            controller: JobController::new(client),
            viewer: None,
        }
    }

    fn request(&self) -> JobRequest {
        let input = match self.mode {
            InputMode::Text => JobInput::Text {
                text: self.text_input.clone(),
            },
            InputMode::Audio => JobInput::Audio {
                path: self.file_path.clone(),
            },
            InputMode::Video => JobInput::Video {
                path: self.file_path.clone(),
            },
        };
        JobRequest {
            input,
            glosser: self.glosser,
            language: self.language,
            avatar: self.avatar,
        }
    }

    fn reset(&mut self) {
        self.controller.reset();
        self.viewer = None;
        self.text_input.clear();
        self.file_path.clear();
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        self.controller.process_events();

        // Mount the pose viewer exactly once per completed human-avatar job.
        if self.controller.phase() == JobPhase::Completed
            && self.avatar == AvatarType::Human
            && self.viewer.is_none()
        {
            if let Some(job) = self.controller.job() {
                self.viewer = Some(PoseViewer::open(
                    self.controller.client().clone(),
                    job.id.clone(),
                ));
            }
        }

        if self.controller.is_generating() {
            // Keep draining poll events even when the user is idle.
            ui.ctx().request_repaint_after(Duration::from_millis(200));
        }

        ui.heading("Convert to Sign Language");
        ui.add_space(8.0);

        ui.columns(2, |columns| {
            self.input_panel(&mut columns[0]);
            self.preview_panel(&mut columns[1]);
        });
    }

    fn input_panel(&mut self, ui: &mut Ui) {
        ui.group(|ui| {
            ui.strong("Input Options");
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.mode, InputMode::Text, "Text");
                ui.selectable_value(&mut self.mode, InputMode::Audio, "Audio");
                ui.selectable_value(&mut self.mode, InputMode::Video, "Video");
            });
            ui.add_space(4.0);

            match self.mode {
                InputMode::Text => {
                    ui.label("Enter text to convert");
                    ui.add(
                        egui::TextEdit::multiline(&mut self.text_input)
                            .hint_text("Type the text you want to convert to sign language...")
                            .desired_rows(5),
                    );
                    ui.small(format!("{} characters", self.text_input.chars().count()));
                }
                InputMode::Audio => {
                    ui.label("Audio file path");
                    ui.text_edit_singleline(&mut self.file_path);
                    ui.small("Supports: MP3, WAV, M4A, OGG");
                }
                InputMode::Video => {
                    ui.label("Video file path");
                    ui.text_edit_singleline(&mut self.file_path);
                    ui.small("Supports: MP4, WebM, MOV, AVI");
                }
            }

            ui.separator();
            ui.strong("Select Sign Language");
            ui.radio_value(&mut self.language, SignLanguage::Asl, SignLanguage::Asl.label());
            ui.radio_value(&mut self.language, SignLanguage::Fsl, SignLanguage::Fsl.label());
            ui.radio_value(&mut self.language, SignLanguage::Arsl, SignLanguage::Arsl.label());
            if self.language == SignLanguage::Arsl {
                ui.small("ArSL is not supported by the current AI pipeline.");
            }

            ui.add_space(4.0);
            ui.strong("Avatar Type");
            ui.radio_value(&mut self.avatar, AvatarType::Skeleton, "Skeleton View");
            ui.radio_value(&mut self.avatar, AvatarType::Human, "Human Avatar");

            ui.add_space(4.0);
            egui::ComboBox::from_label("Glosser")
                .selected_text(self.glosser.label())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.glosser, Glosser::Simple, Glosser::Simple.label());
                    ui.selectable_value(
                        &mut self.glosser,
                        Glosser::SpacyLemma,
                        Glosser::SpacyLemma.label(),
                    );
                    ui.selectable_value(&mut self.glosser, Glosser::Rules, Glosser::Rules.label());
                });
            if self.glosser == Glosser::Rules && self.language != SignLanguage::Fsl {
                ui.small("Rules glosser is optimized for French input (FSL).");
            }

            ui.add_space(8.0);
            let can_submit = !self.controller.is_generating() && self.request().validate().is_ok();
            let button_text = if self.controller.is_generating() {
                "Generating..."
            } else {
                "Generate Sign Language"
            };
            if ui
                .add_enabled(can_submit, egui::Button::new(button_text))
                .clicked()
            {
                self.viewer = None;
                self.controller.submit(self.request());
            }

            if let Some(error) = self.controller.error() {
                ui.colored_label(Color32::LIGHT_RED, error);
            }
        });
    }

    fn preview_panel(&mut self, ui: &mut Ui) {
        ui.group(|ui| match self.controller.phase() {
            JobPhase::Idle => {
                ui.strong(match self.mode {
                    InputMode::Text => "Enter text to get started",
                    _ => "Upload a file to convert",
                });
                ui.label("Your sign language animation will appear here once generated.");
            }
            JobPhase::Submitting => {
                ui.strong("Generating Sign Language Animation");
                ui.spinner();
            }
            JobPhase::Active => {
                ui.strong("Generating Sign Language Animation");
                ui.label("Our AI is creating a sign language version of your content...");
                if let Some(job) = self.controller.job() {
                    job_progress(ui, job);
                }
            }
            JobPhase::Failed => {
                ui.strong("Conversion Failed");
                if let Some(job) = self.controller.job() {
                    ui.colored_label(Color32::LIGHT_RED, job.error_message());
                }
                if ui.button("Create Another").clicked() {
                    self.reset();
                }
            }
            JobPhase::Completed => {
                self.completed_panel(ui);
            }
        });
    }

    fn completed_panel(&mut self, ui: &mut Ui) {
        let client = self.controller.client().clone();
        let (video_url, pose_url) = match self.controller.job() {
            Some(job) => (
                job.video_file().map(|p| client.file_url(p)),
                job.pose_file().map(|p| client.file_url(p)),
            ),
            None => (None, None),
        };

        if self.avatar == AvatarType::Human {
            if let Some(viewer) = &mut self.viewer {
                viewer.ui(ui);
            }
        } else if let Some(url) = &video_url {
            ui.strong("Rendered video");
            ui.hyperlink(url);
        } else {
            ui.label("Video output not available.");
        }

        if let Some(job) = self.controller.job() {
            result_texts(ui, job);
        }

        ui.add_space(8.0);
        ui.strong("Export Options");
        ui.horizontal(|ui| {
            download_control(ui, "Download Video", video_url.clone());
            download_control(ui, "Download Pose", pose_url);
        });
        if ui
            .add_enabled(video_url.is_some(), egui::Button::new("Copy Share Link"))
            .clicked()
        {
            if let Some(url) = video_url {
                ui.ctx().output_mut(|o| o.copied_text = url);
            }
        }

        ui.add_space(8.0);
        if ui.button("Create Another").clicked() {
            self.reset();
        }
    }
}
