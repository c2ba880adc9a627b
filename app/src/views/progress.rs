use egui::{Color32, Ui};
use shared::{Job, StepStatus};

/// Progress bar plus the per-step status list, shared by the converter
/// and YouTube views while a job is in flight.
pub fn job_progress(ui: &mut Ui, job: &Job) {
    let fraction = (job.progress / 100.0).clamp(0.0, 1.0);
    ui.add(egui::ProgressBar::new(fraction).show_percentage());

    if !job.steps.is_empty() {
        ui.add_space(8.0);
        ui.strong("Steps");
        for step in &job.steps {
            ui.horizontal(|ui| {
                ui.label(&step.label);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(step_color(step.status), step_status_text(step.status));
                });
            });
        }
    }
}

fn step_status_text(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "PENDING",
        StepStatus::Running => "RUNNING",
        StepStatus::Done => "DONE",
        StepStatus::Error => "ERROR",
        StepStatus::Skipped => "SKIPPED",
    }
}

fn step_color(status: StepStatus) -> Color32 {
    match status {
        StepStatus::Done => Color32::from_rgb(0x22, 0xc5, 0x5e),
        StepStatus::Running => Color32::from_rgb(0x7d, 0xd3, 0xfc),
        StepStatus::Error => Color32::from_rgb(0xef, 0x44, 0x44),
        StepStatus::Pending | StepStatus::Skipped => Color32::GRAY,
    }
}

/// A download link when the file reference exists, a disabled button
/// otherwise.
pub fn download_control(ui: &mut Ui, label: &str, url: Option<String>) {
    match url {
        Some(url) => {
            ui.hyperlink_to(label, url);
        }
        None => {
            ui.add_enabled(false, egui::Button::new(label));
        }
    }
}

/// Transcript and gloss panels for a completed job.
pub fn result_texts(ui: &mut Ui, job: &Job) {
    if let Some(result) = &job.result {
        ui.add_space(8.0);
        ui.group(|ui| {
            ui.small("Transcript");
            if result.text.is_empty() {
                ui.label("No transcript.");
            } else {
                ui.label(&result.text);
            }
        });
        ui.group(|ui| {
            ui.small("Gloss");
            if result.gloss.is_empty() {
                ui.label("No gloss output.");
            } else {
                ui.label(&result.gloss);
            }
        });
    }
}
