use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal jobs are never polled again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Error,
    Skipped,
}

/// One pipeline stage as reported by the backend. Display-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStep {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultFiles {
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub pose: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub gloss: String,
    #[serde(default)]
    pub files: Option<ResultFiles>,
}

/// One server-tracked conversion request. The server is the single source
/// of truth: every poll response replaces the whole object, nothing is
/// merged client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub steps: Vec<JobStep>,
    #[serde(default)]
    pub result: Option<JobResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "An unexpected error occurred.".to_string())
    }

    pub fn video_file(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.files.as_ref())
            .and_then(|f| f.video.as_deref())
    }

    pub fn pose_file(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.files.as_ref())
            .and_then(|f| f.pose.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

/// A downsampled keypoint sequence for one completed job. Each frame holds
/// one `[x, y, confidence]` triple per joint; the edge list is shared by
/// all frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseSequence {
    pub frames: Vec<Vec<[f32; 3]>>,
    pub edges: Vec<[usize; 2]>,
    pub bounds: PoseBounds,
    #[serde(default)]
    pub fps: f32,
}

impl PoseSequence {
    pub fn joint_count(&self) -> usize {
        self.frames.first().map_or(0, |f| f.len())
    }

    /// All frames share one joint count and every edge index stays within
    /// it. The backend guarantees this; checked once before playback.
    pub fn is_consistent(&self) -> bool {
        let joints = self.joint_count();
        self.frames.iter().all(|f| f.len() == joints)
            && self.edges.iter().all(|[a, b]| *a < joints && *b < joints)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    #[serde(default)]
    pub score: f32,
}

/// Single-frame classification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recognition {
    pub label: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub top3: Vec<RankedLabel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignLanguage {
    Asl,
    Fsl,
    Arsl,
}

impl SignLanguage {
    /// Spoken/signed language codes the pipeline understands. `None` for
    /// languages without a backing pipeline.
    pub fn codes(&self) -> Option<(&'static str, &'static str)> {
        match self {
            SignLanguage::Asl => Some(("en", "ase")),
            SignLanguage::Fsl => Some(("fr", "fsl")),
            SignLanguage::Arsl => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignLanguage::Asl => "American Sign Language (ASL)",
            SignLanguage::Fsl => "French Sign Language (LSF)",
            SignLanguage::Arsl => "Arabic Sign Language (ArSL)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glosser {
    Simple,
    SpacyLemma,
    Rules,
}

impl Glosser {
    pub fn code(&self) -> &'static str {
        match self {
            Glosser::Simple => "simple",
            Glosser::SpacyLemma => "spacylemma",
            Glosser::Rules => "rules",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Glosser::Simple => "Simple (fast)",
            Glosser::SpacyLemma => "SpaCy Lemma (better)",
            Glosser::Rules => "Rules (French only)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarType {
    Skeleton,
    Human,
}

impl AvatarType {
    pub fn code(&self) -> &'static str {
        match self {
            AvatarType::Skeleton => "skeleton",
            AvatarType::Human => "human",
        }
    }
}

/// Mode-specific payload. One variant per input mode so no mode can carry
/// another mode's fields.
#[derive(Debug, Clone)]
pub enum JobInput {
    Text { text: String },
    Audio { path: String },
    Video { path: String },
    Youtube { url: String, prefer_captions: bool },
}

impl JobInput {
    pub fn mode(&self) -> &'static str {
        match self {
            JobInput::Text { .. } => "text",
            JobInput::Audio { .. } => "audio",
            JobInput::Video { .. } => "video",
            JobInput::Youtube { .. } => "youtube",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter text to convert.")]
    EmptyText,
    #[error("Please upload a file for audio or video conversion.")]
    MissingFile,
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Enter a valid YouTube link.")]
    InvalidYoutubeUrl,
    #[error("Selected sign language is not supported by the AI pipeline yet.")]
    UnsupportedLanguage,
    #[error("Rules glosser only supports French input (FSL).")]
    RulesRequiresFrench,
}

/// One conversion submission, validated before it may touch the network.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub input: JobInput,
    pub glosser: Glosser,
    pub language: SignLanguage,
    pub avatar: AvatarType,
}

impl JobRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.language.codes().is_none() {
            return Err(ValidationError::UnsupportedLanguage);
        }
        if self.glosser == Glosser::Rules && self.language != SignLanguage::Fsl {
            return Err(ValidationError::RulesRequiresFrench);
        }
        match &self.input {
            JobInput::Text { text } => {
                if text.trim().is_empty() {
                    return Err(ValidationError::EmptyText);
                }
            }
            JobInput::Audio { path } | JobInput::Video { path } => {
                if path.trim().is_empty() {
                    return Err(ValidationError::MissingFile);
                }
                if !Path::new(path.trim()).is_file() {
                    return Err(ValidationError::FileNotFound(path.trim().to_string()));
                }
            }
            JobInput::Youtube { url, .. } => {
                let url = url.trim();
                if url.is_empty() || !(url.contains("youtube.com") || url.contains("youtu.be")) {
                    return Err(ValidationError::InvalidYoutubeUrl);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn text_request(text: &str, glosser: Glosser, language: SignLanguage) -> JobRequest {
        JobRequest {
            input: JobInput::Text {
                text: text.to_string(),
            },
            glosser,
            language,
            avatar: AvatarType::Human,
        }
    }

    #[test]
    fn job_json_round_trip() {
        let json = r#"{
            "id": "j-1",
            "status": "running",
            "progress": 40,
            "steps": [
                {"id": "transcribe", "label": "Transcription audio/video", "status": "done", "ts": "12:00:01"},
                {"id": "text_to_gloss", "label": "Texte -> Glosses", "status": "running", "ts": null}
            ],
            "result": null,
            "error": null
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, "j-1");
        assert_eq!(job.status, JobStatus::Running);
        assert!(!job.status.is_terminal());
        assert_eq!(job.progress, 40.0);
        assert_eq!(job.steps.len(), 2);
        assert_eq!(job.steps[0].status, StepStatus::Done);
        assert_eq!(job.steps[1].status, StepStatus::Running);
        assert!(job.steps[1].ts.is_none());
    }

    #[test]
    fn completed_job_exposes_result_files() {
        let json = r#"{
            "id": "j-2",
            "status": "completed",
            "progress": 100,
            "steps": [],
            "result": {
                "text": "hello",
                "gloss": "HELLO",
                "files": {"video": "/files/j-2/out.mp4", "pose": "/files/j-2/pose.json"}
            }
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert!(job.status.is_terminal());
        assert_eq!(job.video_file(), Some("/files/j-2/out.mp4"));
        assert_eq!(job.pose_file(), Some("/files/j-2/pose.json"));
        let result = job.result.unwrap();
        assert_eq!(result.text, "hello");
        assert_eq!(result.gloss, "HELLO");
    }

    #[test]
    fn failed_job_falls_back_to_generic_message() {
        let json = r#"{"id": "j-3", "status": "failed", "progress": 10}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.error_message(), "An unexpected error occurred.");
        assert!(job.video_file().is_none());

        let json = r#"{"id": "j-4", "status": "failed", "error": "yt-dlp failed"}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.error_message(), "yt-dlp failed");
    }

    #[test]
    fn pose_sequence_json_shape() {
        let json = r#"{
            "frames": [[[0.0, 0.0, 1.0], [2.0, 4.0, 0.9]], [[1.0, 2.0, 0.0], [2.0, 3.0, 1.0]]],
            "edges": [[0, 1]],
            "bounds": {"min_x": 0.0, "max_x": 2.0, "min_y": 0.0, "max_y": 4.0},
            "fps": 24
        }"#;
        let seq: PoseSequence = serde_json::from_str(json).unwrap();
        assert_eq!(seq.joint_count(), 2);
        assert!(seq.is_consistent());
        assert_eq!(seq.fps, 24.0);
    }

    #[test]
    fn pose_sequence_inconsistency_detected() {
        let seq = PoseSequence {
            frames: vec![vec![[0.0, 0.0, 1.0]]],
            edges: vec![[0, 1]],
            bounds: PoseBounds {
                min_x: 0.0,
                max_x: 1.0,
                min_y: 0.0,
                max_y: 1.0,
            },
            fps: 24.0,
        };
        assert!(!seq.is_consistent());
    }

    #[test]
    fn recognition_json_shape() {
        let json = r#"{
            "label": "A",
            "confidence": 0.92,
            "top3": [{"label": "A", "score": 0.92}, {"label": "S", "score": 0.05}]
        }"#;
        let recognition: Recognition = serde_json::from_str(json).unwrap();
        assert_eq!(recognition.label, "A");
        assert_eq!(recognition.top3.len(), 2);
    }

    #[test]
    fn rules_glosser_requires_french() {
        let request = text_request("hello", Glosser::Rules, SignLanguage::Asl);
        assert_eq!(request.validate(), Err(ValidationError::RulesRequiresFrench));

        let request = text_request("bonjour", Glosser::Rules, SignLanguage::Fsl);
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn arsl_is_rejected_before_any_request() {
        let request = text_request("hello", Glosser::Simple, SignLanguage::Arsl);
        assert_eq!(request.validate(), Err(ValidationError::UnsupportedLanguage));
    }

    #[test]
    fn empty_text_is_rejected() {
        let request = text_request("   ", Glosser::Simple, SignLanguage::Asl);
        assert_eq!(request.validate(), Err(ValidationError::EmptyText));
    }

    #[test]
    fn media_modes_require_an_existing_file() {
        let request = JobRequest {
            input: JobInput::Audio {
                path: String::new(),
            },
            glosser: Glosser::Simple,
            language: SignLanguage::Asl,
            avatar: AvatarType::Skeleton,
        };
        assert_eq!(request.validate(), Err(ValidationError::MissingFile));

        let request = JobRequest {
            input: JobInput::Video {
                path: "/nonexistent/clip.mp4".to_string(),
            },
            glosser: Glosser::Simple,
            language: SignLanguage::Asl,
            avatar: AvatarType::Skeleton,
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::FileNotFound(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"riff").unwrap();
        let request = JobRequest {
            input: JobInput::Audio {
                path: file.path().to_string_lossy().to_string(),
            },
            glosser: Glosser::Simple,
            language: SignLanguage::Asl,
            avatar: AvatarType::Skeleton,
        };
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn youtube_urls_are_sanity_checked() {
        let request = JobRequest {
            input: JobInput::Youtube {
                url: "https://example.com/watch".to_string(),
                prefer_captions: true,
            },
            glosser: Glosser::Simple,
            language: SignLanguage::Asl,
            avatar: AvatarType::Skeleton,
        };
        assert_eq!(request.validate(), Err(ValidationError::InvalidYoutubeUrl));

        let request = JobRequest {
            input: JobInput::Youtube {
                url: "https://youtu.be/abc123".to_string(),
                prefer_captions: false,
            },
            glosser: Glosser::Simple,
            language: SignLanguage::Fsl,
            avatar: AvatarType::Skeleton,
        };
        assert_eq!(request.validate(), Ok(()));
    }
}
