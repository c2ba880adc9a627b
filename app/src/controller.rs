use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use log::{debug, info};
use shared::{ApiError, BackendClient, Job, JobRequest, JobStatus};

/// One status request per interval while the job is queued or running.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug)]
pub enum JobEvent {
    Submitted(Job),
    SubmitFailed(String),
    Updated(Job),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Idle,
    Submitting,
    Active,
    Completed,
    Failed,
}

/// Owns a single conversion job's lifecycle: submit, poll, terminate.
/// Submission and polling run on a background thread; events arrive over
/// an mpsc channel drained once per repaint.
pub struct JobController {
    client: BackendClient,
    phase: JobPhase,
    job: Option<Job>,
    error: Option<String>,
    rx: Option<mpsc::Receiver<JobEvent>>,
    stop: Option<Arc<AtomicBool>>,
}

impl JobController {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            phase: JobPhase::Idle,
            job: None,
            error: None,
            rx: None,
            stop: None,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.phase, JobPhase::Submitting | JobPhase::Active)
    }

    /// Validates and submits a new conversion. A validation failure is
    /// stored as the inline error and never touches the network; any
    /// previous poll cycle is cancelled either way.
    pub fn submit(&mut self, request: JobRequest) {
        self.cancel_poll();
        self.job = None;
        self.error = None;

        if let Err(e) = request.validate() {
            debug!("submission blocked by validation: {}", e);
            self.error = Some(e.to_string());
            self.phase = JobPhase::Idle;
            return;
        }

        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        self.rx = Some(rx);
        self.stop = Some(stop.clone());
        self.phase = JobPhase::Submitting;

        let client = self.client.clone();
        std::thread::spawn(move || run_job_cycle(client, request, tx, stop));
    }

    /// Explicit user reset, the only way out of a terminal phase.
    pub fn reset(&mut self) {
        self.cancel_poll();
        self.phase = JobPhase::Idle;
        self.job = None;
        self.error = None;
    }

    /// Drain pending events from the poll cycle. Call once per repaint.
    pub fn process_events(&mut self) {
        let events: Vec<JobEvent> = match &self.rx {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };
        for event in events {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Submitted(job) | JobEvent::Updated(job) => {
                self.phase = match job.status {
                    JobStatus::Queued | JobStatus::Running => JobPhase::Active,
                    JobStatus::Completed => JobPhase::Completed,
                    JobStatus::Failed => JobPhase::Failed,
                };
                self.job = Some(job);
            }
            JobEvent::SubmitFailed(message) => {
                self.phase = JobPhase::Idle;
                self.job = None;
                self.error = Some(message);
            }
        }
    }

    /// Stops the running poll cycle and drops its channel, so a superseded
    /// cycle can never write into the next job's state.
    fn cancel_poll(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Relaxed);
        }
        self.rx = None;
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.cancel_poll();
    }
}

/// Status fetch seam so the poll loop can be driven by a scripted fake.
pub trait JobFetch {
    async fn fetch_job(&self, id: &str) -> Result<Job, ApiError>;
}

impl JobFetch for BackendClient {
    async fn fetch_job(&self, id: &str) -> Result<Job, ApiError> {
        BackendClient::fetch_job(self, id).await
    }
}

fn run_job_cycle(
    client: BackendClient,
    request: JobRequest,
    tx: mpsc::Sender<JobEvent>,
    stop: Arc<AtomicBool>,
) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let job = match client.create_job(&request).await {
            Ok(job) => job,
            Err(e) => {
                let _ = tx.send(JobEvent::SubmitFailed(e.to_string()));
                return;
            }
        };
        info!("job {} submitted with status {:?}", job.id, job.status);

        let id = job.id.clone();
        // The server may answer with a terminal status straight away.
        let terminal = job.status.is_terminal();
        let _ = tx.send(JobEvent::Submitted(job));
        if terminal {
            return;
        }

        poll_job(&client, &id, POLL_INTERVAL, &tx, &stop).await;
    });
}

/// Polls a job until a terminal status, cancellation, or a dropped
/// receiver. A failed poll is ignored and retried on the next tick.
async fn poll_job<F: JobFetch>(
    fetcher: &F,
    id: &str,
    interval: Duration,
    tx: &mpsc::Sender<JobEvent>,
    stop: &AtomicBool,
) {
    loop {
        tokio::time::sleep(interval).await;
        if stop.load(Ordering::Relaxed) {
            debug!("poll cycle for job {} cancelled", id);
            return;
        }
        match fetcher.fetch_job(id).await {
            Ok(job) => {
                let terminal = job.status.is_terminal();
                if tx.send(JobEvent::Updated(job)).is_err() {
                    return;
                }
                if terminal {
                    info!("job {} reached a terminal status, polling stopped", id);
                    return;
                }
            }
            Err(e) => {
                debug!("poll for job {} failed, retrying next tick: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn job(id: &str, status: JobStatus) -> Job {
        Job {
            id: id.to_string(),
            status,
            progress: 0.0,
            steps: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Hands out a scripted sequence of responses and counts the calls.
    struct ScriptedFetch {
        responses: Mutex<Vec<Result<Job, ApiError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedFetch {
        fn new(responses: Vec<Result<Job, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl JobFetch for ScriptedFetch {
        async fn fetch_job(&self, id: &str) -> Result<Job, ApiError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(job(id, JobStatus::Running))
            } else {
                responses.remove(0)
            }
        }
    }

    fn backend_error() -> ApiError {
        ApiError::Backend {
            status: 500,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn poll_interval_is_one_second() {
        assert_eq!(POLL_INTERVAL, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn polling_stops_on_the_tick_that_observes_a_terminal_status() {
        let fetcher = ScriptedFetch::new(vec![
            Ok(job("j", JobStatus::Queued)),
            Ok(job("j", JobStatus::Running)),
            Ok(job("j", JobStatus::Completed)),
        ]);
        let (tx, rx) = mpsc::channel();
        let stop = AtomicBool::new(false);

        poll_job(&fetcher, "j", Duration::from_millis(2), &tx, &stop).await;

        assert_eq!(fetcher.calls(), 3);
        let statuses: Vec<JobStatus> = rx
            .try_iter()
            .map(|e| match e {
                JobEvent::Updated(job) => job.status,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Completed]
        );
    }

    #[tokio::test]
    async fn a_failed_poll_is_ignored_and_retried() {
        let fetcher = ScriptedFetch::new(vec![
            Err(backend_error()),
            Ok(job("j", JobStatus::Failed)),
        ]);
        let (tx, rx) = mpsc::channel();
        let stop = AtomicBool::new(false);

        poll_job(&fetcher, "j", Duration::from_millis(2), &tx, &stop).await;

        // The failed tick emitted nothing; the next tick delivered.
        assert_eq!(fetcher.calls(), 2);
        let events: Vec<JobEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], JobEvent::Updated(j) if j.status == JobStatus::Failed));
    }

    #[tokio::test]
    async fn the_stop_flag_cancels_before_the_next_request() {
        let fetcher = ScriptedFetch::new(vec![Ok(job("j", JobStatus::Running))]);
        let (tx, _rx) = mpsc::channel();
        let stop = AtomicBool::new(true);

        poll_job(&fetcher, "j", Duration::from_millis(2), &tx, &stop).await;

        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn a_dropped_receiver_ends_the_cycle() {
        let fetcher = ScriptedFetch::new(vec![Ok(job("j", JobStatus::Running))]);
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let stop = AtomicBool::new(false);

        poll_job(&fetcher, "j", Duration::from_millis(2), &tx, &stop).await;

        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn events_drive_the_phase_machine() {
        let mut controller = JobController::new(BackendClient::new("http://localhost:1"));
        assert_eq!(controller.phase(), JobPhase::Idle);

        controller.apply_event(JobEvent::Submitted(job("j", JobStatus::Queued)));
        assert_eq!(controller.phase(), JobPhase::Active);
        assert!(controller.is_generating());

        controller.apply_event(JobEvent::Updated(job("j", JobStatus::Running)));
        assert_eq!(controller.phase(), JobPhase::Active);

        controller.apply_event(JobEvent::Updated(job("j", JobStatus::Completed)));
        assert_eq!(controller.phase(), JobPhase::Completed);
        assert!(!controller.is_generating());

        controller.reset();
        assert_eq!(controller.phase(), JobPhase::Idle);
        assert!(controller.job().is_none());
    }

    #[test]
    fn a_submit_failure_returns_to_idle_with_the_message() {
        let mut controller = JobController::new(BackendClient::new("http://localhost:1"));
        controller.apply_event(JobEvent::Submitted(job("j", JobStatus::Queued)));
        controller.apply_event(JobEvent::SubmitFailed(
            "Failed to reach the backend API.".to_string(),
        ));
        assert_eq!(controller.phase(), JobPhase::Idle);
        assert!(controller.job().is_none());
        assert_eq!(controller.error(), Some("Failed to reach the backend API."));
    }

    #[test]
    fn poll_responses_replace_the_job_wholesale() {
        let mut controller = JobController::new(BackendClient::new("http://localhost:1"));
        let mut first = job("j", JobStatus::Running);
        first.progress = 40.0;
        first.error = Some("transient note".to_string());
        controller.apply_event(JobEvent::Submitted(first));

        let mut second = job("j", JobStatus::Running);
        second.progress = 65.0;
        controller.apply_event(JobEvent::Updated(second));

        let current = controller.job().unwrap();
        assert_eq!(current.progress, 65.0);
        assert!(current.error.is_none());
    }

    #[test]
    fn invalid_requests_never_spawn_a_cycle() {
        use shared::{AvatarType, Glosser, JobInput, SignLanguage};
        let mut controller = JobController::new(BackendClient::new("http://localhost:1"));
        controller.submit(JobRequest {
            input: JobInput::Text {
                text: "hello".to_string(),
            },
            glosser: Glosser::Rules,
            language: SignLanguage::Asl,
            avatar: AvatarType::Human,
        });
        assert_eq!(controller.phase(), JobPhase::Idle);
        assert_eq!(
            controller.error(),
            Some("Rules glosser only supports French input (FSL).")
        );
        assert!(controller.rx.is_none());
    }

    #[test]
    fn a_new_submission_supersedes_the_previous_cycle() {
        use shared::{AvatarType, Glosser, JobInput, SignLanguage};
        let request = || JobRequest {
            input: JobInput::Text {
                text: "hello".to_string(),
            },
            glosser: Glosser::Simple,
            language: SignLanguage::Asl,
            avatar: AvatarType::Human,
        };
        let mut controller = JobController::new(BackendClient::new("http://localhost:1"));

        controller.submit(request());
        let first_stop = controller.stop.clone().unwrap();

        controller.submit(request());
        assert!(
            first_stop.load(Ordering::Relaxed),
            "first cycle must be cancelled"
        );

        // Only the second cycle holds a sender for the live channel; the
        // first one's sender points at a dropped receiver, so its events
        // can never land here.
        let rx = controller.rx.as_ref().unwrap();
        let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(event, JobEvent::SubmitFailed(_)));
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
