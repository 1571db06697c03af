use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::generation::{
    Clock, GenerationError, GenerationKind, Generator, ImageGeneration, ImageSubmission,
    TokioClock, VideoGeneration, VideoSubmission,
};
use crate::limiter::ConcurrencyLimiter;
use crate::state_machine::{Job, JobId, JobRequest, JobView, Transition};
use crate::store::JobStore;
use crate::upload::{AssetUploader, HandshakeCipher, PublicHostUploader, SignedUploader};
use crate::upstream::UpstreamClient;

/// Called once with the terminal record of every job that is still in the
/// store when it finishes.
pub type CompletionHook = Arc<dyn Fn(&Job) + Send + Sync>;

/// Library entry point: accepts submissions and drives each job in its own
/// detached task.
pub struct Orchestrator {
    store: Arc<JobStore>,
    limiter: Arc<ConcurrencyLimiter>,
    generator: Arc<Generator>,
    config: EngineConfig,
    on_complete: Option<CompletionHook>,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_clock(config, Arc::new(TokioClock::new()))
    }

    /// Build with an explicit time source for the poll loops. The config is
    /// validated first, so hand-built values get the same checks as a file.
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        config.validate()?;
        let client = UpstreamClient::new(&config.upstream)?;
        let uploader = AssetUploader::new(
            SignedUploader::new(
                client.clone(),
                HandshakeCipher::new(&config.upstream.handshake_secret),
            ),
            PublicHostUploader::new(
                client.http().clone(),
                config.upstream.public_host_url.clone(),
            ),
        );
        let generator = Generator::new(client, uploader, clock);

        Ok(Self {
            store: Arc::new(JobStore::new(config.job_ttl())),
            limiter: Arc::new(ConcurrencyLimiter::new(config.max_concurrent_upstream)),
            generator: Arc::new(generator),
            config,
            on_complete: None,
        })
    }

    pub fn with_completion_hook(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Queue an image job and return its id without waiting for it.
    pub async fn submit_image(
        &self,
        submission: ImageSubmission,
        owner: Option<String>,
    ) -> Result<JobId, GenerationError> {
        let job = ImageGeneration::prepare(submission, &self.config.image)?;
        let id = self
            .store
            .create(JobRequest::Image(job.request().clone()), owner)
            .await;
        self.dispatch(id.clone(), job);
        Ok(id)
    }

    /// Queue a video job and return its id without waiting for it.
    pub async fn submit_video(
        &self,
        submission: VideoSubmission,
        owner: Option<String>,
    ) -> Result<JobId, GenerationError> {
        let job = VideoGeneration::prepare(submission, &self.config.video)?;
        let id = self
            .store
            .create(JobRequest::Video(job.request().clone()), owner)
            .await;
        self.dispatch(id.clone(), job);
        Ok(id)
    }

    /// Polling read. `None` means unknown or already reaped.
    pub async fn status(&self, id: &JobId) -> Option<JobView> {
        self.store.view(id).await
    }

    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        self.store.spawn_reaper(self.config.reap_interval())
    }

    fn dispatch<K>(&self, id: JobId, job: K)
    where
        K: GenerationKind + 'static,
    {
        let store = Arc::clone(&self.store);
        let limiter = Arc::clone(&self.limiter);
        let generator = Arc::clone(&self.generator);
        let on_complete = self.on_complete.clone();

        tokio::spawn(async move {
            limiter
                .run(async {
                    if !store.transition(&id, Transition::Start).await {
                        return;
                    }
                    tracing::info!(
                        job_id = %id,
                        kind = job.label(),
                        running = limiter.running(),
                        queued = limiter.queued(),
                        "Job admitted"
                    );

                    let transition = match generator.run(&job).await {
                        Ok(result) => {
                            tracing::info!(job_id = %id, kind = job.label(), "Job completed");
                            Transition::Complete(result)
                        }
                        Err(e) => {
                            tracing::error!(
                                job_id = %id,
                                kind = job.label(),
                                error_kind = %e.kind(),
                                error = %e,
                                "Job failed"
                            );
                            Transition::Fail(e.to_failure())
                        }
                    };
                    store.transition(&id, transition).await;
                })
                .await;

            if let Some(hook) = on_complete {
                match store.get(&id).await {
                    Some(job) if job.status.is_terminal() => hook(&job),
                    _ => {}
                }
            }
        });
    }
}
