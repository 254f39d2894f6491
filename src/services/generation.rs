use std::time::Duration;

use crate::config::PollConfig;
use crate::error::{AppError, Result};
use crate::events::{NoticeLevel, SessionEvent};
use crate::gateway::endpoints::resolve_download_url;
use crate::models::generation::{GeneratedDeck, GenerationRequest};
use crate::models::job::{GenerationJob, JobState};
use crate::models::plan::ADMIN_MAX_SLIDES;
use crate::services::admin::AdminSessionManager;
use crate::services::quota::QuotaEngine;
use crate::state::SessionContext;
use crate::validation::generation::validate_generation_request;

const PROGRESS_MESSAGES: [&str; 6] = [
    "📝 Analyzing your content...",
    "🎨 Applying design styles...",
    "📊 Creating visual elements...",
    "✨ Adding finishing touches...",
    "🔧 Optimizing presentation...",
    "📋 Finalizing slides...",
];

const MAX_PROGRESS_PERCENT: u8 = 90;

/// Runs a generation from validation to a downloadable deck.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    ctx: SessionContext,
    quota: QuotaEngine,
    admin: AdminSessionManager,
}

impl GenerationOrchestrator {
    pub fn new(ctx: SessionContext, quota: QuotaEngine, admin: AdminSessionManager) -> Self {
        Self { ctx, quota, admin }
    }

    /// Validates, applies plan policy, submits and polls until the job is
    /// terminal.
    ///
    /// # Arguments
    ///
    /// * `request` - What the user asked for.
    ///
    /// # Returns
    ///
    /// A `Result` containing the finished `GeneratedDeck`.
    pub async fn submit(&self, mut request: GenerationRequest) -> Result<GeneratedDeck> {
        validate_generation_request(&mut request)?;

        self.quota.can_generate().await.into_result()?;

        self.apply_plan_policy(&mut request).await?;

        let ctx = &self.ctx;
        let submitted = ctx
            .gateway
            .submit_generation(&ctx.user_id, &request)
            .await?;

        tracing::info!(
            "🚀 Generation job {} submitted ({} slides, {})",
            submitted.job_id,
            request.slide_count,
            request.design_style
        );
        ctx.events.emit(SessionEvent::GenerationStarted {
            job_id: submitted.job_id.clone(),
            slide_count: request.slide_count,
            design_style: request.design_style.clone(),
        });

        let estimate = job_estimate(submitted.estimated_time, &ctx.config.poll);

        self.poll_job(&submitted.job_id, estimate).await
    }

    /// Polls a submitted job until it is done, failed, or the poll budget is
    /// spent.
    ///
    /// The budget is `max(min_attempts, ceil(estimate / interval))`, with the
    /// estimate clamped to `max_estimate`.
    pub async fn poll_job(&self, job_id: &str, estimate: Duration) -> Result<GeneratedDeck> {
        let ctx = &self.ctx;
        let poll = &ctx.config.poll;
        let estimate = estimate.min(poll.max_estimate);
        let max_attempts = poll_budget(estimate, poll.interval, poll.min_attempts);
        let started = ctx.clock.now();

        let mut job = GenerationJob::new(job_id);
        let mut attempts = 0;
        let mut consecutive_failures = 0;

        while attempts < max_attempts {
            let progress_step = attempts;
            attempts += 1;

            let report = match ctx.gateway.job_status(job_id).await {
                Ok(status) => match status.state {
                    Some(state) => Ok((state, status)),
                    None => Err(status
                        .error
                        .unwrap_or_else(|| "Job status check failed".to_string())),
                },
                Err(e) => Err(e.to_string()),
            };

            let (state, status) = match report {
                Ok(report) => report,
                Err(reason) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        "⚠️  Job polling attempt {} failed: {}",
                        attempts,
                        reason
                    );
                    if consecutive_failures >= poll.max_consecutive_failures {
                        return Err(AppError::StatusCheckUnavailable(reason));
                    }
                    ctx.clock.sleep(poll.retry_delay).await;
                    continue;
                }
            };

            consecutive_failures = 0;
            job.apply(state, &status);

            match job.state {
                JobState::Done => {
                    let download_url = job
                        .download_url
                        .as_deref()
                        .map(|url| resolve_download_url(&ctx.config.api_base_url, url));
                    tracing::info!("✅ Job {} done after {} polls", job.id, attempts);
                    ctx.events.emit(SessionEvent::GenerationCompleted {
                        filename: job.filename.clone(),
                        download_url: download_url.clone(),
                    });
                    return Ok(GeneratedDeck {
                        job_id: job.id,
                        filename: job.filename,
                        download_url,
                    });
                }
                JobState::Failed => {
                    let message = job
                        .error
                        .unwrap_or_else(|| "Generation failed on server".to_string());
                    tracing::error!("❌ Job {} failed: {}", job_id, message);
                    return Err(AppError::JobFailed(message));
                }
                JobState::Pending => {
                    let elapsed = ctx
                        .clock
                        .now()
                        .signed_duration_since(started)
                        .to_std()
                        .unwrap_or_default();
                    ctx.events.emit(SessionEvent::GenerationProgress {
                        message: progress_message(progress_step, max_attempts),
                        percent: progress_percent(elapsed, estimate),
                    });
                    ctx.clock.sleep(poll.interval).await;
                }
            }
        }

        tracing::warn!("⏰ Job {} still pending after {} polls", job_id, attempts);
        Err(AppError::TimeoutExceeded { attempts })
    }

    async fn apply_plan_policy(&self, request: &mut GenerationRequest) -> Result<()> {
        let events = &self.ctx.events;

        if self.admin.is_active().await {
            if request.slide_count > ADMIN_MAX_SLIDES {
                tracing::info!(
                    "👑 Clamping {} slides to the admin maximum of {}",
                    request.slide_count,
                    ADMIN_MAX_SLIDES
                );
                events.notice(
                    NoticeLevel::Info,
                    format!("Admin maximum is {} slides", ADMIN_MAX_SLIDES),
                );
                request.slide_count = ADMIN_MAX_SLIDES;
            }
            return Ok(());
        }

        let plan = self.quota.effective_plan().await;

        if request.slide_count > plan.max_slides {
            return Err(AppError::Validation(format!(
                "Maximum {} slides allowed for {} plan",
                plan.max_slides, plan.name
            )));
        }

        if !plan.visual_elements_allowed && request.wants_visual_elements() {
            tracing::debug!("Visual elements disabled on {} plan", plan.id);
            request.clear_visual_elements();
            events.notice(
                NoticeLevel::Info,
                format!("Visual elements are not available on the {} plan", plan.name),
            );
        }

        Ok(())
    }
}

fn job_estimate(estimated_secs: Option<f64>, poll: &PollConfig) -> Duration {
    estimated_secs
        .filter(|secs| *secs > 0.0)
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .unwrap_or(poll.max_estimate)
                .min(poll.max_estimate)
        })
        .unwrap_or(poll.default_estimate)
}

fn poll_budget(estimate: Duration, interval: Duration, min_attempts: u32) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    let needed = estimate.as_millis().div_ceil(interval_ms);
    u32::try_from(needed).unwrap_or(u32::MAX).max(min_attempts)
}

fn progress_message(step: u32, max_attempts: u32) -> &'static str {
    let index = (step as usize * PROGRESS_MESSAGES.len()) / max_attempts.max(1) as usize;
    PROGRESS_MESSAGES[index.min(PROGRESS_MESSAGES.len() - 1)]
}

fn progress_percent(elapsed: Duration, estimate: Duration) -> u8 {
    if estimate.is_zero() {
        return MAX_PROGRESS_PERCENT;
    }
    let pct = (elapsed.as_secs_f64() / estimate.as_secs_f64() * 100.0).round();
    pct.min(f64::from(MAX_PROGRESS_PERCENT)) as u8
}
