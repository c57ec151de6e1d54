//! The retry controller.
//!
//! Drives one question through generate → execute → (retry | escalate) →
//! validate, projecting every transition onto a [`PipelineEvent`] stream.
//! The stream contract: zero or more `status` frames, then exactly one
//! terminal frame (`complete` xor `error`). A cancelled run ends the
//! stream without a terminal frame.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use metrics::counter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use huddle_core::conversation::latest_user_content;
use huddle_core::{
    Attempt, ConversationTurn, ExecErrorKind, ExecFailure, ExecutionOutcome, ModelTier,
    PipelineEvent, PipelineResult, PipelineStep,
};
use huddle_llm::codegen::{CodegenClient, PriorFeedback};
use huddle_llm::validator::Validator;
use huddle_sandbox::Sandbox;

use crate::config::PipelineConfig;

/// Boxed event stream returned by [`Pipeline::run`].
pub type EventStream = Pin<Box<dyn Stream<Item = PipelineEvent> + Send>>;

/// One configured pipeline, shared behind `Arc` across requests.
pub struct Pipeline {
    codegen: CodegenClient,
    validator: Validator,
    sandbox: Sandbox,
    config: PipelineConfig,
}

impl Pipeline {
    /// Assemble a pipeline from its components.
    #[must_use]
    pub fn new(
        codegen: CodegenClient,
        validator: Validator,
        sandbox: Sandbox,
        config: PipelineConfig,
    ) -> Self {
        Self {
            codegen,
            validator,
            sandbox,
            config,
        }
    }

    /// The pipeline's configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one question, yielding progress events as work happens.
    ///
    /// Cancelling `cancel` stops the run at the next await point; the
    /// stream then ends without a terminal frame.
    #[must_use]
    pub fn run(
        self: Arc<Self>,
        conversation: Vec<ConversationTurn>,
        cancel: CancellationToken,
    ) -> EventStream {
        let this = self;
        Box::pin(stream! {
            let Some(question) = latest_user_content(&conversation).map(ToString::to_string)
            else {
                yield PipelineEvent::Error {
                    step: PipelineStep::Analyzing,
                    message: "The conversation contains no user question.".into(),
                    data: None,
                };
                return;
            };

            yield PipelineEvent::status(
                PipelineStep::Analyzing,
                "Analyzing your question...",
                None,
            );

            let tiers = [
                (
                    ModelTier::Primary,
                    this.config.max_attempts_primary,
                    this.config.primary_model.clone(),
                ),
                (
                    ModelTier::Fallback,
                    this.config.max_attempts_fallback,
                    this.config.fallback_model.clone(),
                ),
            ];

            let mut log: Vec<Attempt> = Vec::new();
            let mut attempts: u32 = 0;
            let mut used_fallback = false;
            let mut feedback: Option<PriorFeedback> = None;
            let mut last_plan: Option<String> = None;
            let mut success: Option<(String, Value)> = None;

            'tiers: for (tier, budget, model) in tiers {
                if budget == 0 {
                    continue;
                }
                if tier == ModelTier::Fallback {
                    used_fallback = true;
                    counter!("pipeline_fallback_escalations_total").increment(1);
                    info!(model = %model, "escalating to the fallback tier");
                    yield PipelineEvent::status(
                        PipelineStep::Fallback,
                        "Switching to the fallback model...",
                        None,
                    );
                }

                for attempt_in_tier in 1..=budget {
                    attempts += 1;
                    counter!("pipeline_attempts_total", "tier" => tier.as_str()).increment(1);
                    yield PipelineEvent::status(
                        PipelineStep::Generating,
                        "Writing a query plan...",
                        Some(attempts),
                    );

                    let generated = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!(attempts, "run cancelled during generation");
                            return;
                        }
                        result = this.codegen.generate(
                            &model,
                            &conversation,
                            feedback.as_ref(),
                            attempts,
                            tier,
                        ) => result,
                    };

                    let failure = match generated {
                        Ok(candidate) => {
                            last_plan = Some(candidate.source.clone());
                            yield PipelineEvent::status(
                                PipelineStep::Executing,
                                "Running the query...",
                                Some(attempts),
                            );

                            let outcome = tokio::select! {
                                biased;
                                () = cancel.cancelled() => {
                                    info!(attempts, "run cancelled during execution");
                                    return;
                                }
                                outcome = this.sandbox.execute(&candidate) => outcome,
                            };

                            match outcome {
                                ExecutionOutcome::Success { result } => {
                                    info!(attempts, tier = tier.as_str(), "attempt succeeded");
                                    log.push(Attempt {
                                        index: attempts,
                                        tier,
                                        error: None,
                                    });
                                    success = Some((candidate.source, Value::Object(result)));
                                    break 'tiers;
                                }
                                ExecutionOutcome::Failure(failure) => {
                                    feedback = Some(PriorFeedback {
                                        failed_plan: Some(candidate.source),
                                        failure: failure.clone(),
                                    });
                                    failure
                                }
                            }
                        }
                        Err(e) => {
                            let failure =
                                ExecFailure::new(ExecErrorKind::GenerationError, e.to_string());
                            feedback = Some(PriorFeedback {
                                failed_plan: None,
                                failure: failure.clone(),
                            });
                            failure
                        }
                    };

                    warn!(
                        attempts,
                        tier = tier.as_str(),
                        kind = failure.kind.as_str(),
                        "attempt failed"
                    );
                    log.push(Attempt {
                        index: attempts,
                        tier,
                        error: Some(failure.to_string()),
                    });
                    counter!(
                        "pipeline_attempt_failures_total",
                        "kind" => failure.kind.as_str()
                    )
                    .increment(1);

                    if attempt_in_tier < budget {
                        yield PipelineEvent::status(
                            PipelineStep::Retrying,
                            "Retrying with error feedback...",
                            Some(attempts),
                        );
                    }
                }
            }

            match success {
                Some((plan, raw)) => {
                    yield PipelineEvent::status(
                        PipelineStep::Validating,
                        "Validating the result...",
                        None,
                    );

                    let verdict = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!(attempts, "run cancelled during validation");
                            return;
                        }
                        verdict = this.validator.validate(&question, &raw) => verdict,
                    };

                    // Validation is best-effort: a validator outage degrades
                    // to an unvalidated answer rather than failing the run.
                    let response = match verdict {
                        Ok(verdict) => {
                            if !verdict.is_valid {
                                warn!("validator judged the result implausible");
                            }
                            verdict.summary
                        }
                        Err(e) => {
                            warn!(error = %e, "validation unavailable");
                            format!(
                                "The query ran successfully but the answer could not be \
                                 verified. Raw result: {raw}"
                            )
                        }
                    };

                    counter!("pipeline_runs_total", "outcome" => "complete").increment(1);
                    yield PipelineEvent::Complete {
                        step: PipelineStep::Done,
                        message: "Answer ready.".into(),
                        data: PipelineResult {
                            response,
                            code_generated: Some(plan),
                            raw_data: Some(raw),
                            attempts,
                            used_fallback,
                        },
                    };
                }
                None => {
                    // The give-up message surfaces only the last attempt's
                    // error; earlier ones were already folded into feedback.
                    let detail = log
                        .last()
                        .and_then(|a| a.error.clone())
                        .unwrap_or_else(|| "no attempts were made".to_string());
                    counter!("pipeline_runs_total", "outcome" => "give_up").increment(1);
                    warn!(attempts, "every attempt failed; giving up");
                    yield PipelineEvent::Error {
                        step: PipelineStep::Generating,
                        message: "I wasn't able to answer that question.".into(),
                        data: Some(PipelineResult {
                            response: format!(
                                "Every attempt to answer failed. Last error: {detail}"
                            ),
                            code_generated: last_plan,
                            raw_data: None,
                            attempts,
                            used_fallback,
                        }),
                    };
                }
            }
        })
    }

    /// Run one question and return only the terminal result.
    ///
    /// Returns `None` when the run was cancelled or produced a terminal
    /// error frame without a payload.
    pub async fn run_collect(
        self: Arc<Self>,
        conversation: Vec<ConversationTurn>,
        cancel: CancellationToken,
    ) -> Option<PipelineResult> {
        let mut events = self.run(conversation, cancel);
        let mut terminal = None;
        while let Some(event) = events.next().await {
            match event {
                PipelineEvent::Complete { data, .. } => terminal = Some(data),
                PipelineEvent::Error { data, .. } => terminal = data,
                PipelineEvent::Status { .. } => {}
            }
        }
        terminal
    }
}
