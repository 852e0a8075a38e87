use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::channel::LineChannel;
use crate::error::{ChannelError, ProtocolError, StepFailure};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ResponsePayload};
use crate::steps::Step;

/// Category of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Stream read/write failure, timeout, or EOF before a response.
    Io,
    /// The response line is not a well-formed JSON-RPC response.
    Protocol,
    /// Well-formed response carrying an error, or rejected by the predicate.
    Step,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed { kind: FailureKind, message: String },
    NotRun,
}

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub label: String,
    pub method: String,
    /// Request id used, or `None` if the step never ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub status: StepStatus,
    /// Parsed response object, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl StepOutcome {
    fn not_run(step: &Step) -> Self {
        Self {
            label: step.label.clone(),
            method: step.method.clone(),
            id: None,
            status: StepStatus::NotRun,
            response: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

/// Aggregate outcome of one run, in step order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    pub outcomes: Vec<StepOutcome>,
    /// The run was cut short by an external interrupt.
    pub interrupted: bool,
}

impl RunResult {
    pub fn all_passed(&self) -> bool {
        !self.interrupted && self.outcomes.iter().all(StepOutcome::passed)
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// The first failed step, if any.
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.status, StepStatus::Failed { .. }))
    }
}

/// Why a single step did not pass.
#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error("{0}")]
    Channel(#[from] ChannelError),
    #[error("server closed its output without responding")]
    NoResponse,
    #[error("failed to encode request: {0}")]
    Encode(serde_json::Error),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Failure(#[from] StepFailure),
}

impl StepError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Channel(_) | Self::NoResponse | Self::Encode(_) => FailureKind::Io,
            Self::Protocol(_) => FailureKind::Protocol,
            Self::Failure(_) => FailureKind::Step,
        }
    }
}

/// Per-run state: the id counter and the outcomes accumulated so far.
///
/// Built fresh for every run and consumed into a [`RunResult`].
pub struct Runner<'a> {
    steps: &'a [Step],
    read_timeout: Duration,
    next_id: i64,
    result: RunResult,
}

impl<'a> Runner<'a> {
    pub fn new(steps: &'a [Step], read_timeout: Duration) -> Self {
        Self {
            steps,
            read_timeout,
            next_id: 1,
            result: RunResult::default(),
        }
    }

    /// Execute steps in order, stopping at the first failure.
    pub async fn run<C: LineChannel>(&mut self, channel: &mut C) {
        for step in self.steps {
            let id = self.next_id;
            self.next_id += 1;

            let mut response = None;
            let outcome = self.execute(channel, step, id, &mut response).await;

            let status = match outcome {
                Ok(()) => {
                    info!(step = %step.label, id, "step passed");
                    StepStatus::Passed
                }
                Err(e) => {
                    warn!(step = %step.label, id, error = %e, "step failed");
                    StepStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            let failed = status != StepStatus::Passed;

            self.result.outcomes.push(StepOutcome {
                label: step.label.clone(),
                method: step.method.clone(),
                id: Some(id),
                status,
                response,
            });

            if failed {
                break;
            }
        }
    }

    async fn execute<C: LineChannel>(
        &self,
        channel: &mut C,
        step: &Step,
        id: i64,
        response: &mut Option<Value>,
    ) -> Result<(), StepError> {
        let request = JsonRpcRequest::new(id, step.method.clone(), step.params.clone());
        let line = serde_json::to_string(&request).map_err(StepError::Encode)?;

        info!(step = %step.label, ">>> {line}");
        channel.write_line(&line).await?;

        let reply = channel
            .read_line(self.read_timeout)
            .await?
            .ok_or(StepError::NoResponse)?;
        info!(step = %step.label, "<<< {reply}");

        let parsed = JsonRpcResponse::parse(&reply)?;
        *response = Some(parsed.raw.clone());
        parsed.ensure_id(&request.id)?;

        match parsed.payload {
            ResponsePayload::Error(err) => return Err(StepFailure::ServerError(err).into()),
            ResponsePayload::Result(result) => step
                .predicate
                .check(&result)
                .map_err(StepFailure::PredicateRejected)?,
        }

        if let Some(method) = &step.notify_after {
            let note = serde_json::to_string(&JsonRpcNotification::new(method.clone()))
                .map_err(StepError::Encode)?;
            info!(step = %step.label, ">>> {note}");
            channel.write_line(&note).await?;
        }

        Ok(())
    }

    /// Mark every step without an outcome as not run and return the result.
    pub fn finish(mut self, interrupted: bool) -> RunResult {
        let done = self.result.outcomes.len();
        for step in &self.steps[done..] {
            self.result.outcomes.push(StepOutcome::not_run(step));
        }
        self.result.interrupted = interrupted;
        self.result
    }
}

/// Timing of a session.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Fixed wait before the first request; the protocol has no readiness signal.
    pub startup_grace: Duration,
    /// Bound on each response read.
    pub read_timeout: Duration,
}

/// Run `steps` over `channel`, then terminate the channel exactly once.
///
/// `interrupt` races the startup grace period and the run; if it resolves
/// first the run stops where it is and the remaining steps are reported as
/// not run.
pub async fn run_session<C, I>(
    mut channel: C,
    steps: &[Step],
    timing: Timing,
    interrupt: I,
) -> RunResult
where
    C: LineChannel,
    I: Future<Output = ()>,
{
    let mut runner = Runner::new(steps, timing.read_timeout);

    let interrupted = tokio::select! {
        biased;
        _ = interrupt => {
            warn!("interrupted, stopping run");
            true
        }
        _ = async {
            if !timing.startup_grace.is_zero() {
                tokio::time::sleep(timing.startup_grace).await;
            }
            runner.run(&mut channel).await;
        } => false,
    };

    channel.terminate().await;
    runner.finish(interrupted)
}
