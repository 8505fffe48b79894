//! Batch execution with fail-fast cancellation

use super::{BatchReport, ExecutionResult, Executor, ToolExecution};
use crate::context::{ContextError, ExecutionContext};
use crate::error::ToolError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

impl Executor {
    /// Run many calls under one coordination scope
    ///
    /// - At most `max_concurrent` calls run at once (zero means unbounded).
    /// - The first failure cancels a shared child context; calls that have
    ///   not started yet resolve as cancelled, running calls are signalled.
    /// - `results[i]` always belongs to `executions[i]`, and every slot is
    ///   filled.
    pub async fn execute_many(
        &self,
        ctx: &ExecutionContext,
        executions: Vec<ToolExecution>,
    ) -> BatchReport {
        if executions.is_empty() {
            return BatchReport::default();
        }

        let total = executions.len();
        let names: Vec<String> = executions.iter().map(|e| e.tool_name.clone()).collect();
        let shared = ctx.child();
        let semaphore = self
            .config()
            .concurrency_limit()
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let slots: Arc<Mutex<Vec<Option<ExecutionResult>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));
        let first_error: Arc<Mutex<Option<ToolError>>> = Arc::new(Mutex::new(None));

        tracing::debug!(
            total,
            max_concurrent = self.config().max_concurrent,
            "Starting batch execution"
        );

        let mut tasks = JoinSet::new();
        for (index, execution) in executions.into_iter().enumerate() {
            let permit = match &semaphore {
                Some(semaphore) => tokio::select! {
                    biased;
                    _ = shared.done() => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None if shared.is_done() => break,
                None => None,
            };

            let executor = self.clone();
            let shared = shared.clone();
            let slots = slots.clone();
            let first_error = first_error.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = executor
                    .run_timed(&shared, execution.tool_name, execution.input.map(Arc::new))
                    .await;

                if let Some(err) = result.error() {
                    let mut first = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                    if first.is_none() {
                        tracing::debug!(index, error = %err, "Batch entry failed, cancelling the rest");
                        *first = Some(err.clone());
                        shared.cancel();
                    }
                }

                slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "Batch task did not complete");
            }
        }

        let reason = shared.err().unwrap_or(ContextError::Cancelled);
        let filled = std::mem::take(&mut *slots.lock().unwrap_or_else(PoisonError::into_inner));
        let mut first_error = first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let results: Vec<ExecutionResult> = filled
            .into_iter()
            .zip(names)
            .map(|(slot, name)| match slot {
                Some(result) => result,
                None => {
                    let err = ToolError::from_context(&name, reason, self.config().timeout);
                    first_error.get_or_insert_with(|| err.clone());
                    ExecutionResult::not_started(name, err)
                }
            })
            .collect();

        tracing::debug!(
            total,
            failed = results.iter().filter(|r| !r.is_success()).count(),
            "Batch execution finished"
        );

        BatchReport {
            results,
            first_error,
        }
    }
}
