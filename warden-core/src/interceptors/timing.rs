//! Wall-clock timing metadata

use super::{Interceptor, Operation, operation};
use chrono::{SecondsFormat, Utc};
use std::time::Instant;

/// Metadata key for elapsed milliseconds (three decimals)
pub const EXECUTION_TIME_MS_KEY: &str = "execution_time_ms";

/// Metadata key for the RFC 3339 start timestamp
pub const EXECUTION_START_KEY: &str = "execution_start";

/// Records how long the inner call took
///
/// Only successful outputs are annotated; errors pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingInterceptor;

impl Interceptor for TimingInterceptor {
    fn name(&self) -> &str {
        "timing"
    }

    fn wrap(&self, next: Operation) -> Operation {
        operation(move |ctx, tool_name, input| {
            let next = next.clone();
            async move {
                let started_at = Utc::now();
                let start = Instant::now();
                let mut output = next(ctx, tool_name, input).await?;
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

                output
                    .metadata
                    .insert(EXECUTION_TIME_MS_KEY.to_string(), format!("{:.3}", elapsed_ms));
                output.metadata.insert(
                    EXECUTION_START_KEY.to_string(),
                    started_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                );
                Ok(output)
            }
        })
    }
}
