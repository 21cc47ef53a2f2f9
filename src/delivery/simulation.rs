//! Simulation result interpretation.

use crate::transport::SimulationOutcome;

const ERROR_PATTERNS: &[&str] = &["error", "failed"];

/// Human-readable reason a simulation failed, or `None` if it succeeded.
///
/// Prefers the first diagnostic log line that looks like an error and falls
/// back to the structured error field.
pub fn simulation_error_message(outcome: &SimulationOutcome) -> Option<String> {
    let structured = outcome.error.as_ref()?;

    let from_logs = outcome.logs.iter().find(|line| {
        let lower = line.to_lowercase();
        ERROR_PATTERNS.iter().any(|p| lower.contains(p))
    });

    Some(
        from_logs
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| structured.clone()),
    )
}
