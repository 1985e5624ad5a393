//! Reporting of fatal errors
//!
//! Every error type in the crate says whether the operator can fix it
//! (a bad config value, a taken party slot) or whether it is a system fault
//! (a socket that will not bind, a poisoned lock). Fatal reports show the
//! fixable message verbatim and keep the raw detail at debug level.

/// Splits errors into operator-fixable and system faults
///
/// Implementations return `Some` from `user_message` exactly when
/// `is_user_actionable` is true.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// Log a fatal error with the operation it interrupted
///
/// ```rust,no_run
/// use waitline::core::error_handling::log_error_with_context;
/// use waitline::core::validation::ValidationError;
///
/// let err = ValidationError::new("grace_period_secs must be greater than 0");
/// log_error_with_context(&err, "Validating configuration");
/// // FATAL: grace_period_secs must be greater than 0
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(error: &E, context: &str) {
    log::error!("FATAL: {}", fatal_line(error, context));
    log::debug!("DETAIL: {error}");
    log::debug!("DEBUG_DETAILS: {error:?}");
}

fn fatal_line<'a, E: ContextualError>(error: &'a E, context: &'a str) -> &'a str {
    match error.user_message() {
        Some(message) if error.is_user_actionable() => message,
        _ => context,
    }
}
