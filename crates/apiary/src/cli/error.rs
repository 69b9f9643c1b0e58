//! Error formatting and exit codes for CLI output.

/// Format an error for user display, adding the first cause when it says
/// something the top-level message does not.
#[must_use]
pub fn format_error(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    match err.source().map(ToString::to_string) {
        Some(source) if !source.is_empty() && !msg.contains(&source) => {
            format!("{msg}\nCause: {source}")
        }
        _ => msg,
    }
}

/// Machine-readable error code, `ERROR` for anything outside the core.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<apiary_core::Error>()
        .map_or("ERROR", apiary_core::Error::code)
}

/// Exit code for an error.
///
/// * 1 - invalid input
/// * 2 - system failure (storage, IO, inspection service)
/// * 3 - batch or hive not found
/// * 4 - operation not allowed in the current state
#[must_use]
pub fn get_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(core_err) = err.downcast_ref::<apiary_core::Error>() {
        return core_err.exit_code();
    }

    if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
        return if io_err.kind() == std::io::ErrorKind::NotFound {
            3
        } else {
            2
        };
    }

    2
}
