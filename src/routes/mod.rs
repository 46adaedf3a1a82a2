mod health_check;
mod welcome;
pub use health_check::*;
pub use welcome::*;

/// Print an error, followed by every error in its `source` chain, one per
/// line. Used for the `Debug` impls of our error types, so that logs show the
/// full story rather than just the outermost message.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}
