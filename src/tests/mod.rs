mod basic;
mod concurrent;

/// Turns on `log::trace!`/`log::debug!` output (GCAS rollbacks, generation
/// renewals, RDCSS retries) for the duration of the test binary. Safe to
/// call from every test that wants it; only the first call has any effect.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
