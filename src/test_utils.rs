/// Routes `log` output of the crate into the test harness' captured output.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
