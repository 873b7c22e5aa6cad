/// Turns a failed lookup into a logged diagnostic and an absent value.
///
/// View assembly fills most fields on a best-effort basis: a failing source is
/// reported and the field keeps its zero value.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;

    /// Like [`ok_log`](ResultOkLogExt::ok_log), prefixing the logged error with
    /// the message returned by `context`. The closure only runs on failure.
    fn ok_log_with(self, context: impl FnOnce() -> String) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn ok_log_with(self, context: impl FnOnce() -> String) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{}: {}", context(), err);
                None
            }
        }
    }
}
