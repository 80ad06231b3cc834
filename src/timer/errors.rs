/// Caller-input errors, detected synchronously when a schedule is armed.
///
/// The scheduling algorithm itself never produces errors: late coarse
/// timers, host starvation and slow tasks degrade accuracy, not
/// correctness, and silently extend the observed elapsed time.
#[derive(thiserror::Error, Debug)]
pub enum TimerError {
    /// A delay, interval or precision argument was omitted entirely.
    #[error(
        "no duration supplied: expected an integer followed by 's' for seconds, \
         'm' for milli, 'u' for micro and 'n' for nanoseconds, e.g. 2u"
    )]
    MissingDuration,

    /// The argument fails the `<integer><unit>` duration grammar.
    #[error(
        "invalid duration {input:?}: expected an integer followed by 's' for seconds, \
         'm' for milli, 'u' for micro and 'n' for nanoseconds, e.g. 2u"
    )]
    InvalidDurationFormat { input: String },
}
