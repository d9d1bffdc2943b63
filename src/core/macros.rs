//! Internal macros for unrecoverable runtime faults.

/// Prints a diagnostic for a broken runtime invariant and aborts.
///
/// Reserved for states the scheduler cannot continue from, such as the
/// timer service failing to start. Recoverable misuse goes through
/// [`raise!`] instead.
///
/// [`raise!`]: crate::raise
macro_rules! fatal {
  ($error:expr) => {{
    ::std::eprintln!(
      "{}:{}: (SysInv) a scheduler invariant has been broken: {}",
      ::std::file!(),
      ::std::line!(),
      $error,
    );

    ::std::process::abort();
  }};
}

pub(crate) use fatal;
