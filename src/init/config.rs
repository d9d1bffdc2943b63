use crate::consts::TASK_BATCH_SIZE;

/// Process-wide scheduler settings applied by [`configure`].
///
/// [`configure`]: crate::init::configure
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct RuntimeConfig {
  // ---------------------------------------------------------------------------
  // Dispatcher
  // ---------------------------------------------------------------------------
  pub task_batch_size: usize,

  // ---------------------------------------------------------------------------
  // Tracing
  // ---------------------------------------------------------------------------
  pub tracing_source_file: bool,
  pub tracing_source_line: bool,
  pub tracing_source_name: bool,
  pub tracing_thread_info: bool,
  pub tracing_verbose: bool,
  pub tracing_very_verbose: bool,
}

impl RuntimeConfig {
  #[inline]
  pub const fn new() -> Self {
    Self {
      task_batch_size: TASK_BATCH_SIZE,
      tracing_source_file: false,
      tracing_source_line: false,
      tracing_source_name: false,
      tracing_thread_info: true,
      tracing_verbose: false,
      tracing_very_verbose: false,
    }
  }

  /// Returns the most verbose level the installed subscriber records.
  #[inline]
  pub const fn tracing_filter(&self) -> tracing::Level {
    if self.tracing_very_verbose {
      tracing::Level::TRACE
    } else if self.tracing_verbose {
      tracing::Level::DEBUG
    } else {
      tracing::Level::INFO
    }
  }
}

impl Default for RuntimeConfig {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::init::RuntimeConfig;

  #[test]
  fn test_tracing_filter() {
    let mut config: RuntimeConfig = RuntimeConfig::new();

    assert_eq!(config.tracing_filter(), tracing::Level::INFO);

    config.tracing_verbose = true;
    assert_eq!(config.tracing_filter(), tracing::Level::DEBUG);

    config.tracing_very_verbose = true;
    assert_eq!(config.tracing_filter(), tracing::Level::TRACE);
  }
}
