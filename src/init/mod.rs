//! One-time setup for hosts embedding the scheduler.
//!
//! Nothing here is required: with no configuration the dispatcher drains
//! inline with the default batch size and events go to whatever tracing
//! subscriber the host installed. [`configure`] applies a
//! [`RuntimeConfig`] and, with the `tracing` feature, installs a compact
//! formatting subscriber.

mod config;

pub use self::config::RuntimeConfig;

use std::fmt::Display;

use crate::dispatch;
use crate::error::Exception;
use crate::error::ExceptionGroup;

/// Applies `config` to the running process.
///
/// # Errors
///
/// Returns a [`SysInv`] exception if a tracing subscriber was requested
/// but one is already installed, or if the batch size is zero.
///
/// [`SysInv`]: ExceptionGroup::SysInv
pub fn configure(config: &RuntimeConfig) -> Result<(), Exception> {
  if config.task_batch_size == 0 {
    return Err(error("dispatcher batch size must be non-zero"));
  }

  dispatch::set_batch_size(config.task_batch_size);

  tracing::debug!(batch = config.task_batch_size, "dispatcher configured");

  install_tracing(config)
}

/// Installs the global tracing subscriber described by `config`.
#[cfg(feature = "tracing")]
pub fn install_tracing(config: &RuntimeConfig) -> Result<(), Exception> {
  use tracing_subscriber::FmtSubscriber;
  use tracing_subscriber::fmt::format;
  use tracing_subscriber::util::SubscriberInitExt;

  FmtSubscriber::builder()
    .event_format(format().compact())
    .log_internal_errors(true)
    .with_ansi(true)
    .with_file(config.tracing_source_file)
    .with_level(true)
    .with_line_number(config.tracing_source_line)
    .with_max_level(config.tracing_filter())
    .with_target(config.tracing_source_name)
    .with_thread_ids(config.tracing_thread_info)
    .with_thread_names(config.tracing_thread_info)
    .finish()
    .try_init()
    .map_err(error)
}

/// Installs the global tracing subscriber described by `config`.
///
/// Without the `tracing` feature this does nothing.
#[cfg(not(feature = "tracing"))]
pub fn install_tracing(_config: &RuntimeConfig) -> Result<(), Exception> {
  Ok(())
}

#[cold]
fn error<E>(error: E) -> Exception
where
  E: Display,
{
  Exception::new(ExceptionGroup::SysInv, error)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::error::Exception;
  use crate::error::ExceptionGroup;
  use crate::init;
  use crate::init::RuntimeConfig;

  #[test]
  fn test_configure_rejects_zero_batch() {
    let mut config: RuntimeConfig = RuntimeConfig::new();

    config.task_batch_size = 0;

    let error: Exception = init::configure(&config).unwrap_err();

    assert_eq!(error.group(), ExceptionGroup::SysInv);
  }
}
