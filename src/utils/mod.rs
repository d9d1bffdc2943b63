//! Utility functions used throughout the runtime.

mod measure;

pub(crate) use self::measure::measure_fn;
