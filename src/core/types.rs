use super::error::ThermoError;

/// Result alias used throughout the acquisition, chain and controller code.
///
/// Every fallible operation in `core` reports a [`ThermoError`], so callers
/// can match on one error type whether the failure came from sysfs, SQLite or
/// a sink further down the chain.
pub type ThermoResult<T> = std::result::Result<T, ThermoError>;
