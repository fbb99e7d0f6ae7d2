//! Result-code mapping and error types
//!
//! The driver overloads its `int` return channel: non-negative values are
//! results (a device id, a method bitmask, plain success) and negative
//! values are failures. [`ResultCode::classify`] is the one place that
//! splits the two, so the rest of the crate deals in typed values only.

use std::any::Any;
use std::os::raw::c_int;
use std::panic::{self, UnwindSafe};
use std::path::PathBuf;

use thiserror::Error;

use crate::memory::LibraryString;
use crate::sys::{NativeLibrary, TELLSTICK_ERROR_UNKNOWN};
use crate::types::ResultCategory;

/// Error type for every fallible binding operation
#[derive(Error, Debug)]
pub enum Error {
    /// The driver reported a negative result code
    #[error("{operation} failed: {message} ({category}, code {code})")]
    Native {
        operation: &'static str,
        code: i32,
        category: ResultCategory,
        /// Text from `tdGetErrorString`
        message: String,
    },

    /// Rejected locally, the driver was never called
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The driver library could not be opened or lacks an entry point
    #[error("Failed to load driver library {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A blocking driver call moved off the async runtime panicked or was
    /// cancelled
    #[cfg(feature = "async")]
    #[error("Driver call did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// The driver's failure category, for errors the driver reported
    pub fn category(&self) -> Option<ResultCategory> {
        match self {
            Self::Native { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// The raw driver code, for errors the driver reported
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Native { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A raw `int` returned by a driver entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub i32);

/// Typed interpretation of a [`ResultCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The code itself, read per call: a device id, a bitmask, or just "ok"
    Success(i32),
    Failure(ResultCategory),
}

impl ResultCode {
    /// Split a return value into success or a failure category. Total over
    /// `i32`.
    pub fn classify(self) -> Outcome {
        if self.0 >= 0 {
            Outcome::Success(self.0)
        } else {
            Outcome::Failure(ResultCategory::from_code(self.0))
        }
    }
}

/// Look up the driver's message for a result code.
///
/// The driver allocates the message; it is released before this returns.
/// An empty or missing message falls back to the category's text.
pub fn describe<L: NativeLibrary>(lib: &L, code: i32) -> String {
    let message = unsafe { LibraryString::from_raw(lib, lib.td_get_error_string(code)) };
    message
        .into_string()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| ResultCategory::from_code(code).error_message().to_string())
}

/// Turn an `int` return into the success value or a described error
pub(crate) fn check<L: NativeLibrary>(lib: &L, operation: &'static str, code: c_int) -> Result<i32> {
    match ResultCode(code).classify() {
        Outcome::Success(value) => Ok(value),
        Outcome::Failure(category) => {
            let message = describe(lib, code);
            tracing::debug!(operation, code, %category, "Driver call failed");
            Err(Error::Native {
                operation,
                code,
                category,
                message,
            })
        }
    }
}

/// Entry points that return C `bool` only say "failed"; report that as the
/// driver's generic unknown error.
pub(crate) fn check_bool<L: NativeLibrary>(
    lib: &L,
    operation: &'static str,
    succeeded: bool,
) -> Result<()> {
    if succeeded {
        Ok(())
    } else {
        check(lib, operation, TELLSTICK_ERROR_UNKNOWN).map(|_| ())
    }
}

/// Run a callback body so that a panic never unwinds into the driver.
///
/// Unwinding across an `extern "system"` frame aborts the process, so a
/// panicking subscriber is logged and swallowed here.
pub(crate) fn catch_callback_panic<F>(event: &'static str, f: F)
where
    F: FnOnce() + UnwindSafe,
{
    if let Err(panic_info) = panic::catch_unwind(f) {
        let msg = get_panic_message(&panic_info);
        tracing::warn!(event, panic = %msg, "Event subscriber panicked");
    }
}

/// Extract a message from panic info
fn get_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_splits_on_sign() {
        assert_eq!(ResultCode(0).classify(), Outcome::Success(0));
        assert_eq!(ResultCode(1023).classify(), Outcome::Success(1023));
        assert_eq!(
            ResultCode(-3).classify(),
            Outcome::Failure(ResultCategory::DeviceNotFound)
        );
        assert_eq!(
            ResultCode(-42).classify(),
            Outcome::Failure(ResultCategory::Unknown)
        );
    }

    #[test]
    fn test_panic_catching() {
        catch_callback_panic("test", || panic!("Test panic"));
        catch_callback_panic("test", || std::panic::panic_any(7_u32));
    }

    #[test]
    fn test_error_accessors() {
        let err = Error::Native {
            operation: "tdTurnOn",
            code: -4,
            category: ResultCategory::MethodNotSupported,
            message: "The method you tried to use is not supported by the device".to_string(),
        };
        assert_eq!(err.category(), Some(ResultCategory::MethodNotSupported));
        assert_eq!(err.code(), Some(-4));
        assert!(err.to_string().starts_with("tdTurnOn failed"));

        let err = Error::invalid_argument("level", "must be between 0 and 255");
        assert_eq!(err.category(), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn prop_classify_is_total(code in any::<i32>()) {
            match ResultCode(code).classify() {
                Outcome::Success(value) => {
                    prop_assert!(code >= 0);
                    prop_assert_eq!(value, code);
                }
                Outcome::Failure(category) => {
                    prop_assert!(code < 0);
                    let documented = matches!(code, -7..=-1 | -99);
                    prop_assert_eq!(category == ResultCategory::Unknown, !documented || code == -99);
                }
            }
        }
    }
}
