//! Stack-trace parsing.
//!
//! Converts raw traceback text (as printed by the Python interpreter, possibly
//! colored or chained) into a structured [`StackTrace`].
//!
//! # Example
//!
//! ```
//! use tracemend::trace;
//!
//! let trace = trace::parse(
//!     "Traceback (most recent call last):\n  File \"main.py\", line 3, in <module>\n    1 / 0\nZeroDivisionError: division by zero\n",
//! );
//! assert_eq!(trace.exception_type, "ZeroDivisionError");
//! assert_eq!(trace.frames.len(), 1);
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse, strip_ansi, UNKNOWN_EXCEPTION_MESSAGE, UNKNOWN_EXCEPTION_TYPE};
pub use types::{StackFrame, StackTrace};
