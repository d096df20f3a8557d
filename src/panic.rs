//! Formatting of panic payloads caught from pipeline tasks.
//!
//! Worker tasks and background decodes can panic inside collaborator code;
//! the payload is logged rather than propagated.

use std::{any::Any, fmt};

/// Displays a panic payload as its message when it is a string, or as
/// `Debug` output otherwise.
///
/// ```
/// use mediaframe::panic::format_panic;
///
/// assert_eq!(format_panic(Box::new("codec exploded")).to_string(), "codec exploded");
/// assert_eq!(format_panic(Box::new(String::from("tick"))).to_string(), "tick");
/// assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            self.0.downcast_ref::<String>(),
            self.0.downcast_ref::<&'static str>(),
        ) {
            (Some(message), _) => f.write_str(message),
            (None, Some(message)) => f.write_str(message),
            (None, None) => write!(f, "{:?}", self.0),
        }
    }
}

/// Wrap `panic` for display.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }
