//! # Log sink trait.
//!
//! Provides [`LogSink`], the extension point that receives one formatted line per
//! dispatched record plus operational notices (open failure, read failure, overload).
//!
//! ## Rules
//! - `emit()` is synchronous and must not block for long: it is called from the
//!   consumer loop and, for overload notices, from producer call sites.
//! - Sinks handle their own I/O errors; a failing sink never stops the loop.
//! - Lines are passed without a trailing newline.
//!
//! ## Example
//! ```rust
//! use std::sync::Mutex;
//! use eventd::LogSink;
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<String>>);
//!
//! impl LogSink for Collect {
//!     fn emit(&self, line: &str) {
//!         self.0.lock().unwrap().push(line.to_string());
//!     }
//!     fn name(&self) -> &'static str { "collect" }
//! }
//! ```

/// Destination for consumer output lines.
pub trait LogSink: Send + Sync + 'static {
    /// Writes one line.
    fn emit(&self, line: &str);

    /// Returns the sink name used in diagnostics.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
