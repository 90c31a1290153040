//! JavaScript evaluation for hosts that hide their keys behind obfuscated scripts.
//!
//! [`TokenEvaluator`] is the seam: [`find_password`] only needs something
//! that can run a script and hand back a string. With the `rquickjs` feature
//! the embedded QuickJS engine is available as [`QuickJsEvaluator`].
//!
//! ```ignore
//! use sources_parser::js_engine::JsEngineManager;
//!
//! let result = JsEngineManager::global().execute(|ctx| {
//!     ctx.load_script("function greet(name) { return 'Hello, ' + name; }")?;
//!     ctx.eval_string("greet('World')")
//! })?;
//! ```

use std::sync::Arc;

#[cfg(feature = "rquickjs")]
mod context;
mod error;
#[cfg(feature = "rquickjs")]
mod manager;
mod password;

#[cfg(feature = "rquickjs")]
pub use context::JsContext;
pub use error::JsError;
#[cfg(feature = "rquickjs")]
pub use manager::{JsEngineManager, QuickJsEvaluator};
pub use password::find_password;

/// Runs a script and returns the value of its last expression as a string.
pub trait TokenEvaluator: Send + Sync {
    fn evaluate(&self, script: &str) -> Result<String, JsError>;
}

/// The evaluator compiled into this build, if any.
pub fn default_evaluator() -> Option<Arc<dyn TokenEvaluator>> {
    #[cfg(feature = "rquickjs")]
    {
        Some(Arc::new(QuickJsEvaluator))
    }
    #[cfg(not(feature = "rquickjs"))]
    {
        None
    }
}
