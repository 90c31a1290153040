use std::cell::RefCell;

use super::TokenEvaluator;
use super::context::JsContext;
use super::error::JsError;

// QuickJS runtimes are !Send, so each thread keeps its own.
thread_local! {
    static THREAD_RUNTIME: RefCell<Option<rquickjs::Runtime>> = const { RefCell::new(None) };
}

/// Hands out contexts backed by a cached per-thread runtime.
pub struct JsEngineManager;

impl JsEngineManager {
    pub fn global() -> Self {
        Self
    }

    fn with_runtime<F, T>(f: F) -> Result<T, JsError>
    where
        F: FnOnce(&rquickjs::Runtime) -> Result<T, JsError>,
    {
        THREAD_RUNTIME.with(|cell| {
            let mut runtime_ref = cell.borrow_mut();
            if runtime_ref.is_none() {
                let runtime = rquickjs::Runtime::new()
                    .map_err(|e| JsError::RuntimeCreation(e.to_string()))?;
                *runtime_ref = Some(runtime);
            }
            match runtime_ref.as_ref() {
                Some(runtime) => f(runtime),
                None => Err(JsError::RuntimeCreation("runtime missing".to_string())),
            }
        })
    }

    /// Run `f` with a fresh context; globals from previous calls do not leak in.
    pub fn execute<F, T>(&self, f: F) -> Result<T, JsError>
    where
        F: FnOnce(&JsContext) -> Result<T, JsError>,
    {
        Self::with_runtime(|runtime| {
            let ctx = JsContext::new(runtime)?;
            f(&ctx)
        })
    }

    /// Drop the runtime cached on the current thread.
    pub fn clear_cache() {
        THREAD_RUNTIME.with(|cell| {
            cell.borrow_mut().take();
        });
    }
}

/// [`TokenEvaluator`] over QuickJS.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickJsEvaluator;

impl TokenEvaluator for QuickJsEvaluator {
    fn evaluate(&self, script: &str) -> Result<String, JsError> {
        JsEngineManager::global().execute(|ctx| {
            ctx.setup_globals()?;
            ctx.eval_string(script)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_returns_string() {
        let result = JsEngineManager::global().execute(|ctx| ctx.eval_string("'a' + 'b'"));
        assert_eq!(result.unwrap(), "ab");
    }

    #[test]
    fn test_runtime_survives_cache_clear() {
        let manager = JsEngineManager::global();
        assert!(manager.execute(|ctx| ctx.eval_string("'1'")).is_ok());
        JsEngineManager::clear_cache();
        assert!(manager.execute(|ctx| ctx.eval_string("'2'")).is_ok());
    }

    #[test]
    fn test_evaluator_runs_decoder_call() {
        let script = "function dec(n, s) { return s.split('').reverse().join('') + n; }\ndec(1, 'olleh')";
        assert_eq!(QuickJsEvaluator.evaluate(script).unwrap(), "hello1");
    }

    #[test]
    fn test_exception_is_reported() {
        let err = QuickJsEvaluator.evaluate("throw new Error('boom')").unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
