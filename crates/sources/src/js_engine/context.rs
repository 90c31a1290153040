use rquickjs::CatchResultExt;

use super::error::JsError;

/// Minimal globals obfuscated player scripts poke at before doing any work.
const GLOBALS_SETUP: &str = r#"
    var window = globalThis;
    var document = { cookie: '' };
    var navigator = { userAgent: 'Mozilla/5.0' };
"#;

/// A QuickJS context bound to the thread-local runtime.
pub struct JsContext {
    ctx: rquickjs::Context,
}

impl JsContext {
    pub fn new(runtime: &rquickjs::Runtime) -> Result<Self, JsError> {
        let ctx = rquickjs::Context::full(runtime)
            .map_err(|e| JsError::ContextCreation(e.to_string()))?;
        Ok(Self { ctx })
    }

    pub fn setup_globals(&self) -> Result<(), JsError> {
        self.load_script(GLOBALS_SETUP)
    }

    pub fn load_script(&self, script: &str) -> Result<(), JsError> {
        self.ctx.with(|ctx| {
            let result: Result<(), _> = ctx.eval(script);
            result.catch(&ctx).map_err(Self::convert_caught_error)
        })
    }

    /// Evaluate `code`; its completion value must be a string.
    pub fn eval_string(&self, code: &str) -> Result<String, JsError> {
        self.ctx.with(|ctx| {
            let result: Result<String, _> = ctx.eval(code);
            result.catch(&ctx).map_err(Self::convert_caught_error)
        })
    }

    fn convert_caught_error(caught: rquickjs::CaughtError<'_>) -> JsError {
        use rquickjs::CaughtError;
        match caught {
            CaughtError::Exception(exc) => {
                let msg = exc.message().unwrap_or_default();
                match exc.stack() {
                    Some(stack) if !stack.is_empty() => JsError::eval_with_stack(msg, stack),
                    _ => JsError::eval(msg),
                }
            }
            CaughtError::Value(val) => JsError::eval(format!(
                "JS threw value: {:?}",
                val.as_string().and_then(|s| s.to_string().ok())
            )),
            CaughtError::Error(err) => JsError::eval(err.to_string()),
        }
    }
}
