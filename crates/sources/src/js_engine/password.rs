use super::TokenEvaluator;
use super::error::JsError;
use crate::extractor::utils::{
    substring_after, substring_after_last, substring_before, substring_before_last,
};

/// Recover the AES password an obfuscated player script hands to `CryptoJS`.
///
/// The variable passed as the last `CryptoJS[...](...)` argument is either a
/// `const` literal, returned as is, or a call into the script's string
/// decoder, which is rebuilt and run through `evaluator`. Scripts without the
/// `const` fall back to the literal right before the `jwplayer(` setup.
pub fn find_password(js: &str, evaluator: &dyn TokenEvaluator) -> Result<String, JsError> {
    let pass_var = substring_after_last(
        substring_before(substring_after(js, "CryptoJS["), ");"),
        ",",
    );

    let pass_value = js
        .find(&format!("const {pass_var}="))
        .map(|i| {
            let rest = &js[i + "const =".len() + pass_var.len()..];
            rest.find(';').map(|end| &rest[..end]).unwrap_or("")
        })
        .unwrap_or("");

    if !pass_value.is_empty() {
        if pass_value.starts_with('\'') {
            return Ok(pass_value.trim_matches('\'').to_string());
        }
        let args = format!("({}", substring_after(pass_value, "("));
        return password_from_js(js, &args, evaluator);
    }

    let js_end = substring_before_last(substring_before(js, "jwplayer("), "var");
    let suspicious = substring_after_last(substring_before_last(js_end, "'"), "'");
    if suspicious.chars().count() < 8 {
        // a decoder call such as (0x420,'NZsZ')
        let args = substring_before(substring_after_last(js_end, "(0x"), ")");
        return password_from_js(js, &format!("(0x{args})"), evaluator);
    }
    Ok(suspicious.to_string())
}

fn password_from_js(
    js: &str,
    key_args: &str,
    evaluator: &dyn TokenEvaluator,
) -> Result<String, JsError> {
    let mut script = format!("{})", substring_before(js, ",(!function"));

    let decoder_name = substring_after_last(substring_before(&script, ";(func"), "=").to_string();
    let decoder_prefix = format!("function {decoder_name}");
    let decoder_body = format!("{decoder_prefix}{}", substring_after(js, &decoder_prefix));
    let decoder_suffix = format!(",{decoder_name}(");
    let decoder_call = format!(
        "{decoder_suffix}{});}}",
        substring_before(substring_after(&decoder_body, &decoder_suffix), ");}")
    );
    let decoder_body = format!(
        "{}{decoder_call}",
        substring_before(&decoder_body, &decoder_call)
    );

    // without the string table up front it lives in its own function
    let head = script.get(..20).unwrap_or(&script);
    if !head.contains("=[") {
        let table_name = substring_before(substring_after(&decoder_body, "="), ";");
        let table_prefix = format!("function {table_name}");
        let table_suffix = format!("return {table_name};}}");
        let table_body = format!(
            "{table_prefix}{}{table_suffix}",
            substring_before(substring_after(js, &table_prefix), &table_suffix)
        );
        script.push('\n');
        script.push_str(&table_body);
        script.push('\n');
    }

    script.push('\n');
    script.push_str(&decoder_body);
    script.push('\n');
    script.push_str(&decoder_name);
    script.push_str(key_args);

    evaluator.evaluate(&script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEvaluator {
        scripts: Mutex<Vec<String>>,
    }

    impl TokenEvaluator for RecordingEvaluator {
        fn evaluate(&self, script: &str) -> Result<String, JsError> {
            self.scripts.lock().push(script.to_string());
            Ok("decoded-password".to_string())
        }
    }

    #[test]
    fn test_const_literal_is_returned_directly() {
        let js = "var a=1;const k='s3cr3tPassw0rd';CryptoJS['AES']['decrypt'](data,k);";
        let evaluator = RecordingEvaluator::default();
        assert_eq!(find_password(js, &evaluator).unwrap(), "s3cr3tPassw0rd");
        assert!(evaluator.scripts.lock().is_empty());
    }

    #[test]
    fn test_const_call_is_evaluated() {
        let js = "var _0xt=['a','b'];var _0xd=function(n,s){return _0xt[n];};(function(){})(),(!function(){const k=_0xd(0x1f0,'abc');CryptoJS['AES']['decrypt'](data,k);}());";
        let evaluator = RecordingEvaluator::default();
        assert_eq!(find_password(js, &evaluator).unwrap(), "decoded-password");

        let scripts = evaluator.scripts.lock();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].ends_with("(0x1f0,'abc')"));
        assert!(scripts[0].starts_with("var _0xt=['a','b'];"));
    }

    #[test]
    fn test_long_literal_before_player_setup() {
        let js = "CryptoJS['AES']['decrypt'](data,p);var p='longEnoughKey';var x=1;jwplayer('v').setup({});";
        let evaluator = RecordingEvaluator::default();
        assert_eq!(find_password(js, &evaluator).unwrap(), "longEnoughKey");
        assert!(evaluator.scripts.lock().is_empty());
    }

    #[test]
    fn test_short_literal_falls_back_to_decoder_call() {
        let js = "CryptoJS['AES']['decrypt'](data,p);var p=_0xd(0x420,'NZsZ');var x=1;jwplayer('v').setup({});";
        let evaluator = RecordingEvaluator::default();
        find_password(js, &evaluator).unwrap();
        assert!(evaluator.scripts.lock()[0].ends_with("(0x420,'NZsZ')"));
    }
}
