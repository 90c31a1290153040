//! Unpacker for Dean Edwards style `eval(function(p,a,c,k,e,d){...})` scripts.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PACKED_ARGS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\}\s*\('(.*?)',\s*(\d+),\s*(\d+),\s*'(.*?)'\.split\('\|'\)").unwrap()
});

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

const ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn is_packed(script: &str) -> bool {
    script.contains("eval(function(p,a,c,k,e,")
}

/// Unpack every packed block of `script` and join them with newlines.
///
/// Returns `None` when the script holds no packed block.
pub fn unpack_all(script: &str) -> Option<String> {
    let blocks: Vec<String> = PACKED_ARGS_REGEX
        .captures_iter(script)
        .filter_map(|caps| unpack_captures(&caps))
        .collect();
    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n"))
    }
}

/// Unpack the first packed block of `script`.
pub fn unpack(script: &str) -> Option<String> {
    PACKED_ARGS_REGEX
        .captures(script)
        .and_then(|caps| unpack_captures(&caps))
}

/// Unpack when packed, otherwise hand the script back as is.
pub fn unpack_or_keep(script: &str) -> String {
    if is_packed(script) {
        unpack_all(script).unwrap_or_else(|| script.to_string())
    } else {
        script.to_string()
    }
}

fn unpack_captures(caps: &Captures<'_>) -> Option<String> {
    let payload = caps.get(1)?.as_str().replace("\\'", "'");
    let radix: u32 = caps.get(2)?.as_str().parse().ok()?;
    let count: usize = caps.get(3)?.as_str().parse().ok()?;
    let words: Vec<&str> = caps.get(4)?.as_str().split('|').collect();

    if !(2..=62).contains(&radix) {
        return None;
    }

    let unpacked = WORD_REGEX.replace_all(&payload, |word: &Captures<'_>| {
        let token = &word[0];
        match parse_radix(token, radix) {
            Some(index) if index < count => match words.get(index) {
                Some(replacement) if !replacement.is_empty() => (*replacement).to_string(),
                _ => token.to_string(),
            },
            _ => token.to_string(),
        }
    });

    Some(unpacked.into_owned())
}

fn parse_radix(token: &str, radix: u32) -> Option<usize> {
    let mut value: usize = 0;
    for c in token.chars() {
        let digit = ALPHABET.find(c)? as u32;
        if digit >= radix {
            return None;
        }
        value = value.checked_mul(radix as usize)?.checked_add(digit as usize)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKED: &str = "<script>eval(function(p,a,c,k,e,d){e=function(c){return c};if(!''.replace(/^/,String)){while(c--){d[c]=k[c]||c}k=[function(e){return d[e]}];e=function(){return'\\\\w+'};c=1};while(c--){if(k[c]){p=p.replace(new RegExp('\\\\b'+e(c)+'\\\\b','g'),k[c])}}return p}('0 1',10,2,'hello|world'.split('|'),0,{}))</script>";

    #[test]
    fn test_unpack_simple() {
        assert!(is_packed(PACKED));
        assert_eq!(unpack(PACKED).as_deref(), Some("hello world"));
    }

    #[test]
    fn test_unpack_base36_and_empty_words() {
        // "a" is index 10 in base 36; an empty word keeps the token
        let script = "}('2.a({3:\"b\"})',36,12,'|||file|||||||setup|'.split('|'),0,{}))";
        assert_eq!(
            unpack(script).as_deref(),
            Some("2.setup({file:\"b\"})")
        );
    }

    #[test]
    fn test_unpack_all_blocks() {
        let script = format!("{PACKED}\n<script>eval(function(p,a,c,k,e,d){{}}('0(\\'1\\')',10,2,'alert|hi'.split('|'),0,{{}}))</script>");
        assert_eq!(unpack_all(&script).as_deref(), Some("hello world\nalert('hi')"));
    }

    #[test]
    fn test_plain_script_is_kept() {
        assert_eq!(unpack_or_keep("var a = 1;"), "var a = 1;");
        assert!(unpack_all("var a = 1;").is_none());
    }
}
