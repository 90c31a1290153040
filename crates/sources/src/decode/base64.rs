use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;

use crate::extractor::error::ExtractorError;

/// Decode base64 from attributes and inline scripts.
///
/// Whitespace and padding are ignored and the url-safe alphabet is accepted,
/// since sites mix all three.
pub fn decode(input: &str) -> Result<Vec<u8>, ExtractorError> {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    Ok(STANDARD_NO_PAD.decode(normalized.as_bytes())?)
}

pub fn decode_to_string(input: &str) -> Result<String, ExtractorError> {
    let bytes = decode(input)?;
    String::from_utf8(bytes).map_err(|e| ExtractorError::Other(format!("invalid utf-8: {e}")))
}

pub fn encode(input: impl AsRef<[u8]>) -> String {
    base64::engine::general_purpose::STANDARD.encode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_lenient() {
        // "https://ok.ru/videoembed/1"
        let padded = "aHR0cHM6Ly9vay5ydS92aWRlb2VtYmVkLzE=";
        assert_eq!(decode_to_string(padded).unwrap(), "https://ok.ru/videoembed/1");
        assert_eq!(
            decode_to_string(padded.trim_end_matches('=')).unwrap(),
            "https://ok.ru/videoembed/1"
        );
        assert_eq!(decode_to_string("PD8-").unwrap(), "<?>");
        assert_eq!(decode_to_string(" aGk=\n").unwrap(), "hi");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("%%%").is_err());
    }
}
