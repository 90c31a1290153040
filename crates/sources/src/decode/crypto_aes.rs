use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};

use super::base64;
use crate::extractor::error::ExtractorError;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const SALTED_MAGIC: &[u8] = b"Salted__";

/// Decrypt a CryptoJS `AES.encrypt(text, password)` payload.
///
/// The base64 input is `Salted__` + 8 byte salt + ciphertext; key and IV are
/// derived from the password with OpenSSL's EVP_BytesToKey over MD5.
pub fn decrypt_with_password(cipher_b64: &str, password: &str) -> Result<String, ExtractorError> {
    let data = base64::decode(cipher_b64)?;
    if data.len() < 16 || &data[..8] != SALTED_MAGIC {
        return Err(ExtractorError::CryptoError(
            "missing Salted__ header".to_string(),
        ));
    }
    let (salt, ciphertext) = data[8..].split_at(8);
    let (key, iv) = evp_bytes_to_key(password.as_bytes(), salt, 32, 16);
    let plain = decrypt_bytes(ciphertext, &key, &iv)?;
    into_string(plain)
}

/// Decrypt base64 ciphertext with an explicit key and IV.
pub fn decrypt_with_key(cipher_b64: &str, key: &[u8], iv: &[u8]) -> Result<String, ExtractorError> {
    let data = base64::decode(cipher_b64)?;
    into_string(decrypt_bytes(&data, key, iv)?)
}

/// AES-CBC with PKCS#7 padding; the variant follows the key length (16, 24 or 32 bytes).
pub fn decrypt_bytes(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, ExtractorError> {
    let mut buffer = data.to_vec();
    let len = match key.len() {
        16 => decrypt_in_place::<Aes128CbcDec>(key, iv, &mut buffer)?,
        24 => decrypt_in_place::<Aes192CbcDec>(key, iv, &mut buffer)?,
        32 => decrypt_in_place::<Aes256CbcDec>(key, iv, &mut buffer)?,
        n => {
            return Err(ExtractorError::CryptoError(format!(
                "unsupported key length: {n}"
            )));
        }
    };
    buffer.truncate(len);
    Ok(buffer)
}

fn decrypt_in_place<D>(key: &[u8], iv: &[u8], buffer: &mut [u8]) -> Result<usize, ExtractorError>
where
    D: KeyIvInit + BlockDecryptMut,
{
    let cipher = D::new_from_slices(key, iv).map_err(|e| {
        ExtractorError::CryptoError(format!("Failed to initialize AES decryptor: {e}"))
    })?;
    let decrypted = cipher
        .decrypt_padded_mut::<Pkcs7>(buffer)
        .map_err(|e| ExtractorError::CryptoError(format!("Decryption failed: {e}")))?;
    Ok(decrypted.len())
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
pub fn evp_bytes_to_key(
    password: &[u8],
    salt: &[u8],
    key_len: usize,
    iv_len: usize,
) -> (Vec<u8>, Vec<u8>) {
    let mut derived = Vec::with_capacity(key_len + iv_len);
    let mut block: Vec<u8> = Vec::new();

    while derived.len() < key_len + iv_len {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(password);
        hasher.update(salt);
        block = hasher.finalize().to_vec();
        derived.extend_from_slice(&block);
    }

    let iv = derived[key_len..key_len + iv_len].to_vec();
    derived.truncate(key_len);
    (derived, iv)
}

pub fn decode_hex(input: &str) -> Result<Vec<u8>, ExtractorError> {
    hex::decode(input.trim()).map_err(|e| ExtractorError::CryptoError(format!("invalid hex: {e}")))
}

fn into_string(bytes: Vec<u8>) -> Result<String, ExtractorError> {
    String::from_utf8(bytes)
        .map_err(|e| ExtractorError::CryptoError(format!("plaintext is not utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    #[test]
    fn test_cryptojs_salted_payload() {
        // openssl enc -aes-256-cbc -md md5 -S 0102030405060708 -pass pass:secret
        let payload = "U2FsdGVkX18BAgMEBQYHCCpjAvJfcDA6bLtEzzvCRRXZ8LSaAVaYCuCZKoF/X7Wp";
        assert_eq!(
            decrypt_with_password(payload, "secret").unwrap(),
            "https://cdn.example/master.m3u8"
        );
    }

    #[test]
    fn test_wrong_password_fails() {
        let payload = "U2FsdGVkX18BAgMEBQYHCCpjAvJfcDA6bLtEzzvCRRXZ8LSaAVaYCuCZKoF/X7Wp";
        assert!(decrypt_with_password(payload, "wrong").is_err());
    }

    #[test]
    fn test_missing_salt_header() {
        let err = decrypt_with_password("aGVsbG8gd29ybGQgaGVsbG8gd29ybGQ=", "x").unwrap_err();
        assert!(matches!(err, ExtractorError::CryptoError(_)));
    }

    #[test]
    fn test_raw_key_aes128() {
        let key = decode_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let iv = decode_hex("0f0e0d0c0b0a09080706050403020100").unwrap();
        assert_eq!(
            decrypt_with_key("k2grrgxcoJDEuwbCiW9fHQ==", &key, &iv).unwrap(),
            "hello aes-128"
        );
    }

    #[test]
    fn test_raw_key_aes256_ascii_key() {
        let key = b"7191d608bd4deb4dc36f656c4bbca1b7";
        let iv = [7u8; 16];
        let plaintext = br#"{"hls":"https://hls.example/master.m3u8"}"#;

        let mut buffer = vec![0u8; (plaintext.len() / 16 + 1) * 16];
        buffer[..plaintext.len()].copy_from_slice(plaintext);
        let encrypted = Aes256CbcEnc::new_from_slices(key, &iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
            .unwrap()
            .to_vec();

        let decrypted = decrypt_bytes(&encrypted, key, &iv).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_unsupported_key_length() {
        assert!(decrypt_bytes(&[0u8; 16], &[0u8; 10], &[0u8; 16]).is_err());
    }
}
