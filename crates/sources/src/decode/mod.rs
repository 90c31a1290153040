//! Payload decoders shared by the host extractors.

pub mod base64;
pub mod crypto_aes;
pub mod unpacker;
pub mod voe;
