use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

pub fn encode(text: &str) -> String {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    if encoder.write_all(text.as_bytes()).is_err() {
        tracing::error!("share encode failed");
        return String::new();
    }
    let compressed = match encoder.finish() {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(%err, "share encode failed");
            return String::new();
        }
    };
    URL_SAFE_NO_PAD.encode(compressed)
}

/// `None` on malformed input. Accepts a leading `#` so a raw URL hash can
/// be passed straight through.
pub fn decode(fragment: &str) -> Option<String> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment).trim();
    if fragment.is_empty() {
        return None;
    }

    let compressed = match URL_SAFE_NO_PAD.decode(fragment) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(%err, "share fragment is not valid base64");
            return None;
        }
    };

    let mut text = String::new();
    match DeflateDecoder::new(compressed.as_slice()).read_to_string(&mut text) {
        Ok(_) => Some(text),
        Err(err) => {
            tracing::debug!(%err, "share fragment failed to inflate");
            None
        }
    }
}
