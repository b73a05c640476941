//! Time-based one-time-passcode derivation (RFC 6238).
//!
//! The dashboard's second factor is a standard 30-second, 6-digit TOTP
//! computed from a base32 seed served on the challenge page. Derivation is a
//! pure function of (seed, time) so tests can pin the clock.

use crate::error::{PaybatchError, Result};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;

/// Derives the passcode for the current time. Call immediately before
/// submitting it; the code is only valid within its 30-second window.
pub fn derive_totp_now(seed_base32: &str) -> Result<String> {
    derive_totp(seed_base32, SystemTime::now())
}

/// Derives the passcode valid at `at`.
pub fn derive_totp(seed_base32: &str, at: SystemTime) -> Result<String> {
    let seed = decode_base32(seed_base32).ok_or(PaybatchError::OtpSeedInvalid)?;
    if seed.is_empty() {
        return Err(PaybatchError::OtpSeedInvalid);
    }
    let elapsed = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    let counter = elapsed.as_secs() / STEP_SECONDS;
    Ok(hotp(&seed, counter))
}

fn hotp(seed: &[u8], counter: u64) -> String {
    // Key length is unrestricted for HMAC.
    let mut mac =
        <Hmac<Sha1> as Mac>::new_from_slice(seed).expect("HMAC accepts any key length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 §5.3.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] & 0x7f) as u32) << 24
        | (digest[offset + 1] as u32) << 16
        | (digest[offset + 2] as u32) << 8
        | digest[offset + 3] as u32;

    format!("{:0width$}", binary % 10u32.pow(DIGITS), width = DIGITS as usize)
}

/// RFC 4648 base32 decoding, case-insensitive, padding and spaces ignored.
fn decode_base32(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits = 0u32;
    for c in input.chars() {
        if c == '=' || c == ' ' {
            continue;
        }
        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u64 - 'A' as u64,
            c @ '2'..='7' => c as u64 - '2' as u64 + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    Some(out)
}
