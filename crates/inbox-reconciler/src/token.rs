//! `cycleToken`: an opaque per-cycle correlation id.

use chrono::Utc;
use md5::{Digest, Md5};
use rand::distributions::Alphanumeric;
use rand::Rng;

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 alphabet is ASCII")
}

fn rand8() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

fn uid_fingerprint(uid: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(uid.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..8].to_string()
}

/// `base36(now_ms)_rand8_md5(uid)[0..8]`. Treated as opaque by downstream
/// consumers — only its uniqueness per cycle matters.
pub fn cycle_token(uid: &str) -> String {
    let now_ms = Utc::now().timestamp_millis().max(0) as u64;
    format!("{}_{}_{}", base36(now_ms), rand8(), uid_fingerprint(uid))
}
