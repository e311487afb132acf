//! Mini App init-data authenticity check.
//!
//! Telegram signs the init-data payload with HMAC-SHA256; the key is
//! derived from the bot token as HMAC_SHA256("WebAppData", bot_token).
//! This check is the sole authorization gate for every write that
//! originates in the Mini App.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies that `init_data` was produced by Telegram's client for
/// this bot. Returns false on any parse error or hash mismatch —
/// never errors outward.
pub fn verify_init_data(init_data: &str, bot_token: &str) -> bool {
    let params = parse_query(init_data);

    let Some(received_hash) = params
        .iter()
        .find(|(k, _)| k == "hash")
        .map(|(_, v)| v.clone())
    else {
        return false;
    };

    // data_check_string: every pair except hash, sorted by key,
    // joined as key=value with newlines
    let mut check_pairs: Vec<String> = params
        .iter()
        .filter(|(k, _)| k != "hash")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    check_pairs.sort();
    let data_check_string = check_pairs.join("\n");

    let Ok(mut secret_key_mac) = HmacSha256::new_from_slice(b"WebAppData") else {
        return false;
    };
    secret_key_mac.update(bot_token.as_bytes());
    let secret_key = secret_key_mac.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(&secret_key) else {
        return false;
    };
    mac.update(data_check_string.as_bytes());
    let calculated_hash = hex::encode(mac.finalize().into_bytes());

    calculated_hash == received_hash
}

/// The signed `user` field of an init-data payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InitDataUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

/// Extracts the `user` JSON from init data. Attribution only — callers
/// must have passed [`verify_init_data`] first.
pub fn init_data_user(init_data: &str) -> Option<InitDataUser> {
    let params = parse_query(init_data);
    let user_json = params.iter().find(|(k, _)| k == "user").map(|(_, v)| v)?;
    serde_json::from_str(user_json).ok()
}

/// Flat query-string parse with URL decoding. Duplicate keys keep
/// their order; verification uses the decoded values, matching what
/// Telegram signed.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => {
                    let decoded = urlencoding::decode(value).ok()?;
                    Some((key.to_string(), decoded.to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:TEST-TOKEN";

    /// Builds an init-data string signed the way Telegram signs it.
    fn signed_init_data(pairs: &[(&str, &str)]) -> String {
        let mut check: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        check.sort();
        let data_check_string = check.join("\n");

        let mut secret = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        secret.update(TOKEN.as_bytes());
        let secret = secret.finalize().into_bytes();
        let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
        mac.update(data_check_string.as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        let mut encoded: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        encoded.push(format!("hash={}", hash));
        encoded.join("&")
    }

    #[test]
    fn valid_payload_verifies() {
        let data = signed_init_data(&[
            ("auth_date", "1700000000"),
            ("query_id", "AAH"),
            ("user", r#"{"id":123456789,"username":"seeker","first_name":"Test"}"#),
        ]);
        assert!(verify_init_data(&data, TOKEN));
    }

    #[test]
    fn mutated_payload_fails() {
        let data = signed_init_data(&[("auth_date", "1700000000"), ("query_id", "AAH")]);
        let tampered = data.replace("1700000000", "1700000001");
        assert!(!verify_init_data(&tampered, TOKEN));
    }

    #[test]
    fn mutated_hash_fails() {
        let data = signed_init_data(&[("auth_date", "1700000000")]);
        let (head, hash) = data.rsplit_once("hash=").unwrap();
        let flipped: String = hash
            .chars()
            .enumerate()
            .map(|(i, c)| if i == 0 { if c == 'a' { 'b' } else { 'a' } } else { c })
            .collect();
        assert!(!verify_init_data(&format!("{}hash={}", head, flipped), TOKEN));
    }

    #[test]
    fn wrong_token_fails() {
        let data = signed_init_data(&[("auth_date", "1700000000")]);
        assert!(!verify_init_data(&data, "999:OTHER-TOKEN"));
    }

    #[test]
    fn missing_hash_fails() {
        assert!(!verify_init_data("auth_date=1700000000&query_id=AAH", TOKEN));
        assert!(!verify_init_data("", TOKEN));
        assert!(!verify_init_data("garbage", TOKEN));
    }

    #[test]
    fn extracts_signed_user() {
        let data = signed_init_data(&[
            ("auth_date", "1700000000"),
            ("user", r#"{"id":123456789,"username":"seeker"}"#),
        ]);
        let user = init_data_user(&data).unwrap();
        assert_eq!(user.id, 123456789);
        assert_eq!(user.username.as_deref(), Some("seeker"));
    }
}
