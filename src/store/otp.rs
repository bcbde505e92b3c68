use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

#[derive(Debug, Clone)]
struct CodeRecord {
    code: String,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

/// Short-lived one-time numeric codes keyed by an identity string (a phone
/// number for login, a booking id for pickup). Issuing replaces any prior
/// code for the same subject; a successful verification consumes the record
/// so replays fail.
#[derive(Default)]
pub struct OneTimeCodeStore {
    codes: DashMap<String, CodeRecord>,
}

impl OneTimeCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> String {
        let code = generate_code();
        self.codes.insert(
            subject.to_string(),
            CodeRecord {
                code: code.clone(),
                expires_at: Utc::now() + ttl,
                consumed: false,
            },
        );
        code
    }

    /// Succeeds at most once per issued code. Expired, consumed, or
    /// mismatched codes fail without side effects.
    pub fn verify(&self, subject: &str, code: &str) -> bool {
        let Some(mut record) = self.codes.get_mut(subject) else {
            return false;
        };
        if record.consumed || Utc::now() > record.expires_at || record.code != code {
            return false;
        }
        record.consumed = true;
        true
    }
}

/// Uniform 4-digit code in [1000, 9999].
fn generate_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

#[cfg(test)]
mod tests {
    use super::{generate_code, OneTimeCodeStore};
    use chrono::Duration;

    #[test]
    fn codes_are_four_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            let value: u32 = code.parse().unwrap();
            assert!((1000..=9999).contains(&value));
        }
    }

    #[test]
    fn verify_succeeds_once_then_fails_on_replay() {
        let store = OneTimeCodeStore::new();
        let code = store.issue("9876543210", Duration::minutes(5));

        assert!(store.verify("9876543210", &code));
        assert!(!store.verify("9876543210", &code));
    }

    #[test]
    fn wrong_code_fails_without_consuming() {
        let store = OneTimeCodeStore::new();
        let code = store.issue("9876543210", Duration::minutes(5));

        assert!(!store.verify("9876543210", "0000"));
        assert!(store.verify("9876543210", &code));
    }

    #[test]
    fn unknown_subject_fails() {
        let store = OneTimeCodeStore::new();
        assert!(!store.verify("nobody", "1234"));
    }

    #[test]
    fn expired_code_fails() {
        let store = OneTimeCodeStore::new();
        let code = store.issue("9876543210", Duration::seconds(-1));
        assert!(!store.verify("9876543210", &code));
    }

    #[test]
    fn reissue_replaces_previous_code() {
        let store = OneTimeCodeStore::new();
        let first = store.issue("9876543210", Duration::minutes(5));
        let second = store.issue("9876543210", Duration::minutes(5));

        if first != second {
            assert!(!store.verify("9876543210", &first));
        }
        assert!(store.verify("9876543210", &second));
    }
}
