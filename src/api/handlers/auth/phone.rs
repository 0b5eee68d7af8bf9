//! Phone number normalization for lookup and challenge keys.

use regex::Regex;

/// Normalize a phone number toward E.164: strip common separators and make
/// sure there is a leading `+`. Input that still fails the shape check is
/// kept as-is (best effort) rather than rejected, to tolerate varied clients.
pub(crate) fn normalize_phone(phone: &str) -> String {
    let cleaned: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("+{cleaned}")
    }
}

/// E.164 shape check on already-normalized input.
pub(crate) fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+[1-9][0-9]{7,14}$").is_ok_and(|re| re.is_match(phone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize_phone("+1 (555) 000-1234"), "+15550001234");
        assert_eq!(normalize_phone("555.000.1234"), "+5550001234");
    }

    #[test]
    fn normalize_adds_plus_prefix() {
        assert_eq!(normalize_phone("15550001234"), "+15550001234");
    }

    #[test]
    fn normalize_keeps_existing_plus() {
        assert_eq!(normalize_phone(" +447911123456 "), "+447911123456");
    }

    #[test]
    fn normalize_is_best_effort_on_garbage() {
        // Junk input is not rejected here; the shape check reports it instead.
        assert_eq!(normalize_phone("call-me"), "+callme");
    }

    #[test]
    fn valid_phone_accepts_e164() {
        assert!(valid_phone("+15550001234"));
        assert!(valid_phone("+447911123456"));
    }

    #[test]
    fn valid_phone_rejects_bad_shapes() {
        assert!(!valid_phone("15550001234"));
        assert!(!valid_phone("+0123456789"));
        assert!(!valid_phone("+123"));
        assert!(!valid_phone("+callme"));
    }
}
