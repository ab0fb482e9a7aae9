use super::*;

#[test]
fn email_required() {
    assert_eq!(validate_email(""), Some(MSG_EMAIL_REQUIRED));
    assert_eq!(validate_email("   "), Some(MSG_EMAIL_REQUIRED));
}

#[test]
fn email_format() {
    for bad in ["plain", "no-at.example.com", "a@b", "a b@c.com", "a@b c.com", "@b.com"] {
        assert_eq!(validate_email(bad), Some(MSG_EMAIL_INVALID), "{bad}");
    }
    for good in ["a@b.co", "first.last+tag@example.org", "user@sub.domain.io"] {
        assert_eq!(validate_email(good), None, "{good}");
    }
}

#[test]
fn password_strength() {
    assert_eq!(validate_password_strength(""), Some(MSG_PASSWORD_REQUIRED));
    assert_eq!(validate_password_strength("        "), Some(MSG_PASSWORD_REQUIRED));
    assert_eq!(validate_password_strength("1234567"), Some(MSG_PASSWORD_TOO_SHORT));
    assert_eq!(validate_password_strength("12345678"), None);
}

#[test]
fn password_length_counts_characters() {
    assert_eq!(validate_password_strength("密码密码密码密"), Some(MSG_PASSWORD_TOO_SHORT));
    assert_eq!(validate_password_strength("密码密码密码密码"), None);
}

#[test]
fn password_match() {
    assert_eq!(validate_password_match("password1", ""), Some(MSG_CONFIRM_REQUIRED));
    assert_eq!(validate_password_match("password1", "password2"), Some(MSG_PASSWORD_MISMATCH));
    assert_eq!(validate_password_match("password1", "password1"), None);
}
