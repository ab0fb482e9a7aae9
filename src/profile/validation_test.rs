use time::macros::date;

use super::*;
use crate::profile::types::Gender;

const TODAY: Date = date!(2026 - 10 - 18);

fn basic() -> BasicInfo {
    BasicInfo {
        nickname: "Mochi".into(),
        avatar: "avatar-3".into(),
        gender: Gender::Female,
        birthday: Some(date!(1995 - 04 - 12)),
        bio: String::new(),
    }
}

fn address() -> AddressInfo {
    AddressInfo {
        province: "110000".into(),
        city: "110100".into(),
        district: "110105".into(),
        detailed_address: "8 Garden Road".into(),
    }
}

fn fields(errors: &[FieldError]) -> Vec<&'static str> {
    errors.iter().map(|e| e.field).collect()
}

#[test]
fn valid_basic_passes() {
    assert!(validate_basic(&basic(), TODAY).is_empty());
}

#[test]
fn nickname_bounds() {
    let mut info = basic();
    info.nickname = String::new();
    assert_eq!(validate_basic(&info, TODAY)[0].message, "Nickname is required");

    info.nickname = "x".repeat(NICKNAME_MAX);
    assert!(validate_basic(&info, TODAY).is_empty());

    info.nickname = "猫".repeat(NICKNAME_MAX + 1);
    assert_eq!(fields(&validate_basic(&info, TODAY)), vec!["nickname"]);
}

#[test]
fn birthday_must_be_set_and_in_the_past() {
    let mut info = basic();
    info.birthday = None;
    assert_eq!(fields(&validate_basic(&info, TODAY)), vec!["birthday"]);

    info.birthday = Some(TODAY);
    assert_eq!(validate_basic(&info, TODAY)[0].message, "Birthday must be before today");

    info.birthday = TODAY.previous_day();
    assert!(validate_basic(&info, TODAY).is_empty());
}

#[test]
fn avatar_and_bio() {
    let mut info = basic();
    info.avatar = String::new();
    info.bio = "b".repeat(BIO_MAX + 1);
    assert_eq!(fields(&validate_basic(&info, TODAY)), vec!["avatar", "bio"]);

    info.avatar = "avatar-99".into();
    assert_eq!(fields(&validate_basic(&info, TODAY))[0], "avatar");
}

#[test]
fn address_rules() {
    assert!(validate_address(&address()).is_empty());

    let mut info = address();
    info.province = String::new();
    info.city = String::new();
    info.district = String::new();
    info.detailed_address = "tiny".into();
    assert_eq!(fields(&validate_address(&info)), vec!["province", "city", "district", "detailed_address"]);

    info = address();
    info.detailed_address = "a".repeat(ADDRESS_MAX + 1);
    assert_eq!(validate_address(&info)[0].message, "Detailed address must be at most 100 characters");
}

#[test]
fn password_change_rules() {
    let ok = PasswordChange {
        old_password: "old-secret".into(),
        new_password: "Str0ngPass".into(),
        confirm_password: "Str0ngPass".into(),
    };
    assert!(validate_password_change(&ok).is_empty());

    let weak = PasswordChange {
        old_password: String::new(),
        new_password: "short".into(),
        confirm_password: "other".into(),
    };
    let messages: Vec<_> = validate_password_change(&weak).iter().map(|e| e.message).collect();
    assert_eq!(
        messages,
        vec![
            "Please enter your current password",
            "New password must be at least 8 characters",
            "New password must contain an uppercase letter",
            "New password must contain a digit",
            "Passwords do not match",
        ]
    );
}

#[test]
fn email_change_rules() {
    let ok = EmailChange { password: "pw".into(), new_email: "new@example.com".into() };
    assert!(validate_email_change(&ok).is_empty());

    let bad = EmailChange { password: String::new(), new_email: "nope".into() };
    assert_eq!(fields(&validate_email_change(&bad)), vec!["password", "new_email"]);
}
