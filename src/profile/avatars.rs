//! Preset avatar catalog.

use serde::Serialize;

pub const DEFAULT_AVATAR: &str = "avatar-1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarCategory {
    Cat,
    Dog,
    Other,
}

impl std::str::FromStr for AvatarCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cat" => Ok(Self::Cat),
            "dog" => Ok(Self::Dog),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown avatar category '{other}' (expected cat, dog or other)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AvatarOption {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub category: AvatarCategory,
}

const fn avatar(id: &'static str, name: &'static str, url: &'static str, category: AvatarCategory) -> AvatarOption {
    AvatarOption { id, name, url, category }
}

pub static AVATARS: [AvatarOption; 15] = [
    avatar("avatar-1", "Orange cat", "/avatars/cat-orange.svg", AvatarCategory::Cat),
    avatar("avatar-2", "Black cat", "/avatars/cat-black.svg", AvatarCategory::Cat),
    avatar("avatar-3", "White cat", "/avatars/cat-white.svg", AvatarCategory::Cat),
    avatar("avatar-4", "Calico cat", "/avatars/cat-calico.svg", AvatarCategory::Cat),
    avatar("avatar-5", "Grey cat", "/avatars/cat-grey.svg", AvatarCategory::Cat),
    avatar("avatar-6", "Golden retriever", "/avatars/dog-golden.svg", AvatarCategory::Dog),
    avatar("avatar-7", "Corgi", "/avatars/dog-corgi.svg", AvatarCategory::Dog),
    avatar("avatar-8", "Husky", "/avatars/dog-husky.svg", AvatarCategory::Dog),
    avatar("avatar-9", "Poodle", "/avatars/dog-poodle.svg", AvatarCategory::Dog),
    avatar("avatar-10", "Shiba", "/avatars/dog-shiba.svg", AvatarCategory::Dog),
    avatar("avatar-11", "Rabbit", "/avatars/rabbit.svg", AvatarCategory::Other),
    avatar("avatar-12", "Hamster", "/avatars/hamster.svg", AvatarCategory::Other),
    avatar("avatar-13", "Bird", "/avatars/bird.svg", AvatarCategory::Other),
    avatar("avatar-14", "Fish", "/avatars/fish.svg", AvatarCategory::Other),
    avatar("avatar-15", "Turtle", "/avatars/turtle.svg", AvatarCategory::Other),
];

#[must_use]
pub fn find_avatar(id: &str) -> Option<&'static AvatarOption> {
    AVATARS.iter().find(|avatar| avatar.id == id)
}

pub fn by_category(category: AvatarCategory) -> impl Iterator<Item = &'static AvatarOption> {
    AVATARS.iter().filter(move |avatar| avatar.category == category)
}

#[cfg(test)]
#[path = "avatars_test.rs"]
mod tests;
