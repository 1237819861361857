//! Values exchanged with callers: the user snapshot and the token pair.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record owned by the user store. Embedded verbatim in ID tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub website: String,
}

impl User {
    pub fn new(uid: Uuid, email: impl Into<String>) -> Self {
        Self {
            uid,
            email: email.into(),
            name: String::new(),
            image_url: String::new(),
            website: String::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    #[must_use]
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdToken {
    #[serde(rename = "idToken")]
    pub signed: String,
}

/// Signed refresh token plus the fields callers need without re-parsing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshToken {
    #[serde(rename = "refreshToken")]
    pub signed: String,
    #[serde(skip_serializing, default)]
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub uid: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    #[serde(flatten)]
    pub id_token: IdToken,
    #[serde(flatten)]
    pub refresh_token: RefreshToken,
}
