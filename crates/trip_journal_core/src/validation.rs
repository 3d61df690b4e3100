//! crates/trip_journal_core/src/validation.rs
//!
//! Validation for the companion create/edit form and the profile form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::NewTripPerson;

pub const NAME_MAX_LENGTH: usize = 255;
pub const LIKES_MAX_LENGTH: usize = 30;
pub const DISLIKES_MAX_LENGTH: usize = 30;
pub const ADDRESS_MAX_LENGTH: usize = 100;
pub const MEMO_MAX_LENGTH: usize = 100;
pub const PROFILE_NAME_MAX_LENGTH: usize = 20;

pub const PROFILE_NAME_REQUIRED: &str = "名前を入力してください";
pub const PROFILE_UPDATED: &str = "プロフィールを更新しました";

/// Field name -> user-facing message. Empty when the form is valid.
pub type FieldErrors = BTreeMap<String, String>;

/// Raw form input, every field as the browser sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPersonForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relationship_id: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub dislikes: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub memo: String,
}

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

impl TripPersonForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors.insert("name".into(), "名前は必須です".into());
        } else if too_long(&self.name, NAME_MAX_LENGTH) {
            errors.insert(
                "name".into(),
                format!("名前は{NAME_MAX_LENGTH}文字以下で入力してください"),
            );
        }

        if self.relationship_id.trim().parse::<i64>().is_err() {
            errors.insert("relationship_id".into(), "関係性を選択してください".into());
        }

        let limits = [
            ("likes", &self.likes, LIKES_MAX_LENGTH, "好きなもの"),
            ("dislikes", &self.dislikes, DISLIKES_MAX_LENGTH, "苦手なもの"),
            ("address", &self.address, ADDRESS_MAX_LENGTH, "住所"),
            ("memo", &self.memo, MEMO_MAX_LENGTH, "メモ"),
        ];
        for (field, value, max, label) in limits {
            if too_long(value, max) {
                errors.insert(
                    field.into(),
                    format!("{label}は{max}文字以下で入力してください"),
                );
            }
        }

        errors
    }

    /// Validates and converts into the backend payload. Blank optional fields
    /// are left out.
    pub fn into_new_trip_person(self) -> Result<NewTripPerson, FieldErrors> {
        let errors = self.validate();
        let relationship_id = match self.relationship_id.trim().parse::<i64>() {
            Ok(id) if errors.is_empty() => id,
            _ => return Err(errors),
        };

        let optional = |value: String| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        Ok(NewTripPerson {
            name: self.name.trim().to_string(),
            relationship_id,
            birthday: optional(self.birthday),
            likes: optional(self.likes),
            dislikes: optional(self.dislikes),
            address: optional(self.address),
            memo: optional(self.memo),
        })
    }
}

//=========================================================================================
// Profile
//=========================================================================================

/// The profile edit form. The name is the only editable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
}

impl ProfileForm {
    /// Returns the trimmed name to store.
    pub fn into_name(self) -> Result<String, FieldErrors> {
        let name = self.name.trim();
        let message = if name.is_empty() {
            PROFILE_NAME_REQUIRED.to_string()
        } else if too_long(name, PROFILE_NAME_MAX_LENGTH) {
            format!("名前は{PROFILE_NAME_MAX_LENGTH}文字以下で入力してください")
        } else {
            return Ok(name.to_string());
        };
        Err(FieldErrors::from([("name".to_string(), message)]))
    }
}
