//! Submitted form data and its validation rules.
//!
//! Raw inputs deserialize straight from urlencoded bodies and are turned into
//! clean values by `clean()`. Failures are collected per field in
//! [`FormErrors`] so pages can re-render with inline messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

/// Validation messages keyed by field name. `__all__` holds form-wide errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Post form as submitted. An empty `group` means "no group".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFormInput {
    pub text: String,
    pub group: Option<String>,
}

/// Raw `key=value` pairs, as a browser submits them. A repeated key keeps
/// its last value; unknown keys are ignored.
impl FromIterator<(String, String)> for PostFormInput {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut input = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "text" => input.text = value,
                "group" => input.group = Some(value),
                _ => {}
            }
        }
        input
    }
}

/// Post form after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group: Option<i64>,
}

impl PostFormInput {
    /// Field-level checks. Whether the chosen group exists is decided by the caller.
    pub fn clean(&self) -> Result<PostForm, FormErrors> {
        let mut errors = FormErrors::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        errors.into_result(PostForm {
            text: text.to_string(),
            group,
        })
    }
}

/// Registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl SignupForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_CHARS {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX_CHARS} characters."),
            );
        } else if !is_valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        } else if self.password.chars().count() < PASSWORD_MIN_CHARS {
            errors.add(
                "password",
                format!("This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."),
            );
        }

        errors.into_result(())
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
