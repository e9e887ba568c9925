//! Pre-submission checks on login input. Failures never reach the gateway.
use crate::error::SessionError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the password
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Result<Self, SessionError> {
        if email.is_empty() {
            return Err(SessionError::validation("Email is required."));
        }
        if !is_valid_email(email) {
            return Err(SessionError::validation("Email is not valid."));
        }
        if password.is_empty() {
            return Err(SessionError::validation("Password is required."));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(SessionError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters."
            )));
        }

        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}
