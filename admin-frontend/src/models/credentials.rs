use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Login form payload. The password never shows up in `Debug` output.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_credentials"))]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    pub password: Secret<String>,
}

fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.password.expose_secret().trim().is_empty() {
        return Err(ValidationError::new("password_required"));
    }
    Ok(())
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Secret::new(password.into()),
        }
    }

    /// JSON body sent to the login endpoint.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "email": self.email,
            "password": self.password.expose_secret(),
        })
    }
}
