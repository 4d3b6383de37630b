//! Request/response types for the auth endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Missing fields default to empty so the service reports them as validation
// errors instead of the extractor rejecting the body.

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(value_type = String)]
    pub password: SecretString,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct ResetPasswordRequest {
    #[serde(default, rename = "newPassword")]
    #[schema(value_type = String)]
    pub new_password: SecretString,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(value_type = String)]
    pub password: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::ExposeSecret;

    #[test]
    fn reset_password_request_uses_camel_case_field() -> Result<()> {
        let request: ResetPasswordRequest =
            serde_json::from_value(serde_json::json!({ "newPassword": "pw2" }))?;
        assert_eq!(request.new_password.expose_secret(), "pw2");
        Ok(())
    }

    #[test]
    fn missing_fields_default_to_empty() -> Result<()> {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({}))?;
        assert!(request.email.is_empty());
        assert!(request.password.expose_secret().is_empty());
        Ok(())
    }

    #[test]
    fn debug_does_not_print_password() -> Result<()> {
        let request: LoginRequest = serde_json::from_value(
            serde_json::json!({ "email": "a@x.com", "password": "hunter2" }),
        )?;
        let rendered = format!("{request:?}");
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("hunter2"));
        Ok(())
    }
}
