//! Credentials loaded from environment variables.

use super::AwsCredentials;
use crate::error::{CredentialsError, S3Error};
use std::env;

/// Access key ID variable.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Secret access key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Reads credentials from the process environment.
///
/// Variable names default to the standard AWS ones and can be overridden.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    access_key_var: Option<String>,
    secret_key_var: Option<String>,
    session_token_var: Option<String>,
}

impl EnvCredentials {
    /// Loader using the standard variable names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader using custom variable names.
    pub fn with_vars(
        access_key_var: impl Into<String>,
        secret_key_var: impl Into<String>,
        session_token_var: Option<String>,
    ) -> Self {
        Self {
            access_key_var: Some(access_key_var.into()),
            secret_key_var: Some(secret_key_var.into()),
            session_token_var,
        }
    }

    fn access_key_var(&self) -> &str {
        self.access_key_var.as_deref().unwrap_or(AWS_ACCESS_KEY_ID)
    }

    fn secret_key_var(&self) -> &str {
        self.secret_key_var.as_deref().unwrap_or(AWS_SECRET_ACCESS_KEY)
    }

    fn session_token_var(&self) -> &str {
        self.session_token_var.as_deref().unwrap_or(AWS_SESSION_TOKEN)
    }

    /// Load credentials with [`std::env::var`].
    pub fn load(&self) -> Result<AwsCredentials, S3Error> {
        self.load_with(|name| env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup.
    pub fn load_with<F>(&self, lookup: F) -> Result<AwsCredentials, S3Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let not_found = || {
            S3Error::Credentials(CredentialsError::NotFound {
                source_name: "environment".to_string(),
            })
        };

        let access_key_id = lookup(self.access_key_var()).ok_or_else(not_found)?;
        if access_key_id.is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", self.access_key_var()),
            }));
        }

        let secret_access_key = lookup(self.secret_key_var()).ok_or_else(not_found)?;
        if secret_access_key.is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", self.secret_key_var()),
            }));
        }

        match lookup(self.session_token_var()).filter(|t| !t.is_empty()) {
            Some(token) => Ok(AwsCredentials::with_session_token(
                access_key_id,
                secret_access_key,
                token,
            )),
            None => Ok(AwsCredentials::new(access_key_id, secret_access_key)),
        }
    }
}
