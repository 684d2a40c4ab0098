//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check required combinations (driver-specific settings, enabled LDAP)
//! - Validate value ranges (counts > 0, salts long enough)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs after defaults are applied and before config is accepted into the
//!   system
//! - Every error names the dotted path of the offending field

use thiserror::Error;

use crate::config::schema::{
    Config, FILE_DRIVER_LOCAL, FILE_DRIVER_S3, SQL_DRIVER_MYSQL, SQL_DRIVER_POSTGRES,
};

/// Minimum length of salts and encryption keys.
pub const MIN_SECRET_LEN: usize = 32;

/// A single semantic constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be set")]
    Missing { field: &'static str },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} has unsupported value {value:?} (expected one of: {expected})")]
    Unsupported {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ValidationError {
    /// Dotted path of the offending field, e.g. `sql.data_source`.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing { field }
            | ValidationError::NotPositive { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::Unsupported { field, .. } => field,
        }
    }
}

/// Check every cross-field and range constraint of a defaulted config.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let service = &config.service;
    require(&mut errors, "service.listen_address", &service.listen_address);
    positive(&mut errors, "service.maximum_login_attempts", service.maximum_login_attempts);

    positive(&mut errors, "team.max_users_per_team", config.team.max_users_per_team);

    let sql = &config.sql;
    if sql.driver_name != SQL_DRIVER_MYSQL && sql.driver_name != SQL_DRIVER_POSTGRES {
        errors.push(ValidationError::Unsupported {
            field: "sql.driver_name",
            value: sql.driver_name.clone(),
            expected: "mysql, postgres",
        });
    }
    require(&mut errors, "sql.data_source", &sql.data_source);
    positive(&mut errors, "sql.max_idle_conns", sql.max_idle_conns);
    positive(&mut errors, "sql.max_open_conns", sql.max_open_conns);
    min_len(&mut errors, "sql.at_rest_encrypt_key", &sql.at_rest_encrypt_key);

    let file = &config.file;
    match file.driver_name.as_str() {
        "" | FILE_DRIVER_LOCAL => {}
        FILE_DRIVER_S3 => require(&mut errors, "file.amazon_s3_bucket", &file.amazon_s3_bucket),
        other => errors.push(ValidationError::Unsupported {
            field: "file.driver_name",
            value: other.to_string(),
            expected: "local, amazons3",
        }),
    }
    positive(&mut errors, "file.thumbnail_width", file.thumbnail_width);
    positive(&mut errors, "file.thumbnail_height", file.thumbnail_height);
    positive(&mut errors, "file.preview_width", file.preview_width);
    positive(&mut errors, "file.profile_width", file.profile_width);
    positive(&mut errors, "file.profile_height", file.profile_height);
    min_len(&mut errors, "file.public_link_salt", &file.public_link_salt);

    let email = &config.email;
    min_len(&mut errors, "email.invite_salt", &email.invite_salt);
    min_len(&mut errors, "email.password_reset_salt", &email.password_reset_salt);
    if email.send_email_notifications {
        require(&mut errors, "email.smtp_server", &email.smtp_server);
    }

    positive(&mut errors, "rate_limit.memory_store_size", config.rate_limit.memory_store_size);

    let ldap = &config.ldap;
    if ldap.enable.unwrap_or(false) {
        let required = [
            ("ldap.ldap_server", &ldap.ldap_server),
            ("ldap.base_dn", &ldap.base_dn),
            ("ldap.email_attribute", &ldap.email_attribute),
            ("ldap.username_attribute", &ldap.username_attribute),
            ("ldap.id_attribute", &ldap.id_attribute),
        ];
        for (field, value) in required {
            require(&mut errors, field, value.as_deref().unwrap_or(""));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn require(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Missing { field });
    }
}

fn positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u32) {
    if value == 0 {
        errors.push(ValidationError::NotPositive { field });
    }
}

fn min_len(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.chars().count() < MIN_SECRET_LEN {
        errors.push(ValidationError::TooShort {
            field,
            min: MIN_SECRET_LEN,
        });
    }
}
