//! Client-visible projection of the configuration.
//!
//! # Responsibilities
//! - Expose an explicit allow-list of settings to untrusted clients
//! - Render booleans as `"true"` / `"false"` strings on the wire
//! - Resolve display names of registered identity providers
//!
//! # Design Decisions
//! - Statically typed: a new `Config` field never reaches clients unless it
//!   is added here by hand
//! - Pure and infallible given a validated `Config`
//! - `EnableSignUpWithOAuth` follows whether any provider settings exist,
//!   not how many display names resolved

use serde::{Serialize, Serializer};

use crate::config::schema::Config;
use crate::oauth::ProviderRegistry;

/// Build metadata stamped into the binary at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub number: &'static str,
    pub date: &'static str,
    pub hash: &'static str,
    pub enterprise_ready: &'static str,
}

impl BuildInfo {
    /// Values from `BUILD_*` environment variables at compile time.
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            number: match option_env!("BUILD_NUMBER") {
                Some(v) => v,
                None => "dev",
            },
            date: match option_env!("BUILD_DATE") {
                Some(v) => v,
                None => "dev",
            },
            hash: match option_env!("BUILD_HASH") {
                Some(v) => v,
                None => "dev",
            },
            enterprise_ready: match option_env!("BUILD_ENTERPRISE_READY") {
                Some(v) => v,
                None => "false",
            },
        }
    }
}

/// Settings safe to hand to any client that asks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientConfig {
    pub version: String,
    pub build_number: String,
    pub build_date: String,
    pub build_hash: String,
    pub build_enterprise_ready: String,

    pub site_name: String,
    #[serde(serialize_with = "bool_string")]
    pub enable_team_creation: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_user_creation: bool,
    #[serde(serialize_with = "bool_string")]
    pub restrict_team_names: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_team_listing: bool,

    #[serde(rename = "EnableOAuthServiceProvider", serialize_with = "bool_string")]
    pub enable_oauth_service_provider: bool,

    /// Browser-side analytics key; public by nature.
    pub segment_developer_key: String,
    /// Browser-side API key; public by nature.
    pub google_developer_key: String,
    #[serde(serialize_with = "bool_string")]
    pub enable_incoming_webhooks: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_outgoing_webhooks: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_post_username_override: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_post_icon_override: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_developer: bool,

    #[serde(serialize_with = "bool_string")]
    pub send_email_notifications: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_sign_up_with_email: bool,
    #[serde(serialize_with = "bool_string")]
    pub require_email_verification: bool,
    pub feedback_email: String,

    #[serde(rename = "EnableSignUpWithGitLab", serialize_with = "bool_string")]
    pub enable_sign_up_with_gitlab: bool,
    #[serde(serialize_with = "bool_string")]
    pub enable_sign_up_with_google: bool,

    #[serde(rename = "EnableSignUpWithOAuth", serialize_with = "bool_string")]
    pub enable_sign_up_with_oauth: bool,
    /// Present only when `enable_sign_up_with_oauth` is set.
    #[serde(
        rename = "OAuthProviderDisplayNames",
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_provider_display_names: Option<Vec<String>>,

    #[serde(serialize_with = "bool_string")]
    pub show_email_address: bool,

    pub terms_of_service_link: String,
    pub privacy_policy_link: String,
    pub about_link: String,
    pub help_link: String,
    pub report_a_problem_link: String,
    pub support_email: String,

    #[serde(serialize_with = "bool_string")]
    pub enable_public_link: bool,
    #[serde(serialize_with = "display_string")]
    pub profile_height: u32,
    #[serde(serialize_with = "display_string")]
    pub profile_width: u32,

    #[serde(serialize_with = "bool_string")]
    pub enable_ldap: bool,
}

impl ClientConfig {
    /// Project `config`, resolving provider display names through `registry`.
    pub fn build(config: &Config, registry: &ProviderRegistry) -> Self {
        Self::build_with(config, registry, BuildInfo::current())
    }

    pub fn build_with(config: &Config, registry: &ProviderRegistry, build: BuildInfo) -> Self {
        let team = &config.team;
        let service = &config.service;
        let email = &config.email;
        let support = &config.support;

        let enable_sign_up_with_oauth = config.oauth_settings.is_some();
        let oauth_provider_display_names = config
            .oauth_settings
            .as_ref()
            .map(|settings| provider_display_names(settings.keys(), registry));

        Self {
            version: build.version.to_string(),
            build_number: build.number.to_string(),
            build_date: build.date.to_string(),
            build_hash: build.hash.to_string(),
            build_enterprise_ready: build.enterprise_ready.to_string(),

            site_name: team.site_name.clone(),
            enable_team_creation: team.enable_team_creation,
            enable_user_creation: team.enable_user_creation,
            restrict_team_names: team.restrict_team_names.unwrap_or(true),
            enable_team_listing: team.enable_team_listing.unwrap_or(false),

            enable_oauth_service_provider: service.enable_oauth_service_provider,
            segment_developer_key: service.segment_developer_key.clone(),
            google_developer_key: service.google_developer_key.clone(),
            enable_incoming_webhooks: service.enable_incoming_webhooks,
            enable_outgoing_webhooks: service.enable_outgoing_webhooks,
            enable_post_username_override: service.enable_post_username_override,
            enable_post_icon_override: service.enable_post_icon_override,
            enable_developer: service.enable_developer.unwrap_or(false),

            send_email_notifications: email.send_email_notifications,
            enable_sign_up_with_email: email.enable_sign_up_with_email,
            require_email_verification: email.require_email_verification,
            feedback_email: email.feedback_email.clone(),

            enable_sign_up_with_gitlab: config.gitlab.enable,
            enable_sign_up_with_google: config.google.enable,

            enable_sign_up_with_oauth,
            oauth_provider_display_names,

            show_email_address: config.privacy.show_email_address,

            terms_of_service_link: text(&support.terms_of_service_link),
            privacy_policy_link: text(&support.privacy_policy_link),
            about_link: text(&support.about_link),
            help_link: text(&support.help_link),
            report_a_problem_link: text(&support.report_a_problem_link),
            support_email: text(&support.support_email),

            enable_public_link: config.file.enable_public_link,
            profile_height: config.file.profile_height,
            profile_width: config.file.profile_width,

            enable_ldap: config.ldap.enable.unwrap_or(false),
        }
    }

    /// Serialize as a JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Display names of `names` in registry registration order, skipping names
/// that never made it into the registry.
fn provider_display_names<'a>(
    names: impl Iterator<Item = &'a String>,
    registry: &ProviderRegistry,
) -> Vec<String> {
    let configured: Vec<&String> = names.collect();
    registry
        .providers()
        .into_iter()
        .filter(|(name, _)| configured.contains(&name))
        .map(|(_, provider)| provider.display_name().to_string())
        .collect()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn bool_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

fn display_string<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
