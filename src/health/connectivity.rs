//! Startup connectivity smoke-test.
//!
//! # Responsibilities
//! - Derive probe targets from the config (database, file storage, SMTP)
//! - Probe each with a bounded timeout
//! - Report outcomes without ever failing startup
//!
//! # Design Decisions
//! - Probes only check reachability; no credentials are sent
//! - Targets are rendered as host:port or bare URLs so reports never
//!   carry secrets from connection strings

use std::fmt;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;
use url::Url;

use crate::config::{Config, FILE_DRIVER_S3, SQL_DRIVER_MYSQL, SQL_DRIVER_POSTGRES};

/// Upper bound for each individual probe.
pub const SMOKE_TEST_TIMEOUT: Duration = Duration::from_secs(5);

const POSTGRES_DEFAULT_PORT: u16 = 5432;
const MYSQL_DEFAULT_PORT: u16 = 3306;

/// Something worth probing at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// Plain TCP reachability of `host:port`.
    Tcp { name: &'static str, address: String },
    /// Any HTTP response from `url` counts as reachable.
    Http { name: &'static str, url: Url },
}

impl ProbeTarget {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeTarget::Tcp { name, .. } | ProbeTarget::Http { name, .. } => name,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeTarget::Tcp { address, .. } => write!(f, "{address}"),
            ProbeTarget::Http { url, .. } => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub target: ProbeTarget,
    pub outcome: ProbeOutcome,
    pub elapsed: Duration,
}

impl ProbeReport {
    pub fn is_ok(&self) -> bool {
        self.outcome == ProbeOutcome::Reachable
    }
}

/// Every external endpoint the config refers to.
pub fn probe_targets(config: &Config) -> Vec<ProbeTarget> {
    let mut targets = Vec::new();

    if let Some(address) = database_address(&config.sql.driver_name, &config.sql.data_source) {
        targets.push(ProbeTarget::Tcp {
            name: "database",
            address,
        });
    }

    let file = &config.file;
    if file.driver_name == FILE_DRIVER_S3 && !file.amazon_s3_endpoint.is_empty() {
        let raw = format!("https://{}.{}/", file.amazon_s3_bucket, file.amazon_s3_endpoint);
        match Url::parse(&raw) {
            Ok(url) => targets.push(ProbeTarget::Http {
                name: "file_storage",
                url,
            }),
            Err(e) => tracing::warn!(error = %e, "Unusable file storage endpoint"),
        }
    }

    let email = &config.email;
    if email.send_email_notifications && !email.smtp_server.is_empty() {
        targets.push(ProbeTarget::Tcp {
            name: "smtp",
            address: format!("{}:{}", email.smtp_server, email.smtp_port),
        });
    }

    targets
}

/// `host:port` of a database connection string, if one can be parsed.
pub fn database_address(driver: &str, data_source: &str) -> Option<String> {
    match driver {
        SQL_DRIVER_POSTGRES => {
            let url = Url::parse(data_source).ok()?;
            let host = url.host_str()?;
            let port = url.port().unwrap_or(POSTGRES_DEFAULT_PORT);
            Some(format!("{host}:{port}"))
        }
        SQL_DRIVER_MYSQL => {
            // user:pass@tcp(host:port)/db?params
            let start = data_source.find("tcp(")? + "tcp(".len();
            let end = start + data_source[start..].find(')')?;
            let address = &data_source[start..end];
            if address.is_empty() {
                None
            } else if address.contains(':') {
                Some(address.to_string())
            } else {
                Some(format!("{address}:{MYSQL_DEFAULT_PORT}"))
            }
        }
        _ => None,
    }
}

/// Probe every target derived from `config`, each bounded by `timeout`.
pub async fn smoke_test_with(config: &Config, timeout: Duration) -> Vec<ProbeReport> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default();

    let mut reports = Vec::new();
    for target in probe_targets(config) {
        let report = probe(&client, target, timeout).await;
        match &report.outcome {
            ProbeOutcome::Reachable => tracing::info!(
                probe = report.target.name(),
                target = %report.target,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Connectivity check passed"
            ),
            ProbeOutcome::Failed(reason) => tracing::warn!(
                probe = report.target.name(),
                target = %report.target,
                reason = %reason,
                "Connectivity check failed"
            ),
            ProbeOutcome::TimedOut => tracing::warn!(
                probe = report.target.name(),
                target = %report.target,
                timeout_secs = timeout.as_secs(),
                "Connectivity check timed out"
            ),
        }
        reports.push(report);
    }
    reports
}

/// Probe with the default [`SMOKE_TEST_TIMEOUT`].
pub async fn smoke_test(config: &Config) -> Vec<ProbeReport> {
    smoke_test_with(config, SMOKE_TEST_TIMEOUT).await
}

async fn probe(client: &reqwest::Client, target: ProbeTarget, timeout: Duration) -> ProbeReport {
    let started = time::Instant::now();

    let outcome = match &target {
        ProbeTarget::Tcp { address, .. } => {
            match time::timeout(timeout, TcpStream::connect(address.as_str())).await {
                Ok(Ok(_)) => ProbeOutcome::Reachable,
                Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
                Err(_) => ProbeOutcome::TimedOut,
            }
        }
        ProbeTarget::Http { url, .. } => {
            match time::timeout(timeout, client.head(url.clone()).send()).await {
                Ok(Ok(_)) => ProbeOutcome::Reachable,
                Ok(Err(e)) if e.is_timeout() => ProbeOutcome::TimedOut,
                Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
                Err(_) => ProbeOutcome::TimedOut,
            }
        }
    };

    ProbeReport {
        target,
        outcome,
        elapsed: started.elapsed(),
    }
}
