use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

/// Forwards server errors to an external error-tracking endpoint.
///
/// Reports are posted on a spawned task; a failed delivery is only logged.
#[derive(Clone)]
pub struct ErrorReporter {
    client: reqwest::Client,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub service: &'static str,
    pub version: &'static str,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub message: String,
    pub timestamp: String,
}

impl ErrorReporter {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    pub fn report(&self, method: &str, path: &str, status: u16, message: String) {
        let Some(url) = self.url.clone() else {
            return;
        };
        let report = ErrorReport {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            method: method.to_string(),
            path: path.to_string(),
            status,
            message,
            timestamp: Utc::now().to_rfc3339(),
        };
        let client = self.client.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&report).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Reported error for {} {}", report.method, report.path);
                }
                Ok(response) => warn!("Error tracker answered {}", response.status()),
                Err(e) => warn!("Failed to deliver error report: {}", e),
            }
        });
    }
}
