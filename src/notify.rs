//! Outbound email sent to the operations inbox when a lead arrives.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::{sync::Arc, time::Duration};

use crate::config::MailConfig;
use crate::db::models::Lead;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client for notifications");
            reqwest::Client::new()
        })
});

/// Fields of a freshly stored lead that go into the notification.
#[derive(Debug, Clone)]
pub struct LeadNotification {
    pub name: String,
    pub email: String,
    pub business_needs: String,
    pub message: Option<String>,
}

impl From<&Lead> for LeadNotification {
    fn from(lead: &Lead) -> Self {
        Self {
            name: lead.name.clone(),
            email: lead.email.clone(),
            business_needs: lead.business_needs.clone(),
            message: lead.message.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait LeadNotifier: Send + Sync {
    async fn notify_new_lead(&self, lead: &LeadNotification) -> Result<(), NotifyError>;
}

/// Picks the Resend sender when both the API key and sender address are configured.
pub fn from_config(config: &MailConfig) -> Arc<dyn LeadNotifier> {
    match (&config.resend_api_key, &config.from_email) {
        (Some(api_key), Some(from)) => {
            tracing::info!(to = %config.notification_email, "Lead notifications enabled via Resend");
            Arc::new(ResendNotifier {
                api_key: api_key.clone(),
                from: from.clone(),
                to: config.notification_email.clone(),
            })
        }
        _ => {
            tracing::info!("RESEND_API_KEY/RESEND_FROM_EMAIL not set. Lead notifications disabled.");
            Arc::new(DisabledNotifier)
        }
    }
}

/// Used when mail is not configured: logs and reports success.
pub struct DisabledNotifier;

#[async_trait]
impl LeadNotifier for DisabledNotifier {
    async fn notify_new_lead(&self, lead: &LeadNotification) -> Result<(), NotifyError> {
        tracing::debug!(email = %lead.email, "skipping lead notification, mail not configured");
        Ok(())
    }
}

pub struct ResendNotifier {
    api_key: String,
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: String,
    html: String,
}

#[async_trait]
impl LeadNotifier for ResendNotifier {
    async fn notify_new_lead(&self, lead: &LeadNotification) -> Result<(), NotifyError> {
        let email = ResendEmail {
            from: &self.from,
            to: [&self.to],
            reply_to: &lead.email,
            subject: subject_line(lead),
            html: render_html(lead),
        };

        let response = HTTP_CLIENT
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %self.to, "lead notification sent");
        Ok(())
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn subject_line(lead: &LeadNotification) -> String {
    // Header injection guard
    let name: String = lead.name.chars().filter(|c| !c.is_control()).collect();
    format!("New inquiry from {}", name)
}

fn render_html(lead: &LeadNotification) -> String {
    let message = lead
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(|m| escape_html(m).replace('\n', "<br>"))
        .unwrap_or_else(|| "<em>No message provided</em>".to_string());

    format!(
        "<h2>New contact form submission</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Business needs:</strong> {}</p>\n\
         <p><strong>Message:</strong><br>{}</p>\n",
        escape_html(&lead.name),
        escape_html(&lead.email),
        escape_html(&lead.business_needs),
        message,
    )
}
