//! Email delivery
//!
//! One message per attendee with the rendered document attached. A send
//! failure never aborts the job: it falls back to a single notice to the
//! fixed operator address and the pipeline carries on to archival.

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::EmailConfig;
use crate::meeting::MeetingMeta;

/// Outgoing mail transport.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_document(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment_name: &str,
        attachment: &[u8],
    ) -> Result<()>;
}

/// Send the rendered document to every attendee. On any send failure, send
/// one operator notice describing the failure instead of re-raising.
pub async fn deliver_summary(
    mailer: &dyn Mailer,
    operator_address: &str,
    meta: &MeetingMeta,
    document: &str,
) {
    let subject = format!("{} - {}", meta.meeting_name, meta.date);
    let body = format!(
        "Here is the summary of your meeting \"{}\" from {}.",
        meta.meeting_name, meta.date
    );
    let attachment_name = format!("{}_{}.md", meta.meeting_name.replace(' ', "_"), meta.date);

    let mut failed = false;

    for attendee in &meta.attendees {
        match mailer
            .send_document(
                &attendee.email,
                &subject,
                &body,
                &attachment_name,
                document.as_bytes(),
            )
            .await
        {
            Ok(()) => info!("Delivered summary to {}", attendee.email),
            Err(e) => {
                error!("Failed to deliver summary to {}: {:#}", attendee.email, e);
                failed = true;
            }
        }
    }

    if failed {
        let notice = format!(
            "Delivery failed for meeting \"{}\" ({}) on {}.",
            meta.meeting_name, meta.meeting_type, meta.date
        );
        if let Err(e) = mailer
            .send_document(
                operator_address,
                "FAILED MEETING DELIVERY",
                &notice,
                &attachment_name,
                document.as_bytes(),
            )
            .await
        {
            error!("Failed to send operator fallback notice: {:#}", e);
        }
    }
}

/// Mailgun-style messages API client.
pub struct MailgunMailer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    domain: String,
    from: String,
}

impl MailgunMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            domain: config.domain.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for MailgunMailer {
    async fn send_document(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment_name: &str,
        attachment: &[u8],
    ) -> Result<()> {
        let url = format!("{}/{}/messages", self.api_base, self.domain);

        let part = reqwest::multipart::Part::bytes(attachment.to_vec())
            .file_name(attachment_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("from", self.from.clone())
            .text("to", to.to_string())
            .text("subject", subject.to_string())
            .text("text", body.to_string())
            .part("attachment", part);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .multipart(form)
            .send()
            .await
            .context("Failed to send email request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Email send to {} failed with status {}: {}", to, status, body);
        }

        info!("Email sent to {} ({})", to, subject);

        Ok(())
    }
}
