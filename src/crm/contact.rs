//! Contact-form notification: the email sent for each quote request.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::models::Lead;
use crate::config::MailConfig;

/// A rendered notification, ready for a `Mailer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

impl ContactEmail {
    pub fn for_lead(lead: &Lead, mail: &MailConfig) -> Self {
        let mut body = String::new();
        body.push_str("Datos del Cliente\n");
        push_field(&mut body, "Nombre y apellido", &lead.name);
        push_field(&mut body, "Empresa o marca", &lead.company);
        push_field(&mut body, "Email", &lead.email);
        push_field(&mut body, "Teléfono", &lead.phone);
        body.push_str("\nDetalles del Proyecto\n");
        push_field(&mut body, "Tipo de producto", lead.product.label());
        push_field(
            &mut body,
            "¿Tiene marca registrada o proyecto en marcha?",
            lead.brand.label(),
        );
        push_field(&mut body, "Volumen estimado mensual", lead.volume.label());
        push_field(&mut body, "Tipo de envasado", lead.packaging.label());
        if let Some(message) = &lead.message {
            body.push_str(&format!("\nMensaje:\n{}\n", message));
        }
        if let Some(investment) = &lead.estimated_investment {
            push_field(&mut body, "\nInversión estimada", investment);
        }
        body.push_str(&format!(
            "\nRecibido: {}\n",
            lead.created_at.format("%d/%m/%Y %H:%M UTC")
        ));

        Self {
            from: mail.from.clone(),
            to: mail.to.clone(),
            reply_to: lead.email.clone(),
            subject: format!("Nueva consulta de cotización - {}", lead.company),
            body,
        }
    }
}

fn push_field(body: &mut String, label: &str, value: &str) {
    body.push_str(&format!("{}: {}\n", label, value));
}

/// Outbound delivery of contact notifications.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &ContactEmail) -> anyhow::Result<()>;
}

/// Records notifications in the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &ContactEmail) -> anyhow::Result<()> {
        tracing::info!(
            to = %email.to,
            from = %email.from,
            subject = %email.subject,
            "contact notification"
        );
        tracing::debug!(body = %email.body, "contact notification body");
        Ok(())
    }
}

/// Delivers notifications through the Resend HTTP API (`POST {api_url}/emails`).
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ResendAccepted {
    #[serde(default)]
    id: Option<String>,
}

impl ResendMailer {
    pub fn new(api_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// `None` when no usable API key is configured.
    pub fn from_config(mail: &MailConfig) -> Option<Self> {
        mail.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| Self::new(&mail.api_url, key))
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &ContactEmail) -> anyhow::Result<()> {
        let payload = ResendEmail {
            from: &email.from,
            to: [email.to.as_str()],
            reply_to: &email.reply_to,
            subject: &email.subject,
            text: &email.body,
        };
        let resp = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Resend")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Resend returned {}: {}", status, body);
        }

        let accepted = resp
            .json::<ResendAccepted>()
            .await
            .context("Invalid Resend response")?;
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            email_id = accepted.id.as_deref().unwrap_or("-"),
            "contact notification sent"
        );
        Ok(())
    }
}

/// Resend when an API key is configured, otherwise the log.
pub fn mailer_for(mail: &MailConfig) -> Arc<dyn Mailer> {
    match ResendMailer::from_config(mail) {
        Some(mailer) => {
            tracing::info!(api_url = %mail.api_url, "contact notifications delivered through Resend");
            Arc::new(mailer)
        }
        None => {
            tracing::warn!("RESEND_API_KEY not set; contact notifications are only logged");
            Arc::new(LogMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::models::*;

    fn lead() -> Lead {
        Lead::from_new(
            "lead-1".into(),
            NewLead {
                name: "Juan Pérez".into(),
                company: "Distribuidora Norte".into(),
                email: "juan@distribuidoranorte.com".into(),
                phone: "+54 9 11 1234-5678".into(),
                product: ProductType::Alfajores,
                brand: BrandOwnership::Yes,
                volume: VolumeBucket::From1000To5000,
                packaging: PackagingType::Bulk,
                message: Some("Necesitamos muestras".into()),
                estimated_investment: Some("$5.300.000".into()),
            },
            now_micros(),
        )
    }

    fn mail() -> MailConfig {
        MailConfig {
            to: "ventas@example.com".into(),
            from: "noreply@example.com".into(),
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_subject_and_addresses() {
        let email = ContactEmail::for_lead(&lead(), &mail());
        assert_eq!(
            email.subject,
            "Nueva consulta de cotización - Distribuidora Norte"
        );
        assert_eq!(email.to, "ventas@example.com");
        assert_eq!(email.from, "noreply@example.com");
        assert_eq!(email.reply_to, "juan@distribuidoranorte.com");
    }

    #[test]
    fn test_body_uses_human_labels() {
        let body = ContactEmail::for_lead(&lead(), &mail()).body;
        assert!(body.contains("Tipo de producto: Alfajores"));
        assert!(body.contains("marca registrada o proyecto en marcha?: Sí"));
        assert!(body.contains("Volumen estimado mensual: 1.000 - 5.000 unidades"));
        assert!(body.contains("Tipo de envasado: A granel"));
        assert!(body.contains("Necesitamos muestras"));
        assert!(body.contains("Inversión estimada: $5.300.000"));
    }

    #[test]
    fn test_body_omits_absent_optional_fields() {
        let mut lead = lead();
        lead.message = None;
        lead.estimated_investment = None;
        let body = ContactEmail::for_lead(&lead, &mail()).body;
        assert!(!body.contains("Mensaje"));
        assert!(!body.contains("Inversión"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts() {
        let email = ContactEmail::for_lead(&lead(), &mail());
        LogMailer.send(&email).await.unwrap();
    }

    #[test]
    fn test_resend_requires_api_key() {
        let mut mail = mail();
        assert!(ResendMailer::from_config(&mail).is_none());

        mail.api_key = Some("   ".into());
        assert!(ResendMailer::from_config(&mail).is_none());

        mail.api_key = Some("re_123".into());
        mail.api_url = "http://127.0.0.1:9/".into();
        let mailer = ResendMailer::from_config(&mail).unwrap();
        assert_eq!(mailer.api_url, "http://127.0.0.1:9");
        assert_eq!(mailer.api_key, "re_123");
    }

    #[tokio::test]
    async fn test_resend_unreachable_is_error() {
        let mailer = ResendMailer::new("http://127.0.0.1:9", "re_123");
        let email = ContactEmail::for_lead(&lead(), &mail());
        assert!(mailer.send(&email).await.is_err());
    }
}
