//! Approval notifications.
//!
//! `Notifier` is the provider boundary: send one templated message.
//! `NotificationGateway` owns the pool to template mapping so callers can
//! resolve the template up front and refuse an approval before any I/O.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::NotificationError;
use crate::models::ProfileSnapshot;
use crate::pool::Pool;

pub const DEFAULT_EMAILJS_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        template_id: &str,
        variables: &ProfileSnapshot,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone)]
pub struct EmailJsSettings {
    pub api_url: String,
    pub service_id: String,
    pub user_id: String,
    pub access_token: Option<String>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a ProfileSnapshot,
}

/// EmailJS REST client.
pub struct EmailJsClient {
    http: reqwest::Client,
    settings: EmailJsSettings,
}

impl EmailJsClient {
    pub fn new(settings: EmailJsSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl Notifier for EmailJsClient {
    async fn send(
        &self,
        template_id: &str,
        variables: &ProfileSnapshot,
    ) -> Result<(), NotificationError> {
        let body = SendRequest {
            service_id: &self.settings.service_id,
            template_id,
            user_id: &self.settings.user_id,
            access_token: self.settings.access_token.as_deref(),
            template_params: variables,
        };

        debug!(template_id, recipient = %variables.email, "sending notification");
        let resp = self
            .http
            .post(&self.settings.api_url)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Pool to template id mapping. Blank ids count as missing.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<Pool, String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pool: Pool, template_id: impl Into<String>) -> Self {
        self.insert(pool, template_id);
        self
    }

    pub fn insert(&mut self, pool: Pool, template_id: impl Into<String>) {
        let template_id = template_id.into();
        if template_id.trim().is_empty() {
            self.templates.remove(&pool);
        } else {
            self.templates.insert(pool, template_id);
        }
    }

    pub fn get(&self, pool: Pool) -> Option<&str> {
        self.templates.get(&pool).map(String::as_str)
    }
}

/// Stand-in used when no provider credentials are configured.
struct NoProvider;

#[async_trait]
impl Notifier for NoProvider {
    async fn send(&self, _: &str, _: &ProfileSnapshot) -> Result<(), NotificationError> {
        Err(NotificationError::ProviderNotConfigured)
    }
}

#[derive(Clone)]
pub struct NotificationGateway {
    notifier: Arc<dyn Notifier>,
    templates: TemplateRegistry,
}

impl NotificationGateway {
    pub fn new(notifier: Arc<dyn Notifier>, templates: TemplateRegistry) -> Self {
        Self {
            notifier,
            templates,
        }
    }

    /// Gateway with no provider and no templates. Every pool resolves to
    /// `MissingTemplate`, so approvals stop before any I/O while actions
    /// that never notify keep working.
    pub fn unconfigured() -> Self {
        Self::new(Arc::new(NoProvider), TemplateRegistry::new())
    }

    /// Template for `pool`, or `MissingTemplate` without touching the provider.
    pub fn template_for(&self, pool: Pool) -> Result<&str, NotificationError> {
        self.templates
            .get(pool)
            .ok_or(NotificationError::MissingTemplate { pool })
    }

    pub async fn notify(
        &self,
        profile: &ProfileSnapshot,
        pool: Pool,
    ) -> Result<(), NotificationError> {
        let template_id = self.template_for(pool)?;
        self.notifier.send(template_id, profile).await?;
        info!(%pool, template_id, recipient = %profile.email, "notification sent");
        Ok(())
    }
}
