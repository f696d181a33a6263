use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::info;

use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};
use crate::notifications::Notifier;
use crate::reconciliation::models::{Discrepancy, Report};

/// E-mail delivery through the Resend HTTP API
pub struct EmailNotifier {
    api_key: Option<String>,
    api_url: String,
    from_email: String,
    recipients: Vec<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

impl EmailNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            api_key: config.resend_api_key.clone(),
            api_url: config.resend_api_url.trim_end_matches('/').to_string(),
            from_email: config.from_email.clone(),
            recipients: config.recipients.clone(),
            client: reqwest::Client::new(),
        }
    }

    async fn send_email(&self, subject: String, html: String) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Notification("e-mail service not configured".to_string()))?;

        let request = SendEmailRequest {
            from: &self.from_email,
            to: &self.recipients,
            subject,
            html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Notification(format!(
                "Resend API error {}: {}",
                status, error_text
            )));
        }

        let result: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;
        Ok(result.id)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn is_configured(&self) -> bool {
        self.api_key.is_some() && !self.recipients.is_empty()
    }

    async fn notify(&self, report: &Report, top: &[Discrepancy]) -> AppResult<()> {
        let subject = format!(
            "Inventory Comparison Report - {} ({} discrepancies)",
            report.date, report.total_discrepancies
        );
        let id = self.send_email(subject, render_report_html(report, top)).await?;
        info!("📧 Report e-mail sent to {} recipients ({})", self.recipients.len(), id);
        Ok(())
    }
}

pub fn render_report_html(report: &Report, top: &[Discrepancy]) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<h2>Inventory Comparison Report</h2>\
         <p><strong>Date:</strong> {}</p>\
         <p><strong>Total Discrepancies:</strong> {}</p>",
        report.date, report.total_discrepancies
    );

    if top.is_empty() {
        html.push_str("<p style=\"color: green;\"><strong>No discrepancies found!</strong></p>");
    } else {
        html.push_str(
            "<h3>Top Discrepancies:</h3>\
             <table border=\"1\" cellpadding=\"8\" cellspacing=\"0\" style=\"border-collapse: collapse;\">\
             <thead><tr style=\"background-color: #f0f0f0;\">\
             <th>SKU</th><th>Product Name</th><th>Order Management Stock</th>\
             <th>Warehouse Stock</th><th>Difference</th></tr></thead><tbody>",
        );
        for d in top {
            let color = if d.difference < 0 { "red" } else { "green" };
            let _ = write!(
                html,
                "<tr><td><strong>{}</strong></td><td>{}</td>\
                 <td style=\"text-align: right;\">{}</td>\
                 <td style=\"text-align: right;\">{}</td>\
                 <td style=\"text-align: right; color: {};\">{:+}</td></tr>",
                escape_html(&d.sku),
                escape_html(&d.product_name),
                d.source_a_quantity,
                d.source_b_quantity,
                color,
                d.difference
            );
        }
        html.push_str("</tbody></table>");
    }

    html.push_str("<p><em>Automated report from the inventory reconciliation service.</em></p>");
    html
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
