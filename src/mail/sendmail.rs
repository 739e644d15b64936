use std::fs;

use serde_json::json;
use tokio::time::{sleep, Duration};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

pub async fn send_email(
    api_key: &str,
    from_email: &str,
    to_email: &str,
    subject: &str,
    template_path: &str,
    placeholders: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    if to_email.is_empty() {
        return Err("Email recipient cannot be empty".into());
    }
    if !to_email.contains('@') {
        return Err(format!("Invalid email address: {}", to_email).into());
    }

    let html_template = match fs::read_to_string(template_path) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Failed to read email template {}: {}", template_path, e);
            return Err(format!("Template not found: {}", template_path).into());
        }
    };

    let html_body = apply_placeholders(html_template, placeholders);

    send_with_retries(api_key, from_email, to_email, subject, &html_body).await
}

fn apply_placeholders(mut template: String, placeholders: &[(String, String)]) -> String {
    for (key, value) in placeholders {
        template = template.replace(key, value);
    }
    template
}

async fn send_with_retries(
    api_key: &str,
    from_email: &str,
    to_email: &str,
    subject: &str,
    html_body: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        match send_via_resend(api_key, from_email, to_email, subject, html_body).await {
            Ok(email_id) => {
                tracing::info!("Email sent to {} (id: {})", to_email, email_id);
                return Ok(());
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < MAX_RETRIES {
                    let delay = RETRY_DELAY_MS * (2_u64.pow(attempt - 1));
                    tracing::warn!(
                        "Email send attempt {} failed for {}. Retrying in {}ms...",
                        attempt,
                        to_email,
                        delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    let error_msg = last_error
        .map(|e| format!("Failed after {} retries: {}", MAX_RETRIES, e))
        .unwrap_or_else(|| "Unknown email sending error".to_string());

    tracing::error!("Email failed for {}: {}", to_email, error_msg);
    Err(error_msg.into())
}

async fn send_via_resend(
    api_key: &str,
    from_email: &str,
    to_email: &str,
    subject: &str,
    html_body: &str,
) -> Result<String, String> {
    if api_key.is_empty() {
        return Err("Resend API key is empty".to_string());
    }

    let client = reqwest::Client::new();
    let request_body = json!({
        "from": from_email,
        "to": to_email,
        "subject": subject,
        "html": html_body,
    });

    let response = client
        .post("https://api.resend.com/emails")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .unwrap_or_else(|_| "No response body".to_string());

    if status.is_success() {
        if let Ok(body) = serde_json::from_str::<serde_json::Value>(&response_text) {
            if let Some(id) = body.get("id").and_then(|v| v.as_str()) {
                return Ok(id.to_string());
            }
        }
        Ok("success".to_string())
    } else {
        Err(format!(
            "Resend API error ({}): {}",
            status.as_u16(),
            response_text
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_template_renders_certificate_number() {
        let template = fs::read_to_string("src/mail/templates/Welcome-email.html").unwrap();
        assert!(template.contains("{{certificate_number}}"));

        let rendered = apply_placeholders(
            template,
            &[
                ("{{username}}".to_string(), "adaeze".to_string()),
                (
                    "{{certificate_number}}".to_string(),
                    "AGC-2025-0A1B2C3D".to_string(),
                ),
            ],
        );

        assert!(rendered.contains("AGC-2025-0A1B2C3D"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn verification_template_renders_link() {
        let template = fs::read_to_string("src/mail/templates/Verification-email.html").unwrap();

        let rendered = apply_placeholders(
            template,
            &[
                ("{{username}}".to_string(), "adaeze".to_string()),
                (
                    "{{verification_link}}".to_string(),
                    "https://example.com/api/auth/verify?token=abc".to_string(),
                ),
            ],
        );

        assert!(rendered.contains("https://example.com/api/auth/verify?token=abc"));
        assert!(!rendered.contains("{{"));
    }
}
