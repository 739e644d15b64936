// mail/mails.rs
use crate::config::Config;
use crate::models::membershipmodel::Payment;
use crate::utils::currency::format_kobo_as_naira;

use super::sendmail::send_email;

/// Outgoing email sender. Holds the Resend credentials from the config so
/// nothing in the mail path reads the environment at send time.
#[derive(Debug, Clone)]
pub struct Mailer {
    api_key: String,
    from_email: String,
    app_url: String,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.resend_api_key.clone(),
            from_email: config.from_email.clone(),
            app_url: config.app_url.clone(),
        }
    }

    pub async fn send_verification_email(
        &self,
        to_email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let subject = "Verify your email";
        let template_path = "src/mail/templates/Verification-email.html";
        let verification_link = format!("{}/api/auth/verify?token={}", self.app_url, token);
        let placeholders = vec![
            ("{{username}}".to_string(), username.to_string()),
            ("{{verification_link}}".to_string(), verification_link),
        ];

        send_email(
            &self.api_key,
            &self.from_email,
            to_email,
            subject,
            template_path,
            &placeholders,
        )
        .await
    }

    pub async fn send_welcome_email(
        &self,
        to_email: &str,
        username: &str,
        certificate_number: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let subject = "Welcome to AgriConnect";
        let template_path = "src/mail/templates/Welcome-email.html";
        let placeholders = vec![
            ("{{username}}".to_string(), username.to_string()),
            (
                "{{certificate_number}}".to_string(),
                certificate_number.to_string(),
            ),
        ];

        send_email(
            &self.api_key,
            &self.from_email,
            to_email,
            subject,
            template_path,
            &placeholders,
        )
        .await
    }

    pub async fn send_payment_receipt(
        &self,
        to_email: &str,
        username: &str,
        payment: &Payment,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let subject = "Payment received";
        let template_path = "src/mail/templates/PaymentReceipt-email.html";

        let purpose = match payment.subscription_year {
            Some(year) => format!("{} ({})", payment.payment_purpose.to_str(), year),
            None => payment.payment_purpose.to_str().to_string(),
        };

        let placeholders = vec![
            ("{{username}}".to_string(), username.to_string()),
            (
                "{{amount}}".to_string(),
                format_kobo_as_naira(payment.amount),
            ),
            ("{{purpose}}".to_string(), purpose),
            (
                "{{reference}}".to_string(),
                payment.gateway_reference.clone(),
            ),
        ];

        send_email(
            &self.api_key,
            &self.from_email,
            to_email,
            subject,
            template_path,
            &placeholders,
        )
        .await
    }
}
