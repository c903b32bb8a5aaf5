use drill_core::domain::target::TargetConfig;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

use super::NotifyError;

const DEFAULT_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP delivery; port 465 uses implicit TLS, any other port STARTTLS
pub(super) async fn send(
    config: &TargetConfig,
    subject: &str,
    body: &str,
) -> Result<(), NotifyError> {
    let host = config
        .get_str("host")
        .ok_or(NotifyError::MissingConfig("host"))?;
    let from = config
        .get_str("from_email")
        .ok_or(NotifyError::MissingConfig("from_email"))?;
    let to = config
        .get_str("to_email")
        .ok_or(NotifyError::MissingConfig("to_email"))?;
    let port = config.get_port("port", DEFAULT_PORT);

    let message = Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(to)?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| NotifyError::Email(e.to_string()))?;

    let builder = if port == IMPLICIT_TLS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
    }
    .map_err(|e| NotifyError::Email(e.to_string()))?
    .port(port)
    .timeout(Some(SMTP_TIMEOUT));

    let builder = match (config.get_str("user"), config.get_str("password")) {
        (Some(user), Some(password)) => {
            builder.credentials(Credentials::new(user.to_string(), password.to_string()))
        }
        _ => builder,
    };

    builder
        .build()
        .send(message)
        .await
        .map_err(|e| NotifyError::Email(e.to_string()))?;

    info!("Email sent to {} via {}:{}", to, host, port);
    Ok(())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::Email(format!("invalid address '{}': {}", address, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_invalid_recipient_fails_before_connecting() {
        let config: TargetConfig = serde_json::from_value(json!({
            "host": "smtp.invalid",
            "from_email": "drill@example.com",
            "to_email": "not an address",
        }))
        .unwrap();

        match send(&config, "Restore Drill: SUCCESS", "body").await {
            Err(NotifyError::Email(msg)) => assert!(msg.contains("not an address")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_host() {
        let err = send(&TargetConfig::default(), "s", "b").await.unwrap_err();
        assert!(matches!(err, NotifyError::MissingConfig("host")));
    }
}
