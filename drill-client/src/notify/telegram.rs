use drill_core::domain::target::TargetConfig;
use serde_json::json;
use tracing::info;

use super::NotifyError;

pub(super) const API_BASE: &str = "https://api.telegram.org";

pub(super) async fn send(
    http: &reqwest::Client,
    api_base: &str,
    config: &TargetConfig,
    text: &str,
) -> Result<(), NotifyError> {
    let token = config
        .get_str("bot_token")
        .ok_or(NotifyError::MissingConfig("bot_token"))?;
    let chat_id = chat_id(config)?;

    let url = format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token);
    let response = http
        .post(&url)
        .json(&json!({ "chat_id": chat_id, "text": text }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NotifyError::Api {
            status: status.as_u16(),
            message: description(&body),
        });
    }

    info!("Telegram message sent to chat {}", chat_id);
    Ok(())
}

/// Numeric chat ids are sent as JSON numbers, usernames as strings
fn chat_id(config: &TargetConfig) -> Result<serde_json::Value, NotifyError> {
    match config.0.get("chat_id") {
        Some(serde_json::Value::Number(n)) => Ok(serde_json::Value::Number(n.clone())),
        _ => config
            .get_text("chat_id")
            .map(serde_json::Value::String)
            .ok_or(NotifyError::MissingConfig("chat_id")),
    }
}

/// Telegram error bodies carry a `description` field
fn description(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("description").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description() {
        assert_eq!(
            description(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#),
            "Bad Request: chat not found"
        );
        assert_eq!(description(" gateway timeout "), "gateway timeout");
    }

    #[test]
    fn test_chat_id_accepts_numbers_and_strings() {
        let numeric: TargetConfig =
            serde_json::from_value(json!({"chat_id": -1001234567890i64})).unwrap();
        assert_eq!(chat_id(&numeric).unwrap(), json!(-1001234567890i64));

        let named: TargetConfig = serde_json::from_value(json!({"chat_id": " @drills "})).unwrap();
        assert_eq!(chat_id(&named).unwrap(), json!("@drills"));

        let blank: TargetConfig = serde_json::from_value(json!({"chat_id": ""})).unwrap();
        assert!(matches!(
            chat_id(&blank),
            Err(NotifyError::MissingConfig("chat_id"))
        ));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let config = TargetConfig::default();
        let err = send(&reqwest::Client::new(), API_BASE, &config, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::MissingConfig("bot_token")));
    }
}
