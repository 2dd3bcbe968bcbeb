use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{OutboundCall, PlacedCall, TelephonyError, TelephonyProvider};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio account and callback settings.
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Publicly reachable base URL of this service.
    pub public_url: String,
    /// REST API base, overridable for tests.
    pub api_base: String,
}

impl TwilioConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            public_url: public_url.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .field("public_url", &self.public_url)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

/// Twilio Programmable Voice adapter.
#[derive(Debug, Clone)]
pub struct TwilioTelephony {
    client: Client,
    config: TwilioConfig,
    media_stream_url: String,
    status_callback_url: String,
}

impl TwilioTelephony {
    pub fn new(config: TwilioConfig) -> Result<Self, TelephonyError> {
        let media_stream_url = media_stream_url(&config.public_url)?;
        let status_callback_url = format!(
            "{}/webhooks/twilio/status",
            config.public_url.trim_end_matches('/')
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TelephonyError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            media_stream_url,
            status_callback_url,
        })
    }

    pub fn media_stream_url(&self) -> &str {
        &self.media_stream_url
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn call_url(&self, call_id: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid,
            call_id
        )
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, TelephonyError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<TwilioErrorBody>(&body) {
            Ok(error) => match error.code {
                Some(code) => format!("{} (code {code})", error.message),
                None => error.message,
            },
            Err(_) => body.chars().take(500).collect(),
        };
        Err(TelephonyError::Provider {
            status: status.as_u16(),
            message,
        })
    }

    async fn update_twiml(&self, call_id: &str, twiml: &str) -> Result<(), TelephonyError> {
        self.post_form(&self.call_url(call_id), &[("Twiml", twiml)])
            .await
            .map(|_| ())
    }

    pub(crate) fn stream_twiml(&self) -> String {
        format!(
            r#"<Response><Connect><Stream url="{}"/></Connect></Response>"#,
            xml_escape(&self.media_stream_url)
        )
    }

    pub(crate) fn digits_twiml(&self, digits: &str) -> String {
        format!(
            r#"<Response><Play digits="w{}"/><Connect><Stream url="{}"/></Connect></Response>"#,
            xml_escape(digits),
            xml_escape(&self.media_stream_url)
        )
    }

    pub(crate) fn transfer_twiml(&self, to: &str) -> String {
        format!("<Response><Dial>{}</Dial></Response>", xml_escape(to))
    }
}

#[async_trait]
impl TelephonyProvider for TwilioTelephony {
    fn provider_name(&self) -> &'static str {
        "twilio"
    }

    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        let twiml = self.stream_twiml();
        let form = [
            ("To", call.to.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Twiml", twiml.as_str()),
            ("StatusCallback", self.status_callback_url.as_str()),
            ("StatusCallbackMethod", "POST"),
            ("StatusCallbackEvent", "initiated"),
            ("StatusCallbackEvent", "ringing"),
            ("StatusCallbackEvent", "answered"),
            ("StatusCallbackEvent", "completed"),
        ];

        let response = self.post_form(&self.calls_url(), &form).await?;
        let resource: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))?;

        info!(
            call_id = %resource.sid,
            correlation_id = %call.correlation_id,
            status = %resource.status,
            "Outbound call placed"
        );

        Ok(PlacedCall {
            call_id: resource.sid,
            provider_status: resource.status,
        })
    }

    async fn send_digits(&self, call_id: &str, digits: &str) -> Result<(), TelephonyError> {
        debug!(call_id = %call_id, digit_count = digits.len(), "Sending DTMF");
        self.update_twiml(call_id, &self.digits_twiml(digits)).await
    }

    async fn transfer(&self, call_id: &str, to: &str) -> Result<(), TelephonyError> {
        info!(call_id = %call_id, "Transferring call to handoff number");
        self.update_twiml(call_id, &self.transfer_twiml(to)).await
    }

    async fn hangup(&self, call_id: &str) -> Result<(), TelephonyError> {
        self.post_form(&self.call_url(call_id), &[("Status", "completed")])
            .await
            .map(|_| ())
    }
}

/// `http(s)://host/base` becomes `ws(s)://host/media`.
fn media_stream_url(public_url: &str) -> Result<String, TelephonyError> {
    let mut url = Url::parse(public_url)
        .map_err(|e| TelephonyError::Configuration(format!("Invalid public URL: {e}")))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(TelephonyError::Configuration(format!(
                "Unsupported public URL scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TelephonyError::Configuration("Cannot convert public URL".to_string()))?;
    url.set_path("/media");
    url.set_query(None);
    Ok(url.to_string())
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
