use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use callpilot::core::telephony::{
    OutboundCall, TelephonyError, TelephonyProvider, TwilioConfig, TwilioTelephony,
};

const CALLS_PATH: &str = "/2010-04-01/Accounts/AC123/Calls.json";
const CALL_PATH: &str = "/2010-04-01/Accounts/AC123/Calls/CA42.json";

fn telephony(server: &MockServer) -> TwilioTelephony {
    let mut config = TwilioConfig::new(
        "AC123",
        "token",
        "+15550000000",
        "https://pilot.example.com",
    );
    config.api_base = server.uri();
    TwilioTelephony::new(config).unwrap()
}

fn form(request: &Request) -> Vec<(String, String)> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

fn form_map(request: &Request) -> HashMap<String, String> {
    form(request).into_iter().collect()
}

#[tokio::test]
async fn test_place_call_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CALLS_PATH))
        .and(basic_auth("AC123", "token"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "sid": "CA42", "status": "queued" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let placed = telephony(&server)
        .place_call(&OutboundCall {
            to: "+15550102000".to_string(),
            correlation_id: "claim-77".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(placed.call_id, "CA42");
    assert_eq!(placed.provider_status, "queued");

    let requests = server.received_requests().await.unwrap();
    let fields = form_map(&requests[0]);
    assert_eq!(fields["To"], "+15550102000");
    assert_eq!(fields["From"], "+15550000000");
    assert_eq!(
        fields["Twiml"],
        r#"<Response><Connect><Stream url="wss://pilot.example.com/media"/></Connect></Response>"#
    );
    assert_eq!(
        fields["StatusCallback"],
        "https://pilot.example.com/webhooks/twilio/status"
    );

    let events: Vec<String> = form(&requests[0])
        .into_iter()
        .filter(|(key, _)| key == "StatusCallbackEvent")
        .map(|(_, value)| value)
        .collect();
    assert_eq!(events, ["initiated", "ringing", "answered", "completed"]);
}

#[tokio::test]
async fn test_send_digits_replays_stream_after_digits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CALL_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sid": "CA42", "status": "in-progress" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    telephony(&server).send_digits("CA42", "2").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let fields = form_map(&requests[0]);
    assert_eq!(
        fields["Twiml"],
        r#"<Response><Play digits="w2"/><Connect><Stream url="wss://pilot.example.com/media"/></Connect></Response>"#
    );
}

#[tokio::test]
async fn test_transfer_and_hangup_update_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CALL_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sid": "CA42", "status": "in-progress" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let twilio = telephony(&server);
    twilio.transfer("CA42", "+15550009999").await.unwrap();
    twilio.hangup("CA42").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        form_map(&requests[0])["Twiml"],
        "<Response><Dial>+15550009999</Dial></Response>"
    );
    assert_eq!(form_map(&requests[1])["Status"], "completed");
}

#[tokio::test]
async fn test_provider_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CALLS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 21211,
            "message": "The 'To' number is not a valid phone number.",
            "status": 400
        })))
        .mount(&server)
        .await;

    let err = telephony(&server)
        .place_call(&OutboundCall {
            to: "+15550102000".to_string(),
            correlation_id: "claim-77".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        TelephonyError::Provider { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("not a valid phone number"));
            assert!(message.contains("21211"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CALLS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = telephony(&server)
        .place_call(&OutboundCall {
            to: "+15550102000".to_string(),
            correlation_id: "claim-77".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TelephonyError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_provider_is_request_error() {
    let mut config = TwilioConfig::new("AC123", "token", "+15550000000", "http://localhost:3001");
    config.api_base = "http://127.0.0.1:1".to_string();
    let twilio = TwilioTelephony::new(config).unwrap();

    let err = twilio.hangup("CA42").await.unwrap_err();
    assert!(matches!(err, TelephonyError::Request(_)));
}
