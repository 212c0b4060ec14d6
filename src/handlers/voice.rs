use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::errors::AppError;
use crate::models::Language;
use crate::services::conversation::{self, TurnInput, TurnReply};
use crate::state::AppState;

/// Call statuses after which Twilio sends no more turns.
const FINISHED_STATUSES: &[&str] = &["completed", "failed", "busy", "no-answer", "canceled"];

fn validate_twilio_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &HashMap<String, String>,
) -> bool {
    // URL followed by every param name+value, sorted by name
    let mut data = url.to_string();
    let mut sorted: Vec<(&String, &String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in sorted {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data.as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    expected == signature
}

/// Checks `X-Twilio-Signature` when an auth token is configured.
fn verify_request(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    params: &HashMap<String, String>,
) -> Result<(), Response> {
    if state.config.twilio_auth_token.is_empty() {
        return Ok(());
    }

    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if signature.is_empty() {
        tracing::warn!("missing X-Twilio-Signature header");
        return Err(AppError::Unauthorized.into_response());
    }

    // Behind a proxy the public URL comes from X-Forwarded-*
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let url = format!("{proto}://{host}{path}");

    if !validate_twilio_signature(&state.config.twilio_auth_token, signature, &url, params) {
        tracing::warn!(url = %url, "invalid Twilio signature");
        return Err(AppError::Unauthorized.into_response());
    }
    Ok(())
}

pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = verify_request(&state, &headers, "/voice", &params) {
        return rejection;
    }

    let Some(call_id) = params.get("CallSid").map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    else {
        tracing::warn!("voice webhook without CallSid");
        return AppError::BadRequest("missing CallSid".to_string()).into_response();
    };
    let caller = params
        .get("From")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let language_hint = params.get("Language").cloned();
    let speech = params
        .get("SpeechResult")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let reply = match speech {
        Some(text) => {
            tracing::info!(call_id = %call_id, text = %text, "caller turn");
            conversation::process_turn(
                &state,
                TurnInput {
                    call_id,
                    text,
                    language_hint,
                    caller,
                },
            )
            .await
        }
        None => conversation::prompt(&state, &call_id, caller, language_hint).await,
    };

    twiml_response(render_twiml(&reply))
}

pub async fn status_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = verify_request(&state, &headers, "/voice/status", &params) {
        return rejection;
    }

    let call_id = params.get("CallSid").map(String::as_str).unwrap_or("");
    let status = params.get("CallStatus").map(String::as_str).unwrap_or("");

    if FINISHED_STATUSES.contains(&status) && state.sessions.remove(call_id) {
        tracing::info!(call_id = %call_id, status = %status, "call ended, session discarded");
    }

    twiml_response("<Response></Response>".to_string())
}

/// TwiML for one reply: a final `<Say>` and `<Hangup/>`, or a speech `<Gather>` that loops back.
pub fn render_twiml(reply: &TurnReply) -> String {
    let say = say(&reply.reply_text, reply.language);

    if reply.should_end_call {
        return format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response>{say}<Hangup/></Response>"#
        );
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Gather input="speech" action="/voice" method="POST" language="{lang}" speechTimeout="auto">{say}</Gather><Redirect method="POST">/voice</Redirect></Response>"#,
        lang = reply.language.voice_code(),
    )
}

fn say(text: &str, language: Language) -> String {
    format!(
        r#"<Say language="{}">{}</Say>"#,
        language.voice_code(),
        xml_escape(text)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn twiml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DialogueIntent, ReservationSlots};

    fn reply(text: &str, end: bool) -> TurnReply {
        TurnReply {
            reply_text: text.to_string(),
            should_end_call: end,
            language: Language::It,
            intent: DialogueIntent::NoOp,
            slots: ReservationSlots::default(),
            tier: None,
        }
    }

    #[test]
    fn test_render_final_reply_hangs_up() {
        let xml = render_twiml(&reply("Arrivederci", true));
        assert!(xml.contains(r#"<Say language="it-IT">Arrivederci</Say><Hangup/>"#));
        assert!(!xml.contains("<Gather"));
    }

    #[test]
    fn test_render_open_reply_gathers_speech() {
        let xml = render_twiml(&reply("Per quante persone?", false));
        assert!(xml.contains(r#"<Gather input="speech" action="/voice""#));
        assert!(xml.contains("<Redirect"));
        assert!(!xml.contains("<Hangup/>"));
    }

    #[test]
    fn test_reply_text_is_escaped() {
        let xml = render_twiml(&reply("Fish & chips <now>", true));
        assert!(xml.contains("Fish &amp; chips &lt;now&gt;"));
    }

    #[test]
    fn test_signature_validation() {
        let mut params = HashMap::new();
        params.insert("CallSid".to_string(), "CA123".to_string());
        params.insert("From".to_string(), "+39111".to_string());
        let url = "https://example.com/voice";

        let mut mac = Hmac::<Sha1>::new_from_slice(b"secret").unwrap();
        mac.update(b"https://example.com/voiceCallSidCA123From+39111");
        let signature =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert!(validate_twilio_signature("secret", &signature, url, &params));
        assert!(!validate_twilio_signature("other", &signature, url, &params));
    }
}
