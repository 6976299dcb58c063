//! Image payload resolution (§4.1 step 3).
//!
//! Precedence: `external_link` > inline `content` (already a data URL passes through; raw bytes
//! are base64-encoded and wrapped; an already-base64 string is wrapped as-is) > fetch from the
//! memo server. A payload that cannot be resolved by any of these is skipped with a warning —
//! the caller never fails the whole build because of one unresolvable image (§9 open question:
//! no retries).

use base64::Engine;

use crate::model::{Attachment, AttachmentContent};

use super::BuilderConfig;

fn percent_encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Resolves the payload (a data URL or an external URL) that the image embedding model and
/// caption provider are given in place of raw bytes.
pub(super) async fn resolve_image_payload(
    attachment: &Attachment,
    config: &BuilderConfig,
    http_client: &reqwest::Client,
) -> Option<String> {
    if let Some(link) = &attachment.external_link {
        if !link.is_empty() {
            return Some(link.clone());
        }
    }

    match &attachment.content {
        Some(AttachmentContent::Text(text)) if text.starts_with("data:") => return Some(text.clone()),
        Some(AttachmentContent::Text(text)) => {
            return Some(format!("data:{};base64,{}", attachment.mime_type, text));
        }
        Some(AttachmentContent::Bytes(bytes)) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            return Some(format!("data:{};base64,{}", attachment.mime_type, encoded));
        }
        None => {}
    }

    fetch_from_memo_server(attachment, config, http_client).await
}

async fn fetch_from_memo_server(
    attachment: &Attachment,
    config: &BuilderConfig,
    http_client: &reqwest::Client,
) -> Option<String> {
    let base_url = config.memos_base_url.as_ref()?;
    let url = format!(
        "{}/file/{}/{}",
        base_url.trim_end_matches('/'),
        attachment.name,
        percent_encode_path_segment(&attachment.filename)
    );

    let mut request = http_client.get(&url);
    if let Some(cookie) = &config.memos_session_cookie {
        request = request.header(reqwest::header::COOKIE, cookie.clone());
    }

    let response = match request.send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::warn!(url, status = %response.status(), "memo server returned non-success status for attachment fetch");
            return None;
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "failed to fetch attachment from memo server");
            return None;
        }
    };

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&attachment.mime_type)
        .to_string();

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(url, error = %e, "failed to read attachment body from memo server");
            return None;
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Some(format!("data:{content_type};base64,{encoded}"))
}
