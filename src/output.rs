//! Rendering of the Vault login response.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::warn;

use crate::error::Result;
use crate::vault::{LoginReply, LoginResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pretty-printed response body.
    Full,
    /// Only `auth.client_token`.
    TokenOnly,
}

impl OutputMode {
    pub fn from_flag(only_token: bool) -> Self {
        if only_token {
            Self::TokenOnly
        } else {
            Self::Full
        }
    }
}

pub fn render(reply: &LoginReply, mode: OutputMode) -> Result<String> {
    match mode {
        OutputMode::TokenOnly => {
            let response: LoginResponse = serde_json::from_str(&reply.body)?;
            response.into_token()
        }
        OutputMode::Full => {
            if !reply.status.is_success() {
                warn!(status = %reply.status, "Vault rejected the login");
            }
            Ok(pretty_print(&reply.body))
        }
    }
}

/// Re-indents a JSON document with tabs, keeping key order.
/// Anything that is not JSON comes back unchanged.
pub fn pretty_print(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_owned();
    };

    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    if value.serialize(&mut serializer).is_err() {
        return body.to_owned();
    }

    String::from_utf8(out).unwrap_or_else(|_| body.to_owned())
}
