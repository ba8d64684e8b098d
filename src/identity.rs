//! Signed STS `GetCallerIdentity` requests for the Vault `aws` auth method.
//!
//! The request is built and signed locally but never sent. Vault replays it
//! against STS to learn who the caller is, so everything it needs (method,
//! URL, signed headers, body) is shipped base64-encoded in [`IamLoginData`].

use std::collections::BTreeMap;
use std::time::SystemTime;

use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sdk_sts::config::endpoint::{DefaultResolver, Params, ResolveEndpoint};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use aws_types::region::Region;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Header binding the signed request to one Vault server.
pub const SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

const STS_METHOD: &str = "POST";
const STS_SIGNING_NAME: &str = "sts";
const GET_CALLER_IDENTITY_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const GLOBAL_STS_HOST: &str = "sts.amazonaws.com";
const GLOBAL_SIGNING_REGION: &str = "us-east-1";

/// Header name to values, the shape Vault accepts for `iam_request_headers`.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// The identity proof Vault expects in an `aws` auth login, minus the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IamLoginData {
    /// HTTP method of the signed STS request.
    pub iam_http_request_method: String,
    /// Base64-encoded STS request URL.
    pub iam_request_url: String,
    /// Base64-encoded JSON [`HeaderMap`] of the signed request.
    pub iam_request_headers: String,
    /// Base64-encoded STS request body.
    pub iam_request_body: String,
}

/// Which STS endpoint legacy regions sign against, as in
/// `AWS_STS_REGIONAL_ENDPOINTS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StsEndpointMode {
    /// `sts.amazonaws.com` for legacy regions, which is where Vault sends
    /// requests unless its `sts_endpoint` is configured.
    #[default]
    Legacy,
    /// Always the region's own endpoint.
    Regional,
}

/// Where the STS request is addressed and which region it is signed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StsTarget {
    pub url: String,
    pub signing_region: String,
}

impl StsTarget {
    /// Resolves the STS endpoint for `region` with the SDK's endpoint rules.
    ///
    /// In [`StsEndpointMode::Legacy`], legacy regions resolve to
    /// `sts.amazonaws.com`, which only accepts signatures scoped to `us-east-1`.
    pub async fn resolve(region: &str, mode: StsEndpointMode) -> Result<Self> {
        let params = Params::builder()
            .region(region)
            .use_global_endpoint(mode == StsEndpointMode::Legacy)
            .build()
            .map_err(|e| Error::Endpoint(e.to_string()))?;

        let endpoint = DefaultResolver::new()
            .resolve_endpoint(&params)
            .await
            .map_err(|e| Error::Endpoint(e.to_string()))?;

        let url = reqwest::Url::parse(endpoint.url())
            .map_err(|e| Error::Endpoint(format!("{}: {e}", endpoint.url())))?;

        let signing_region = if url.host_str() == Some(GLOBAL_STS_HOST) {
            GLOBAL_SIGNING_REGION
        } else {
            region
        };

        Ok(Self {
            url: url.to_string(),
            signing_region: signing_region.to_owned(),
        })
    }
}

/// Builds the login data for `region` from the default AWS credential chain.
pub async fn build_login_data(
    region: &str,
    server_id: &str,
    endpoint_mode: StsEndpointMode,
) -> Result<IamLoginData> {
    let credentials = load_credentials(region).await?;
    let target = StsTarget::resolve(region, endpoint_mode).await?;

    info!(
        url = %target.url,
        signing_region = %target.signing_region,
        "Signing STS GetCallerIdentity request"
    );

    sign_login_data(&credentials, &target, server_id, SystemTime::now())
}

async fn load_credentials(region: &str) -> Result<Credentials> {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await;

    let provider = config
        .credentials_provider()
        .ok_or_else(|| Error::Credentials("no credentials provider configured".to_string()))?;

    provider
        .provide_credentials()
        .await
        .map_err(|e| Error::Credentials(e.to_string()))
}

/// Signs a `GetCallerIdentity` request for `target` at `time` and encodes it.
///
/// The server-identity header is part of the signed header set.
pub fn sign_login_data(
    credentials: &Credentials,
    target: &StsTarget,
    server_id: &str,
    time: SystemTime,
) -> Result<IamLoginData> {
    let unsigned = [
        ("Content-Type", FORM_CONTENT_TYPE),
        (SERVER_ID_HEADER, server_id),
    ];

    let identity = credentials.clone().into();
    let signing_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(&target.signing_region)
        .name(STS_SIGNING_NAME)
        .time(time)
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| Error::Signing(e.to_string()))?
        .into();

    let signable = SignableRequest::new(
        STS_METHOD,
        target.url.as_str(),
        unsigned.iter().copied(),
        SignableBody::Bytes(GET_CALLER_IDENTITY_BODY.as_bytes()),
    )
    .map_err(|e| Error::Signing(e.to_string()))?;

    let (instructions, _signature) = sign(signable, &signing_params)
        .map_err(|e| Error::Signing(e.to_string()))?
        .into_parts();

    let mut headers = HeaderMap::new();
    for (name, value) in unsigned.iter().copied().chain(instructions.headers()) {
        headers
            .entry(name.to_owned())
            .or_default()
            .push(value.to_owned());
    }

    debug!(
        headers = ?headers.keys().collect::<Vec<_>>(),
        "Signed STS request"
    );

    Ok(IamLoginData {
        iam_http_request_method: STS_METHOD.to_owned(),
        iam_request_url: BASE64.encode(target.url.as_bytes()),
        iam_request_headers: encode_headers(&headers)?,
        iam_request_body: BASE64.encode(GET_CALLER_IDENTITY_BODY.as_bytes()),
    })
}

/// JSON-serializes `headers` and base64-encodes the result.
pub fn encode_headers(headers: &HeaderMap) -> Result<String> {
    let json = serde_json::to_vec(headers)?;
    Ok(BASE64.encode(json))
}
