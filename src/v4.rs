//! AWS SigV4 signer.

use std::fmt::Write;

use chrono::TimeDelta;
use http::header;
use http::request::Parts;
use http::HeaderValue;
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};

use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_SECURITY_TOKEN,
};
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::hash::{hex_hmac_sha256, hex_sha256, hex_sha256_payload, hmac_sha256};
use crate::request::SigningRequest;
use crate::time::{format_date, format_iso8601, now, DateTime};

/// Signer that implements AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// A signer holds only an immutable credential, so one instance can sign
/// requests from any number of threads concurrently.
#[derive(Debug)]
pub struct Signer {
    credential: Credential,
    content_sha256: bool,
    clock_offset: TimeDelta,

    time: Option<DateTime>,
}

impl Signer {
    /// Create a new signer for the given credential.
    ///
    /// The credential is validated here once instead of on every signing
    /// call. Returns `CredentialInvalid` if access key id or secret access
    /// key is empty.
    pub fn new(credential: Credential) -> Result<Self> {
        credential.check()?;

        Ok(Self {
            credential,
            content_sha256: true,
            clock_offset: TimeDelta::zero(),
            time: None,
        })
    }

    /// Skip emitting the `x-amz-content-sha256` header.
    ///
    /// The payload hash still terminates the canonical request either way.
    /// Some services expect requests without this header.
    pub fn without_content_sha256(mut self) -> Self {
        self.content_sha256 = false;
        self
    }

    /// Shift the captured signing time by a fixed offset.
    ///
    /// Useful when the local clock is known to be skewed against the
    /// service clock.
    pub fn with_clock_offset(mut self, offset: TimeDelta) -> Self {
        self.clock_offset = offset;
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sign a request for the given service and region.
    ///
    /// The request is taken as [`http::request::Parts`] with the body
    /// supplied separately; the body is only read for hashing and stays
    /// usable by the transport afterwards. On success the `Host` (if
    /// absent), `x-amz-date`, `x-amz-content-sha256` (unless disabled),
    /// `x-amz-security-token` (if a session token is configured) and
    /// `Authorization` headers are written onto the request. On failure
    /// the request is left untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use aws4sign::{Credential, Signer};
    ///
    /// # fn main() -> aws4sign::Result<()> {
    /// let signer = Signer::new(Credential::new("access_key_id", "secret_access_key"))?;
    ///
    /// let (mut parts, body) = http::Request::put("https://s3.amazonaws.com/testbucket/hello")
    ///     .body(Vec::from("Hello, World!"))?
    ///     .into_parts();
    /// signer.sign(&mut parts, &body, "s3", "us-east-1")?;
    ///
    /// assert!(parts.headers.contains_key(http::header::AUTHORIZATION));
    /// # Ok(())
    /// # }
    /// ```
    pub fn sign(&self, req: &mut Parts, body: &[u8], service: &str, region: &str) -> Result<()> {
        if service.is_empty() {
            return Err(Error::config_invalid("service must not be empty"));
        }
        if region.is_empty() {
            return Err(Error::config_invalid("region must not be empty"));
        }

        let now = self.time.unwrap_or_else(|| now() + self.clock_offset);
        let mut signed_req = SigningRequest::build(req)?;

        canonicalize_header(&mut signed_req, &self.credential, now)?;

        // An existing digest header stays authoritative so that caller
        // supplied values like UNSIGNED-PAYLOAD keep working.
        let payload_hash = match signed_req.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => v.to_str()?.to_string(),
            None => {
                let payload_hash = hex_sha256_payload(body);
                if self.content_sha256 {
                    signed_req
                        .headers
                        .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_str(&payload_hash)?);
                }
                payload_hash
            }
        };

        canonicalize_query(&mut signed_req);

        // Build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req, &payload_hash)?;
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!("{}/{}/{}/aws4_request", format_date(now), region, service);
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{scope}")?;
            write!(f, "{encoded_req}")?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(self.credential.secret_access_key(), now, region, service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.credential.access_key_id(),
            scope,
            signed_req.header_name_to_vec_sorted().join(";"),
            signature
        ))?;
        authorization.set_sensitive(true);
        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)
    }
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    cred: &Credential,
    now: DateTime,
) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // The date header always reflects the captured signing time, so header
    // and signature can never disagree.
    ctx.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);

    // Insert X_AMZ_SECURITY_TOKEN header if a session token exists. The
    // token has to be inserted before canonicalization so it becomes part
    // of the signed header set.
    if let Some(token) = cred.session_token() {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to avoid leaking.
        value.set_sensitive(true);

        ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    Ok(())
}

fn canonicalize_query(ctx: &mut SigningRequest) {
    if ctx.query.is_empty() {
        return;
    }

    // Encode first, then sort: ordering follows the encoded key bytes and
    // repeated keys tie-break on the encoded values.
    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
    ctx.query.sort();
}

fn canonical_request_string(ctx: &SigningRequest, payload_hash: &str) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)?;
    // Insert encoded path
    let path = percent_decode_str(&ctx.path)
        .decode_utf8()
        .map_err(|e| Error::request_invalid("path is not valid utf-8").with_source(e))?;
    writeln!(f, "{}", utf8_percent_encode(&path, &AWS_URI_ENCODE_SET))?;
    // Insert query
    writeln!(
        f,
        "{}",
        ctx.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert canonical headers
    let signed_headers = ctx.header_name_to_vec_sorted();
    for name in signed_headers.iter() {
        writeln!(f, "{}:{}", name, ctx.header_get_all_joined(name)?)?;
    }
    writeln!(f)?;
    // Insert signed headers
    writeln!(f, "{}", signed_headers.join(";"))?;
    // Insert payload hash
    write!(f, "{payload_hash}")?;

    Ok(f)
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
