//! Decomposed view of a request during one signing pass.

use std::mem;

use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Signing context for one request.
///
/// Built from [`http::request::Parts`] at the start of a signing call and
/// applied back once the signature has been computed. Nothing here outlives
/// a single call.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// HTTP query parameters, duplicates preserved in request order.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    ///
    /// Fails before anything is moved out of `parts`, so a rejected request
    /// is left exactly as it came in.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        if parts.uri.authority().is_none() {
            return Err(Error::request_invalid(
                "request without authority is invalid for signing",
            ));
        }

        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.expect("authority checked above"),
            path: if paq.path().is_empty() {
                "/".to_string()
            } else {
                paq.path().to_string()
            },
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Normalize header value.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        // This can't fail because we started with a valid HeaderValue and then only trimmed spaces
        *v = HeaderValue::from_bytes(&bs[starting_index..ending_index])
            .expect("invalid header value")
    }

    /// Get header names as sorted vector.
    ///
    /// `http::HeaderMap` keeps names lowercase, so sorting the raw strings is
    /// already a case insensitive sort.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }

    /// Join all values of one header with `,`, preserving their order.
    pub fn header_get_all_joined(&self, name: &str) -> Result<String> {
        let mut s = String::new();
        for (idx, value) in self.headers.get_all(name).iter().enumerate() {
            if idx > 0 {
                s.push(',');
            }
            s.push_str(value.to_str()?);
        }

        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_for(uri: &str) -> http::request::Parts {
        http::Request::builder()
            .uri(uri)
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[test]
    fn test_build_requires_authority() {
        let mut parts = parts_for("/only/a/path");
        let err = SigningRequest::build(&mut parts).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
        // The rejected request is untouched.
        assert_eq!(parts.uri.path(), "/only/a/path");
    }

    #[test]
    fn test_build_defaults_empty_path_to_root() {
        let mut parts = parts_for("http://examplehost.com");
        let ctx = SigningRequest::build(&mut parts).expect("must build");
        assert_eq!(ctx.path, "/");
        assert!(ctx.query.is_empty());
    }

    #[test]
    fn test_build_preserves_duplicate_query_pairs() {
        let mut parts = parts_for("http://examplehost.com/?tag=b&tag=a&flag");
        let ctx = SigningRequest::build(&mut parts).expect("must build");
        assert_eq!(
            ctx.query,
            vec![
                ("tag".to_string(), "b".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("flag".to_string(), "".to_string()),
            ]
        );
    }

    #[test]
    fn test_header_value_normalize_trims_spaces() {
        let mut v = HeaderValue::from_static("  some value ");
        SigningRequest::header_value_normalize(&mut v);
        assert_eq!(v, HeaderValue::from_static("some value"));
    }

    #[test]
    fn test_header_get_all_joined_keeps_order() {
        let mut parts = parts_for("http://examplehost.com/");
        parts.headers.append("x-test", "b".parse().unwrap());
        parts.headers.append("x-test", "a".parse().unwrap());
        let ctx = SigningRequest::build(&mut parts).expect("must build");

        assert_eq!(ctx.header_get_all_joined("x-test").unwrap(), "b,a");
    }

    #[test]
    fn test_apply_round_trips_uri() {
        let mut parts = parts_for("https://examplehost.com/path?a=1&b=");
        let ctx = SigningRequest::build(&mut parts).expect("must build");
        ctx.apply(&mut parts).expect("must apply");

        assert_eq!(parts.uri.scheme_str(), Some("https"));
        assert_eq!(parts.uri.host(), Some("examplehost.com"));
        assert_eq!(parts.uri.path(), "/path");
        assert_eq!(parts.uri.query(), Some("a=1&b"));
    }
}
