//! HTTP clients for Linked Data documents and SPARQL endpoints
//!
//! Both clients share a blocking transport that handles TLS client
//! identities, redirects and rate limiting. Redirects are followed manually:
//! 307 and 308 replay the method and body, 303 turns into a GET, and 301/302
//! keep the method only for safe requests. A 429 answer is retried with
//! exponential backoff capped at 60 seconds, honoring `Retry-After` given as
//! delta-seconds or as an HTTP-date. Every other non-2xx answer fails
//! immediately.

use std::time::Duration;

use log::{debug, info, warn};
use oxrdf::Graph;
use reqwest::blocking::Client;
use reqwest::{Identity, Method, StatusCode};
use serde_json::Value as Json;

use crate::codec;
use crate::error::{Error, Result};
use crate::results::SolutionTable;
use crate::settings::Settings;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("web-algebra/", env!("CARGO_PKG_VERSION"));

const MAX_RETRIES: u32 = 5;
const MAX_REDIRECTS: u32 = 10;
const MAX_BACKOFF_SECS: u64 = 60;

/// Timeout for Linked Data document requests.
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for SPARQL protocol requests.
const SPARQL_TIMEOUT: Duration = Duration::from_secs(10);

/// Response form detected from the SPARQL query text.
#[derive(Debug)]
pub enum SparqlResponse {
    /// SELECT solutions
    Solutions(SolutionTable),
    /// CONSTRUCT / DESCRIBE triples
    Graph(Graph),
}

/// A fully buffered HTTP response after redirects and retries.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Effective URL after following redirects
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Shared blocking transport with the redirect and retry policy above.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &Settings, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none());

        if let Some((path, password)) = settings.client_identity() {
            builder = builder.identity(load_identity(path, password)?);
        }
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(HttpTransport { client })
    }

    /// Sends a request, following redirects and retrying 429 answers.
    pub fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<(&str, Vec<u8>)>,
    ) -> Result<HttpResponse> {
        let mut method = method;
        let mut url = url.to_string();
        let mut body = body.map(|(ct, bytes)| (ct.to_string(), bytes));
        let mut retries = 0u32;
        let mut redirects = 0u32;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            if let Some((content_type, bytes)) = &body {
                request = request
                    .header("Content-Type", content_type.as_str())
                    .body(bytes.clone());
            }

            debug!("{} {}", method, url);
            let response = request.send()?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RETRIES {
                    return Err(Error::Network(format!(
                        "giving up on {} after {} rate-limited attempts",
                        url, retries
                    )));
                }
                let delay = retry_after(response.headers().get("Retry-After"))
                    .unwrap_or_else(|| backoff_delay(retries));
                warn!(
                    "rate limited by {}, retrying in {}s (attempt {}/{})",
                    url,
                    delay.as_secs(),
                    retries,
                    MAX_RETRIES
                );
                std::thread::sleep(delay);
                continue;
            }

            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(Error::Network(format!("too many redirects for {}", url)));
                }
                let location = response
                    .headers()
                    .get("Location")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        Error::Network(format!("redirect from {} without a Location", url))
                    })?;
                let target = resolve_location(&url, location)?;
                match status.as_u16() {
                    // 307/308 replay the request as-is
                    307 | 308 => {}
                    303 => {
                        method = Method::GET;
                        body = None;
                    }
                    _ => {
                        if method != Method::GET && method != Method::HEAD {
                            method = Method::GET;
                            body = None;
                        }
                    }
                }
                debug!("redirected to {}", target);
                url = target;
                continue;
            }

            let effective_url = response.url().to_string();
            let content_type = response
                .headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes()?.to_vec();

            if !status.is_success() {
                return Err(Error::Remote(format!(
                    "{} {} answered {}",
                    method, effective_url, status
                )));
            }

            return Ok(HttpResponse {
                status: status.as_u16(),
                url: effective_url,
                content_type,
                body: bytes,
            });
        }
    }
}

/// Client for reading and writing RDF documents over HTTP.
pub struct LinkedDataClient {
    transport: HttpTransport,
}

impl LinkedDataClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(LinkedDataClient {
            transport: HttpTransport::new(settings, DOCUMENT_TIMEOUT)?,
        })
    }

    /// Fetches an RDF document and parses it according to its content type.
    /// The effective URL is the base for resolving relative IRIs.
    pub fn get(&self, url: &str) -> Result<Graph> {
        let response = self.transport.execute(
            Method::GET,
            url,
            &[("Accept", codec::RDF_ACCEPT)],
            None,
        )?;
        let content_type = response
            .content_type
            .as_deref()
            .ok_or_else(|| Error::Codec(format!("{} answered without a content type", url)))?;
        let graph = codec::parse_content_type(&response.body, content_type, Some(&response.url))?;
        info!("fetched {} ({} triples)", url, graph.len());
        Ok(graph)
    }

    /// Appends the graph to the document with POST. Returns the response
    /// status and the effective URL.
    pub fn post(&self, url: &str, graph: &Graph) -> Result<(u16, String)> {
        let body = codec::graph_to_ntriples(graph).into_bytes();
        let response = self.transport.execute(
            Method::POST,
            url,
            &[("Accept", codec::N_TRIPLES)],
            Some((codec::N_TRIPLES, body)),
        )?;
        Ok((response.status, response.url))
    }

    /// Replaces the document with PUT. Returns the response status and the
    /// effective URL.
    pub fn put(&self, url: &str, graph: &Graph) -> Result<(u16, String)> {
        let body = codec::graph_to_ntriples(graph).into_bytes();
        let response = self.transport.execute(
            Method::PUT,
            url,
            &[("Accept", codec::N_TRIPLES)],
            Some((codec::N_TRIPLES, body)),
        )?;
        Ok((response.status, response.url))
    }

    /// Applies a SPARQL update to the document with PATCH.
    pub fn patch(&self, url: &str, update: &str) -> Result<(u16, String)> {
        let response = self.transport.execute(
            Method::PATCH,
            url,
            &[],
            Some(("application/sparql-update", update.as_bytes().to_vec())),
        )?;
        Ok((response.status, response.url))
    }

    /// Deletes the document.
    pub fn delete(&self, url: &str) -> Result<(u16, String)> {
        let response = self.transport.execute(Method::DELETE, url, &[], None)?;
        Ok((response.status, response.url))
    }
}

/// Client for the SPARQL 1.1 protocol.
pub struct SparqlClient {
    transport: HttpTransport,
}

impl SparqlClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(SparqlClient {
            transport: HttpTransport::new(settings, SPARQL_TIMEOUT)?,
        })
    }

    /// Executes a query, choosing the accept header by the parsed query
    /// form: solutions for SELECT/ASK, N-Triples for CONSTRUCT/DESCRIBE.
    pub fn query(&self, endpoint: &str, query: &str) -> Result<SparqlResponse> {
        use spargebra::Query;

        let parsed = Query::parse(query, None)
            .map_err(|e| Error::Codec(format!("invalid SPARQL query: {}", e)))?;
        let accept = match parsed {
            Query::Select { .. } | Query::Ask { .. } => "application/sparql-results+json",
            Query::Construct { .. } | Query::Describe { .. } => codec::N_TRIPLES,
        };

        let url = format!("{}?query={}", endpoint, urlencoding::encode(query));
        info!("querying {}", endpoint);
        let response = self
            .transport
            .execute(Method::GET, &url, &[("Accept", accept)], None)?;

        if accept == codec::N_TRIPLES {
            let graph = codec::parse_graph(
                &response.body,
                oxrdfio::RdfFormat::NTriples,
                Some(&response.url),
            )?;
            Ok(SparqlResponse::Graph(graph))
        } else {
            let doc: Json = serde_json::from_slice(&response.body)?;
            Ok(SparqlResponse::Solutions(SolutionTable::from_json(&doc)?))
        }
    }

    /// Executes a SPARQL update. Returns the response status and the
    /// effective URL.
    pub fn update(&self, endpoint: &str, update: &str) -> Result<(u16, String)> {
        info!("updating {}", endpoint);
        let response = self.transport.execute(
            Method::POST,
            endpoint,
            &[],
            Some(("application/sparql-update", update.as_bytes().to_vec())),
        )?;
        Ok((response.status, response.url))
    }
}

fn load_identity(path: &str, password: Option<&str>) -> Result<Identity> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Config(format!("cannot read client certificate {}: {}", path, e)))?;
    let identity = match password {
        // An encrypted bundle is expected to be PKCS#12
        Some(password) => Identity::from_pkcs12_der(&bytes, password),
        None => Identity::from_pkcs8_pem(&bytes, &bytes),
    };
    identity.map_err(|e| Error::Config(format!("cannot load client certificate {}: {}", path, e)))
}

/// Exponential backoff: 1, 2, 4, 8, 16, 32 seconds, capped at 60.
fn backoff_delay(retries: u32) -> Duration {
    let secs = 1u64
        .checked_shl(retries.saturating_sub(1))
        .unwrap_or(MAX_BACKOFF_SECS);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

/// Parses a `Retry-After` header: delta-seconds or an HTTP-date.
fn retry_after(header: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs.min(MAX_BACKOFF_SECS)));
    }
    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = (date.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_seconds();
    Some(Duration::from_secs((delta.max(0) as u64).min(MAX_BACKOFF_SECS)))
}

/// Resolves a `Location` header against the request URL.
fn resolve_location(base: &str, location: &str) -> Result<String> {
    let base = oxiri::Iri::parse(base.to_string())
        .map_err(|e| Error::Network(format!("invalid request URL {}: {}", base, e)))?;
    let resolved = base
        .resolve(location)
        .map_err(|e| Error::Network(format!("invalid redirect target {}: {}", location, e)))?;
    Ok(resolved.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_backoff_delay_caps_at_sixty() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(7), Duration::from_secs(60));
        assert_eq!(backoff_delay(40), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_seconds() {
        let header = HeaderValue::from_static("3");
        assert_eq!(retry_after(Some(&header)), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_retry_after_http_date_in_past() {
        let header = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(retry_after(Some(&header)), Some(Duration::from_secs(0)));
    }

    #[test]
    fn test_retry_after_garbage() {
        let header = HeaderValue::from_static("soon");
        assert_eq!(retry_after(Some(&header)), None);
    }

    #[test]
    fn test_resolve_location_relative() {
        let resolved = resolve_location("http://example.org/a/b", "../c").unwrap();
        assert_eq!(resolved, "http://example.org/c");
    }

    #[test]
    fn test_resolve_location_absolute() {
        let resolved = resolve_location("http://example.org/a", "https://other.example/x").unwrap();
        assert_eq!(resolved, "https://other.example/x");
    }
}
