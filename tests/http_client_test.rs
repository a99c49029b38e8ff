//! HTTP Client Integration Tests
//!
//! Tests for the Linked Data and SPARQL clients against a canned-response
//! TCP fixture: content negotiation, redirect handling, rate-limit retries,
//! and the SPARQL protocol encoding.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use oxrdf::{Graph, Literal, NamedNode, NamedOrBlankNodeRef, Triple};
use web_algebra::client::{LinkedDataClient, SparqlClient, SparqlResponse};
use web_algebra::{Error, Settings};

struct RecordedRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap().to_string();
    let path = parts.next().unwrap().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let content_length: usize = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();

    RecordedRequest {
        method,
        path,
        headers,
        body,
    }
}

fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut response = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    response.push_str("Connection: close\r\n\r\n");
    let mut bytes = response.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Serves one canned response per incoming connection and records every
/// request.
fn serve(responses: Vec<Vec<u8>>) -> (String, mpsc::Receiver<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            tx.send(request).unwrap();
            stream.write_all(&response).unwrap();
            stream.flush().unwrap();
        }
    });

    (base_url, rx)
}

fn single_triple_graph(subject: &str) -> Graph {
    let mut graph = Graph::new();
    graph.insert(&Triple::new(
        NamedNode::new_unchecked(subject),
        NamedNode::new_unchecked("http://example.org/p"),
        Literal::new_simple_literal("v"),
    ));
    graph
}

const NTRIPLES_BODY: &[u8] =
    b"<http://example.org/s> <http://example.org/p> \"v\" .\n";

#[test]
fn test_get_negotiates_and_parses_by_content_type() {
    let (base_url, rx) = serve(vec![http_response(
        "200 OK",
        &[("Content-Type", "text/turtle")],
        b"<> <http://example.org/p> \"v\" .\n",
    )]);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let url = format!("{}/doc", base_url);
    let graph = client.get(&url).unwrap();

    // The response is parsed with the request URI as base
    assert_eq!(graph.len(), 1);
    let subject = NamedNode::new_unchecked(&url);
    assert!(graph
        .iter()
        .any(|t| t.subject == NamedOrBlankNodeRef::NamedNode(subject.as_ref())));

    let request = rx.recv().unwrap();
    assert_eq!(request.method, "GET");
    let accept = request.header("Accept").unwrap();
    for media_type in [
        "application/n-triples",
        "text/turtle",
        "application/ld+json",
        "application/rdf+xml",
    ] {
        assert!(accept.contains(media_type), "Accept misses {}", media_type);
    }
}

#[test]
fn test_retry_on_429_then_success() {
    let (base_url, rx) = serve(vec![
        http_response("429 Too Many Requests", &[("Retry-After", "0")], b""),
        http_response("429 Too Many Requests", &[("Retry-After", "0")], b""),
        http_response(
            "200 OK",
            &[("Content-Type", "application/n-triples")],
            NTRIPLES_BODY,
        ),
    ]);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let graph = client.get(&format!("{}/doc", base_url)).unwrap();
    assert_eq!(graph.len(), 1);

    // One observable success; attempts = number of 429 answers + 1
    let requests: Vec<RecordedRequest> = rx.try_iter().collect();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.method == "GET"));
}

#[test]
fn test_429_gives_up_after_retry_cap() {
    let responses = (0..6)
        .map(|_| http_response("429 Too Many Requests", &[("Retry-After", "0")], b""))
        .collect();
    let (base_url, rx) = serve(responses);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let error = client.get(&format!("{}/doc", base_url)).unwrap_err();
    assert!(matches!(error, Error::Network(_)));

    let requests: Vec<RecordedRequest> = rx.try_iter().collect();
    assert_eq!(requests.len(), 6);
}

#[test]
fn test_redirect_308_preserves_method_and_body() {
    let (base_url, rx) = serve(vec![
        http_response("308 Permanent Redirect", &[("Location", "/other")], b""),
        http_response("201 Created", &[], b""),
    ]);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let graph = single_triple_graph("http://example.org/s");
    let (status, effective_url) = client.post(&format!("{}/doc", base_url), &graph).unwrap();

    assert_eq!(status, 201);
    assert!(effective_url.ends_with("/other"));

    let requests: Vec<RecordedRequest> = rx.try_iter().collect();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/doc");
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/other");
    // The body is replayed on the redirected request
    assert_eq!(requests[0].body, requests[1].body);
    assert!(!requests[1].body.is_empty());
    assert_eq!(
        requests[1].header("Content-Type"),
        Some("application/n-triples")
    );
}

#[test]
fn test_redirect_303_becomes_get() {
    let (base_url, rx) = serve(vec![
        http_response("303 See Other", &[("Location", "/created")], b""),
        http_response(
            "200 OK",
            &[("Content-Type", "application/n-triples")],
            NTRIPLES_BODY,
        ),
    ]);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let graph = single_triple_graph("http://example.org/s");
    let (status, _) = client.post(&format!("{}/doc", base_url), &graph).unwrap();
    assert_eq!(status, 200);

    let requests: Vec<RecordedRequest> = rx.try_iter().collect();
    assert_eq!(requests[1].method, "GET");
    assert!(requests[1].body.is_empty());
}

#[test]
fn test_delete_reports_status_and_url() {
    let (base_url, rx) = serve(vec![http_response("204 No Content", &[], b"")]);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let url = format!("{}/doc", base_url);
    let (status, effective_url) = client.delete(&url).unwrap();

    assert_eq!(status, 204);
    assert_eq!(effective_url, url);
    let request = rx.recv().unwrap();
    assert_eq!(request.method, "DELETE");
}

#[test]
fn test_non_2xx_is_a_remote_error() {
    let (base_url, _rx) = serve(vec![http_response("404 Not Found", &[], b"gone")]);

    let client = LinkedDataClient::new(&Settings::new()).unwrap();
    let error = client.get(&format!("{}/doc", base_url)).unwrap_err();
    assert!(matches!(error, Error::Remote(_)));
    assert!(error.to_string().contains("404"));
}

#[test]
fn test_sparql_select_requests_results_json() {
    let body = serde_json::json!({
        "head": {"vars": ["s"]},
        "results": {"bindings": [
            {"s": {"type": "uri", "value": "http://example.org/a"}},
            {"s": {"type": "uri", "value": "http://example.org/b"}}
        ]}
    })
    .to_string();
    let (base_url, rx) = serve(vec![http_response(
        "200 OK",
        &[("Content-Type", "application/sparql-results+json")],
        body.as_bytes(),
    )]);

    let client = SparqlClient::new(&Settings::new()).unwrap();
    let response = client
        .query(&base_url, "SELECT * WHERE { ?s ?p ?o }")
        .unwrap();

    let SparqlResponse::Solutions(table) = response else {
        panic!("expected solutions");
    };
    assert_eq!(table.len(), 2);
    assert_eq!(table.vars(), &["s".to_string()]);

    let request = rx.recv().unwrap();
    assert_eq!(request.method, "GET");
    assert!(request.path.contains("query=SELECT"));
    assert_eq!(
        request.header("Accept"),
        Some("application/sparql-results+json")
    );
}

#[test]
fn test_sparql_construct_requests_ntriples() {
    let (base_url, rx) = serve(vec![http_response(
        "200 OK",
        &[("Content-Type", "application/n-triples")],
        NTRIPLES_BODY,
    )]);

    let client = SparqlClient::new(&Settings::new()).unwrap();
    let response = client
        .query(&base_url, "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }")
        .unwrap();

    let SparqlResponse::Graph(graph) = response else {
        panic!("expected a graph");
    };
    assert_eq!(graph.len(), 1);

    let request = rx.recv().unwrap();
    assert_eq!(request.header("Accept"), Some("application/n-triples"));
}

#[test]
fn test_sparql_update_posts_body() {
    let (base_url, rx) = serve(vec![http_response("204 No Content", &[], b"")]);

    let update = "INSERT DATA { <http://example.org/s> <http://example.org/p> \"v\" }";
    let client = SparqlClient::new(&Settings::new()).unwrap();
    let (status, _) = client.update(&base_url, update).unwrap();
    assert_eq!(status, 204);

    let request = rx.recv().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.header("Content-Type"),
        Some("application/sparql-update")
    );
    assert_eq!(request.body, update.as_bytes());
}

#[test]
fn test_program_drives_select_and_iterates_rows() {
    // Full pipeline: the evaluator dispatches SELECT, the client fetches
    // solutions, ForEach iterates the rows, Value projects a binding
    let body = serde_json::json!({
        "head": {"vars": ["name"]},
        "results": {"bindings": [
            {"name": {"type": "literal", "value": "Alice"}},
            {"name": {"type": "literal", "value": "Bob"}}
        ]}
    })
    .to_string();
    let (base_url, _rx) = serve(vec![http_response(
        "200 OK",
        &[("Content-Type", "application/sparql-results+json")],
        body.as_bytes(),
    )]);

    let program = serde_json::json!({"@op": "ForEach", "args": {
        "select": {"@op": "SELECT", "args": {
            "endpoint": {"type": "uri", "value": base_url},
            "query": "SELECT ?name WHERE { ?person <http://xmlns.com/foaf/0.1/name> ?name }"
        }},
        "operation": {"@op": "Value", "args": {"name": "name"}}
    }});

    let evaluator = web_algebra::Evaluator::new(Settings::new());
    let value = evaluator.evaluate(&program).unwrap();

    let web_algebra::Value::List(items) = value else {
        panic!("expected a list");
    };
    let names: Vec<String> = items
        .iter()
        .map(|item| match item {
            web_algebra::Value::Term(oxrdf::Term::Literal(literal)) => {
                literal.value().to_string()
            }
            other => panic!("expected a literal, got {}", other.type_name()),
        })
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[test]
fn test_invalid_query_fails_before_any_request() {
    let client = SparqlClient::new(&Settings::new()).unwrap();
    let error = client
        .query("http://127.0.0.1:1", "NOT A SPARQL QUERY")
        .unwrap_err();
    assert!(matches!(error, Error::Codec(_)));
}
