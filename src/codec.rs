//! RDF graph parsing and serialization
//!
//! N-Triples is the canonical wire form for request and response bodies;
//! Turtle, RDF/XML and JSON-LD are accepted on reads, negotiated by
//! `Content-Type`. Evaluated JSON-LD objects produced by the evaluator are
//! bridged into graphs here as well.

use oxrdf::{Graph, Triple};
use oxrdfio::{RdfFormat, RdfParser};
use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Accept header offered by the Linked Data GET operation.
pub const RDF_ACCEPT: &str =
    "application/n-triples, text/turtle, application/ld+json, application/rdf+xml";

/// Media type of the canonical request body serialization.
pub const N_TRIPLES: &str = "application/n-triples";

/// Maps a `Content-Type` header value to a parsable RDF format.
pub fn format_from_media_type(content_type: &str) -> Option<RdfFormat> {
    let essence = content_type.split(';').next()?.trim();
    RdfFormat::from_media_type(essence)
}

/// Parses an RDF document into a graph. Named graph components are dropped;
/// the expression language works on triples only.
pub fn parse_graph(data: &[u8], format: RdfFormat, base_iri: Option<&str>) -> Result<Graph> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base) = base_iri {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| Error::Codec(format!("invalid base IRI {}: {}", base, e)))?;
    }

    let mut graph = Graph::new();
    for quad in parser.for_reader(data) {
        let quad = quad?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

/// Parses a response body according to its `Content-Type`.
pub fn parse_content_type(data: &[u8], content_type: &str, base_iri: Option<&str>) -> Result<Graph> {
    let format = format_from_media_type(content_type)
        .ok_or_else(|| Error::Codec(format!("unsupported content type: {}", content_type)))?;
    parse_graph(data, format, base_iri)
}

/// Parses an evaluated JSON-LD object into a graph.
pub fn jsonld_to_graph(json: &Json, base_iri: Option<&str>) -> Result<Graph> {
    let data = serde_json::to_vec(json)?;
    parse_graph(
        &data,
        RdfFormat::JsonLd {
            profile: Default::default(),
        },
        base_iri,
    )
}

/// Serializes a graph as N-Triples.
pub fn graph_to_ntriples(graph: &Graph) -> String {
    let mut out = String::new();
    for triple in graph.iter() {
        out.push_str(&format!(
            "{} {} {} .\n",
            triple.subject, triple.predicate, triple.object
        ));
    }
    out
}
