//! Passive descriptions of HTTP calls and how they resolve to requests.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use super::error::{NetworkError, TransportError};
use super::transport::HttpRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
  Get,
  Head,
  Post,
  Put,
  Patch,
  Delete,
}

impl HttpMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Get => "GET",
      Self::Head => "HEAD",
      Self::Post => "POST",
      Self::Put => "PUT",
      Self::Patch => "PATCH",
      Self::Delete => "DELETE",
    }
  }
}

impl From<HttpMethod> for reqwest::Method {
  fn from(method: HttpMethod) -> Self {
    match method {
      HttpMethod::Get => Self::GET,
      HttpMethod::Head => Self::HEAD,
      HttpMethod::Post => Self::POST,
      HttpMethod::Put => Self::PUT,
      HttpMethod::Patch => Self::PATCH,
      HttpMethod::Delete => Self::DELETE,
    }
  }
}

/// Where request parameters end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterEncoding {
  /// Appended to the URL as `key=value` pairs
  QueryString,
  /// Serialized as a JSON object body
  JsonBody,
}

impl ParameterEncoding {
  /// Query string for GET-like methods, JSON body for everything else.
  pub fn for_method(method: HttpMethod) -> Self {
    match method {
      HttpMethod::Get | HttpMethod::Head => Self::QueryString,
      _ => Self::JsonBody,
    }
  }
}

/// Request parameters, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(Vec<(String, Value)>);

impl Parameters {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set `key`, replacing an earlier value in place.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    let key = key.into();
    let value = value.into();
    match self.0.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = value,
      None => self.0.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Flatten into query pairs. Arrays become `key[]`, objects `key[sub]`.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in &self.0 {
      flatten_query(key, value, &mut pairs);
    }
    pairs
  }

  pub fn to_json(&self) -> Value {
    Value::Object(self.0.iter().cloned().collect())
  }
}

fn flatten_query(key: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
  match value {
    Value::Null => pairs.push((key.to_string(), String::new())),
    Value::String(s) => pairs.push((key.to_string(), s.clone())),
    Value::Bool(_) | Value::Number(_) => pairs.push((key.to_string(), value.to_string())),
    Value::Array(items) => {
      let nested = format!("{}[]", key);
      for item in items {
        flatten_query(&nested, item, pairs);
      }
    }
    Value::Object(fields) => {
      for (sub, item) in fields {
        flatten_query(&format!("{}[{}]", key, sub), item, pairs);
      }
    }
  }
}

/// URL of a request: relative to the configured base, or absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
  Path(String),
  Absolute(String),
}

/// Immutable description of one logical HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
  target: RequestTarget,
  method: HttpMethod,
  parameters: Option<Parameters>,
  headers: BTreeMap<String, String>,
  encoding: ParameterEncoding,
}

impl RequestDescriptor {
  /// A call to `path` under the base URL, with default headers and encoding.
  pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
    Self {
      target: RequestTarget::Path(path.into()),
      method,
      parameters: None,
      headers: default_headers(),
      encoding: ParameterEncoding::for_method(method),
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(HttpMethod::Get, path)
  }

  /// A GET to a full URL that ignores the base URL.
  pub fn absolute(url: impl Into<String>) -> Self {
    Self {
      target: RequestTarget::Absolute(url.into()),
      ..Self::get("")
    }
  }

  pub fn with_method(mut self, method: HttpMethod) -> Self {
    self.method = method;
    self
  }

  pub fn with_parameters(mut self, parameters: Parameters) -> Self {
    self.parameters = Some(parameters);
    self
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(name.into(), value.into());
    self
  }

  pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
    self.headers = headers;
    self
  }

  pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
    self.encoding = encoding;
    self
  }

  pub fn target(&self) -> &RequestTarget {
    &self.target
  }

  pub fn method(&self) -> HttpMethod {
    self.method
  }

  pub fn parameters(&self) -> Option<&Parameters> {
    self.parameters.as_ref()
  }

  pub fn headers(&self) -> &BTreeMap<String, String> {
    &self.headers
  }

  pub fn encoding(&self) -> ParameterEncoding {
    self.encoding
  }

  /// The unencoded URL string for this call.
  pub fn url(&self, base_url: &str) -> String {
    match &self.target {
      RequestTarget::Path(path) => format!("{}{}", base_url, path),
      RequestTarget::Absolute(url) => url.clone(),
    }
  }

  /// Resolve against `base_url` into a request a transport can send.
  pub fn to_http_request(&self, base_url: &str) -> Result<HttpRequest, NetworkError> {
    let mut url = Url::parse(&self.url(base_url)).map_err(|_| NetworkError::InvalidUrl)?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
      return Err(NetworkError::InvalidUrl);
    }

    let mut headers = HeaderMap::new();
    for (name, value) in &self.headers {
      let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
      let value = HeaderValue::from_str(value)
        .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
      headers.insert(name, value);
    }

    let mut body = None;
    if let Some(parameters) = self.parameters.as_ref().filter(|p| !p.is_empty()) {
      match self.encoding {
        ParameterEncoding::QueryString => {
          let mut query = url.query_pairs_mut();
          for (key, value) in parameters.query_pairs() {
            query.append_pair(&key, &value);
          }
        }
        ParameterEncoding::JsonBody => {
          let bytes = serde_json::to_vec(&parameters.to_json())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
          body = Some(bytes);
        }
      }
    }

    Ok(HttpRequest {
      method: self.method,
      url,
      headers,
      body,
    })
  }
}

fn default_headers() -> BTreeMap<String, String> {
  BTreeMap::from([
    ("Accept".to_string(), "application/json".to_string()),
    ("Content-Type".to_string(), "application/json".to_string()),
  ])
}

/// Something that can describe itself as a [`RequestDescriptor`].
///
/// Only `path` and `method` are required; the rest default to no parameters,
/// JSON headers, method-based encoding and a URL under the base.
pub trait Endpoint {
  fn path(&self) -> String;

  fn method(&self) -> HttpMethod;

  fn parameters(&self) -> Option<Parameters> {
    None
  }

  fn encoding(&self) -> ParameterEncoding {
    ParameterEncoding::for_method(self.method())
  }

  fn headers(&self) -> BTreeMap<String, String> {
    default_headers()
  }

  /// A full URL that replaces `base_url + path`.
  fn absolute_url(&self) -> Option<String> {
    None
  }

  fn descriptor(&self) -> RequestDescriptor {
    let target = match self.absolute_url() {
      Some(url) => RequestTarget::Absolute(url),
      None => RequestTarget::Path(self.path()),
    };

    RequestDescriptor {
      target,
      method: self.method(),
      parameters: self.parameters(),
      headers: self.headers(),
      encoding: self.encoding(),
    }
  }
}

impl Endpoint for RequestDescriptor {
  fn path(&self) -> String {
    match &self.target {
      RequestTarget::Path(path) => path.clone(),
      RequestTarget::Absolute(_) => String::new(),
    }
  }

  fn method(&self) -> HttpMethod {
    self.method
  }

  fn descriptor(&self) -> RequestDescriptor {
    self.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = "https://pokeapi.co/api/v2";

  #[test]
  fn test_path_resolves_against_base() {
    let descriptor = RequestDescriptor::get("/pokemon/25");
    assert_eq!(descriptor.url(BASE), "https://pokeapi.co/api/v2/pokemon/25");
  }

  #[test]
  fn test_absolute_target_ignores_base() {
    let descriptor = RequestDescriptor::absolute("https://example.com/pokemon/1/");
    assert_eq!(descriptor.url(BASE), "https://example.com/pokemon/1/");

    let request = descriptor.to_http_request("not even a url").expect("request");
    assert_eq!(request.url.as_str(), "https://example.com/pokemon/1/");
  }

  #[test]
  fn test_encoding_follows_method() {
    assert_eq!(RequestDescriptor::get("/").encoding(), ParameterEncoding::QueryString);
    assert_eq!(
      RequestDescriptor::new(HttpMethod::Post, "/").encoding(),
      ParameterEncoding::JsonBody
    );
    assert_eq!(
      ParameterEncoding::for_method(HttpMethod::Delete),
      ParameterEncoding::JsonBody
    );
  }

  #[test]
  fn test_get_parameters_go_to_query_in_order() {
    let descriptor = RequestDescriptor::get("/pokemon")
      .with_parameters(Parameters::new().with("offset", 40).with("limit", 20));

    let request = descriptor.to_http_request(BASE).expect("request");

    assert_eq!(request.url.query(), Some("offset=40&limit=20"));
    assert!(request.body.is_none());
  }

  #[test]
  fn test_post_parameters_go_to_json_body_in_order() {
    let descriptor = RequestDescriptor::new(HttpMethod::Post, "/favorites").with_parameters(
      Parameters::new()
        .with("offset", 0)
        .with("limit", 20)
        .with("filter", serde_json::json!({ "type": "electric", "gen": 1 })),
    );

    let request = descriptor.to_http_request(BASE).expect("request");

    assert_eq!(request.url.query(), None);
    let body = String::from_utf8(request.body.expect("body")).expect("utf8");
    assert_eq!(
      body,
      r#"{"offset":0,"limit":20,"filter":{"type":"electric","gen":1}}"#
    );
  }

  #[test]
  fn test_encoding_override_wins_over_method_default() {
    let as_body = RequestDescriptor::get("/search")
      .with_parameters(Parameters::new().with("q", "pika"))
      .with_encoding(ParameterEncoding::JsonBody)
      .to_http_request(BASE)
      .expect("request");
    assert_eq!(as_body.url.query(), None);
    assert_eq!(as_body.body.as_deref(), Some(br#"{"q":"pika"}"#.as_slice()));

    let as_query = RequestDescriptor::new(HttpMethod::Delete, "/favorites")
      .with_parameters(Parameters::new().with("id", 25))
      .with_encoding(ParameterEncoding::QueryString)
      .to_http_request(BASE)
      .expect("request");
    assert_eq!(as_query.url.query(), Some("id=25"));
    assert!(as_query.body.is_none());
  }

  #[test]
  fn test_with_method_keeps_encoding() {
    let descriptor = RequestDescriptor::get("/favorites").with_method(HttpMethod::Put);

    assert_eq!(descriptor.method(), HttpMethod::Put);
    assert_eq!(descriptor.encoding(), ParameterEncoding::QueryString);
    let request = descriptor.to_http_request(BASE).expect("request");
    assert_eq!(request.method, HttpMethod::Put);
  }

  #[test]
  fn test_with_headers_replaces_defaults() {
    let headers = BTreeMap::from([("X-Trainer".to_string(), "ash".to_string())]);
    let request = RequestDescriptor::get("/pokemon")
      .with_headers(headers)
      .to_http_request(BASE)
      .expect("request");

    assert_eq!(request.headers["x-trainer"], "ash");
    assert!(request.headers.get("content-type").is_none());
    assert_eq!(request.headers.len(), 1);
  }

  #[test]
  fn test_query_flattening() {
    let params = Parameters::new()
      .with("types", serde_json::json!(["electric", "fairy"]))
      .with("filter", serde_json::json!({ "gen": 1 }))
      .with("shiny", true);

    assert_eq!(
      params.query_pairs(),
      vec![
        ("types[]".to_string(), "electric".to_string()),
        ("types[]".to_string(), "fairy".to_string()),
        ("filter[gen]".to_string(), "1".to_string()),
        ("shiny".to_string(), "true".to_string()),
      ]
    );
  }

  #[test]
  fn test_insert_replaces_in_place() {
    let params = Parameters::new()
      .with("a", 1)
      .with("b", 2)
      .with("a", 3);

    let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(params.get("a"), Some(&Value::from(3)));
  }

  #[test]
  fn test_default_headers_are_json() {
    let request = RequestDescriptor::get("/pokemon").to_http_request(BASE).expect("request");
    assert_eq!(request.headers["accept"], "application/json");
    assert_eq!(request.headers["content-type"], "application/json");
  }

  #[test]
  fn test_malformed_url_is_invalid_url() {
    let err = RequestDescriptor::get("/pokemon")
      .to_http_request("pokeapi without scheme")
      .expect_err("should fail");
    assert!(matches!(err, NetworkError::InvalidUrl));
  }

  #[test]
  fn test_bad_header_is_invalid_request() {
    let err = RequestDescriptor::get("/pokemon")
      .with_header("bad header", "x")
      .to_http_request(BASE)
      .expect_err("should fail");
    assert!(matches!(
      err,
      NetworkError::Network(TransportError::InvalidRequest(_))
    ));
  }
}
