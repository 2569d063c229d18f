//! Runtime-independent description of an intercepted request.
//!
//! Strategies and routes only ever see a [`RequestDescriptor`]; the HTTP
//! front builds one from `Sec-Fetch-*` headers, tests build them by hand.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::url::canonicalize;

/// What the page intends to do with the response (`Sec-Fetch-Dest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// `fetch()`/XHR and anything the browser did not classify.
    #[default]
    Empty,
    Audio,
    Document,
    Embed,
    Font,
    Frame,
    Iframe,
    Image,
    Manifest,
    Object,
    Script,
    Style,
    Track,
    Video,
    Worker,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` value. Unknown values map to [`Destination::Empty`].
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "audio" => Destination::Audio,
            "document" => Destination::Document,
            "embed" => Destination::Embed,
            "font" => Destination::Font,
            "frame" => Destination::Frame,
            "iframe" => Destination::Iframe,
            "image" => Destination::Image,
            "manifest" => Destination::Manifest,
            "object" => Destination::Object,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "track" => Destination::Track,
            "video" => Destination::Video,
            "worker" | "sharedworker" | "serviceworker" => Destination::Worker,
            _ => Destination::Empty,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Empty => "",
            Destination::Audio => "audio",
            Destination::Document => "document",
            Destination::Embed => "embed",
            Destination::Font => "font",
            Destination::Frame => "frame",
            Destination::Iframe => "iframe",
            Destination::Image => "image",
            Destination::Manifest => "manifest",
            Destination::Object => "object",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Track => "track",
            Destination::Video => "video",
            Destination::Worker => "worker",
        }
    }
}

/// Request mode (`Sec-Fetch-Mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

impl RequestMode {
    /// Parse a `Sec-Fetch-Mode` value. Unknown values map to [`RequestMode::Cors`].
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => RequestMode::Navigate,
            "same-origin" => RequestMode::SameOrigin,
            "no-cors" => RequestMode::NoCors,
            _ => RequestMode::Cors,
        }
    }
}

/// An intercepted request, reduced to what routing and caching need.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Upper-case HTTP method.
    pub method: String,
    /// Canonical absolute URL.
    pub url: url::Url,
    pub destination: Destination,
    pub mode: RequestMode,
    /// Headers forwarded to the network, in arrival order.
    pub headers: Vec<(String, String)>,
    /// Request body, only meaningful for non-GET requests.
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Build a descriptor for `method url` with default destination and mode.
    pub fn new(method: &str, url: &str) -> Result<Self, Error> {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }

        Ok(Self {
            method: method.trim().to_ascii_uppercase(),
            url: canonicalize(url)?,
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            headers: Vec::new(),
            body: None,
        })
    }

    /// A plain `GET` request, as issued by `fetch(url)`.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url)
    }

    /// A top-level navigation to `url`.
    pub fn navigate(url: &str) -> Result<Self, Error> {
        Ok(Self::get(url)?
            .with_mode(RequestMode::Navigate)
            .with_destination(Destination::Document))
    }

    /// An `<img>` load of `url`.
    pub fn image(url: &str) -> Result<Self, Error> {
        Ok(Self::get(url)?
            .with_mode(RequestMode::NoCors)
            .with_destination(Destination::Image))
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}
