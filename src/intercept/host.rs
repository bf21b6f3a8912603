//! Host interception facility contract.
//!
//! The host owns the network stack. It calls each registered callback
//! synchronously for every request matching the callback's filter and
//! blocks the request until the callback returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::routing::{MatchPattern, PatternError};

/// Request categories a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Xmlhttprequest,
    Fetch,
    Script,
    Stylesheet,
    Image,
    Other,
}

impl ResourceType {
    /// Document navigations and data fetches.
    pub const DEFAULT_SET: [ResourceType; 4] = [
        ResourceType::MainFrame,
        ResourceType::SubFrame,
        ResourceType::Xmlhttprequest,
        ResourceType::Fetch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::MainFrame => "main_frame",
            ResourceType::SubFrame => "sub_frame",
            ResourceType::Xmlhttprequest => "xmlhttprequest",
            ResourceType::Fetch => "fetch",
            ResourceType::Script => "script",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Image => "image",
            ResourceType::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main_frame" => Ok(ResourceType::MainFrame),
            "sub_frame" => Ok(ResourceType::SubFrame),
            "xmlhttprequest" => Ok(ResourceType::Xmlhttprequest),
            "fetch" => Ok(ResourceType::Fetch),
            "script" => Ok(ResourceType::Script),
            "stylesheet" => Ok(ResourceType::Stylesheet),
            "image" => Ok(ResourceType::Image),
            "other" => Ok(ResourceType::Other),
            other => Err(format!("unknown resource type {other:?}")),
        }
    }
}

/// Which requests a listener observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    pub urls: Vec<MatchPattern>,
    pub types: Vec<ResourceType>,
}

/// What the host tells a listener about a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub request_id: u64,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// A listener's verdict: `{}` lets the request through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl BlockingResponse {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            redirect_url: Some(url.into()),
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_url.is_some()
    }
}

/// Per-request callback. Must return without blocking or awaiting.
pub type InterceptCallback = Arc<dyn Fn(&RequestDetails) -> BlockingResponse + Send + Sync>;

/// Token identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub(crate) u64);

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host rejected match pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: MatchPattern,
        #[source]
        source: PatternError,
    },

    #[error("filter has no resource types")]
    NoResourceTypes,
}

/// Registration API of the network interception facility.
///
/// Every registration is blocking: the host waits for the callback's verdict.
pub trait InterceptionHost: Send + Sync {
    fn register(
        &self,
        callback: InterceptCallback,
        filter: RequestFilter,
    ) -> Result<ListenerHandle, HostError>;

    /// Remove a registration. Returns false if it was not registered.
    fn deregister(&self, handle: ListenerHandle) -> bool;

    fn is_registered(&self, handle: ListenerHandle) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_response_wire_shape() {
        assert_eq!(serde_json::to_string(&BlockingResponse::pass()).unwrap(), "{}");
        assert_eq!(
            serde_json::to_string(&BlockingResponse::redirect("https://a.com/?q=2")).unwrap(),
            r#"{"redirectUrl":"https://a.com/?q=2"}"#
        );
    }

    #[test]
    fn test_resource_type_names() {
        for t in ResourceType::DEFAULT_SET {
            assert_eq!(t.as_str().parse::<ResourceType>().unwrap(), t);
        }
        let json = serde_json::to_string(&ResourceType::MainFrame).unwrap();
        assert_eq!(json, "\"main_frame\"");
        assert!("websocket".parse::<ResourceType>().is_err());
    }
}
