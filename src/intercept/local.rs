//! In-process interception host.
//!
//! # Responsibilities
//! - Compile listener filters (reject patterns the grammar cannot express)
//! - Hold the listener table for lock-free dispatch
//! - Run matching listeners synchronously per request
//!
//! # Design Decisions
//! - Listener table lives in an `ArcSwap`: dispatch takes a snapshot,
//!   register/deregister publish a new table with `rcu`
//! - First listener returning a redirect wins

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

use crate::intercept::host::{
    BlockingResponse, HostError, InterceptCallback, InterceptionHost, ListenerHandle,
    RequestDetails, RequestFilter, ResourceType,
};
use crate::routing::PatternMatcher;

struct Listener {
    handle: ListenerHandle,
    patterns: Vec<PatternMatcher>,
    types: Vec<ResourceType>,
    callback: InterceptCallback,
}

impl Listener {
    fn wants(&self, url: &Url, resource_type: ResourceType) -> bool {
        self.types.contains(&resource_type) && self.patterns.iter().any(|p| p.matches(url))
    }
}

/// An [`InterceptionHost`] that dispatches requests handed to it directly.
pub struct LocalInterceptor {
    listeners: ArcSwap<Vec<Arc<Listener>>>,
    next_handle: AtomicU64,
    registrations: AtomicUsize,
}

impl LocalInterceptor {
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
            next_handle: AtomicU64::new(1),
            registrations: AtomicUsize::new(0),
        }
    }

    /// Run the request through every matching listener.
    pub fn dispatch(&self, details: &RequestDetails) -> BlockingResponse {
        let Ok(url) = Url::parse(&details.url) else {
            return BlockingResponse::pass();
        };

        let listeners = self.listeners.load();
        for listener in listeners.iter() {
            if !listener.wants(&url, details.resource_type) {
                continue;
            }
            let response = (listener.callback)(details);
            if response.is_redirect() {
                tracing::debug!(
                    request_id = details.request_id,
                    listener = %listener.handle,
                    "Listener redirected request"
                );
                return response;
            }
        }
        BlockingResponse::pass()
    }

    /// Number of callbacks currently registered.
    pub fn live_listeners(&self) -> usize {
        self.listeners.load().len()
    }

    /// Total successful registrations since creation.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::Relaxed)
    }
}

impl Default for LocalInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptionHost for LocalInterceptor {
    fn register(
        &self,
        callback: InterceptCallback,
        filter: RequestFilter,
    ) -> Result<ListenerHandle, HostError> {
        if filter.types.is_empty() {
            return Err(HostError::NoResourceTypes);
        }

        let patterns = filter
            .urls
            .iter()
            .map(|p| {
                PatternMatcher::compile(p).map_err(|source| HostError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let listener = Arc::new(Listener {
            handle,
            patterns,
            types: filter.types,
            callback,
        });

        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(listener.clone());
            next
        });
        self.registrations.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(listener = %handle, "Listener registered");
        Ok(handle)
    }

    fn deregister(&self, handle: ListenerHandle) -> bool {
        let previous = self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|l| l.handle != handle)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|l| l.handle == handle);
        if removed {
            tracing::debug!(listener = %handle, "Listener deregistered");
        }
        removed
    }

    fn is_registered(&self, handle: ListenerHandle) -> bool {
        self.listeners.load().iter().any(|l| l.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::normalize;

    fn filter(pattern: &str) -> RequestFilter {
        RequestFilter {
            urls: vec![normalize(pattern).unwrap()],
            types: ResourceType::DEFAULT_SET.to_vec(),
        }
    }

    fn request(url: &str, resource_type: ResourceType) -> RequestDetails {
        RequestDetails {
            request_id: 1,
            url: url.to_string(),
            resource_type,
        }
    }

    fn redirect_to(target: &'static str) -> InterceptCallback {
        Arc::new(move |_: &RequestDetails| BlockingResponse::redirect(target))
    }

    #[test]
    fn test_dispatch_respects_filter() {
        let host = LocalInterceptor::new();
        host.register(redirect_to("https://b.com/"), filter("a.com")).unwrap();

        let hit = host.dispatch(&request("https://www.a.com/", ResourceType::MainFrame));
        assert_eq!(hit.redirect_url.as_deref(), Some("https://b.com/"));

        let other_host = host.dispatch(&request("https://c.com/", ResourceType::MainFrame));
        assert!(!other_host.is_redirect());

        let other_type = host.dispatch(&request("https://a.com/", ResourceType::Image));
        assert!(!other_type.is_redirect());
    }

    #[test]
    fn test_register_and_deregister() {
        let host = LocalInterceptor::new();
        let handle = host.register(redirect_to("https://b.com/"), filter("*/*")).unwrap();
        assert!(host.is_registered(handle));
        assert_eq!(host.live_listeners(), 1);

        assert!(host.deregister(handle));
        assert!(!host.deregister(handle));
        assert_eq!(host.live_listeners(), 0);
        assert_eq!(host.registrations(), 1);
    }

    #[test]
    fn test_rejects_invalid_filters() {
        let host = LocalInterceptor::new();
        let err = host.register(redirect_to("https://b.com/"), filter("localhost")).unwrap_err();
        assert!(matches!(err, HostError::InvalidPattern { .. }));

        let empty = RequestFilter {
            urls: vec![normalize("*/*").unwrap()],
            types: Vec::new(),
        };
        assert!(matches!(
            host.register(redirect_to("https://b.com/"), empty),
            Err(HostError::NoResourceTypes)
        ));
        assert_eq!(host.live_listeners(), 0);
    }
}
