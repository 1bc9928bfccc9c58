//! Redirection of open views away from just-unblocked domains
//!
//! When a session expires, views still sitting on a blocked page are moved to
//! a neutral destination. Enumeration failure aborts the whole batch (logged,
//! not retried); per-view failures are skipped individually.

use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use warden_host_api::ViewHost;
use warden_util::{host_matches, normalize_domain};

/// Fallback neutral destination when none is configured
pub const DEFAULT_REDIRECT_URL: &str = "https://www.google.com/";

pub struct Redirector {
    views: Arc<dyn ViewHost>,
    destination: String,
}

impl Redirector {
    pub fn new(views: Arc<dyn ViewHost>, destination: impl Into<String>) -> Self {
        Self {
            views,
            destination: destination.into(),
        }
    }

    /// Navigate every open view on one of `domains` (or a subdomain) to the
    /// neutral destination. No-op for an empty domain list.
    pub async fn redirect(&self, domains: &[String]) {
        if domains.is_empty() {
            return;
        }

        let targets: Vec<String> = domains.iter().map(|d| normalize_domain(d)).collect();

        let views = match self.views.list_views().await {
            Ok(views) => views,
            Err(e) => {
                warn!(error = %e, "View enumeration failed, skipping redirect");
                return;
            }
        };

        let mut moved = 0usize;
        for view in views {
            let Some(raw_url) = view.url else {
                continue;
            };

            let Some(host) = Url::parse(&raw_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
            else {
                continue;
            };

            if targets.iter().any(|target| host_matches(&host, target)) {
                match self.views.navigate(view.id, &self.destination).await {
                    Ok(()) => moved += 1,
                    Err(e) => {
                        debug!(view = %view.id, error = %e, "Failed to navigate view, skipping");
                    }
                }
            }
        }

        if moved > 0 {
            info!(count = moved, "Redirected views away from unblocked domains");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_api::ViewRef;
    use warden_host_api::MockViews;
    use warden_util::ViewId;

    fn view(id: u64, url: Option<&str>) -> ViewRef {
        ViewRef {
            id: ViewId::new(id),
            url: url.map(str::to_string),
        }
    }

    fn targets(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[tokio::test]
    async fn redirects_exact_and_subdomain_matches() {
        let views = Arc::new(MockViews::with_views(vec![
            view(1, Some("https://x.com/feed")),
            view(2, Some("https://mail.x.com/inbox")),
            view(3, Some("https://notx.com/")),
            view(4, Some("https://other.org/")),
        ]));
        let redirector = Redirector::new(views.clone(), DEFAULT_REDIRECT_URL);

        redirector.redirect(&targets(&["x.com"])).await;

        assert_eq!(
            views.navigated_views(),
            vec![ViewId::new(1), ViewId::new(2)]
        );
        let navigations = views.navigations.lock().unwrap();
        assert!(navigations.iter().all(|(_, url)| url == DEFAULT_REDIRECT_URL));
    }

    #[tokio::test]
    async fn empty_domain_list_is_a_noop() {
        let views = Arc::new(MockViews::with_views(vec![view(
            1,
            Some("https://x.com/"),
        )]));
        let redirector = Redirector::new(views.clone(), DEFAULT_REDIRECT_URL);

        redirector.redirect(&[]).await;

        assert!(views.navigated_views().is_empty());
    }

    #[tokio::test]
    async fn targets_are_normalized_before_matching() {
        let views = Arc::new(MockViews::with_views(vec![view(
            1,
            Some("https://www.example.com/"),
        )]));
        let redirector = Redirector::new(views.clone(), DEFAULT_REDIRECT_URL);

        redirector.redirect(&targets(&["www.Example.com"])).await;

        assert_eq!(views.navigated_views(), vec![ViewId::new(1)]);
    }

    #[tokio::test]
    async fn unparsable_urls_are_skipped() {
        let views = Arc::new(MockViews::with_views(vec![
            view(1, Some("not a url")),
            view(2, None),
            view(3, Some("https://x.com/")),
        ]));
        let redirector = Redirector::new(views.clone(), DEFAULT_REDIRECT_URL);

        redirector.redirect(&targets(&["x.com"])).await;

        assert_eq!(views.navigated_views(), vec![ViewId::new(3)]);
    }

    #[tokio::test]
    async fn enumeration_failure_aborts_batch() {
        let views = Arc::new(MockViews::with_views(vec![view(
            1,
            Some("https://x.com/"),
        )]));
        *views.fail_list.lock().unwrap() = true;
        let redirector = Redirector::new(views.clone(), DEFAULT_REDIRECT_URL);

        redirector.redirect(&targets(&["x.com"])).await;

        assert!(views.navigated_views().is_empty());
    }

    #[tokio::test]
    async fn per_view_failure_does_not_abort_batch() {
        let views = Arc::new(MockViews::with_views(vec![
            view(1, Some("https://x.com/")),
            view(2, Some("https://www.x.com/")),
        ]));
        views.fail_navigate.lock().unwrap().push(ViewId::new(1));
        let redirector = Redirector::new(views.clone(), DEFAULT_REDIRECT_URL);

        redirector.redirect(&targets(&["x.com"])).await;

        // View 1 failed and was skipped; view 2 still moved.
        assert_eq!(views.navigated_views(), vec![ViewId::new(2)]);
    }
}
