use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use url::Url;

use crate::domain::Job;
use crate::error::ClipsortError;
use crate::store::OutputLayout;

/// A backend able to fetch one URL into a local file.
///
/// Implementations must only create `destination` once the download is complete.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), ClipsortError>;
}

/// Host suffix match on the parsed URL: `instagram.com` also covers `www.instagram.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern(String);

impl HostPattern {
    pub fn new(domain: &str) -> Self {
        Self(domain.trim().trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.');
        host == self.0
            || host
                .strip_suffix(self.0.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

pub struct Route {
    name: &'static str,
    hosts: Vec<HostPattern>,
    downloader: Box<dyn Downloader>,
}

impl Route {
    pub fn new<D: Downloader + 'static>(
        name: &'static str,
        hosts: impl IntoIterator<Item = impl AsRef<str>>,
        downloader: D,
    ) -> Self {
        Self {
            name,
            hosts: hosts
                .into_iter()
                .map(|host| HostPattern::new(host.as_ref()))
                .collect(),
            downloader: Box::new(downloader),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn accepts(&self, host: &str) -> bool {
        self.hosts.iter().any(|pattern| pattern.matches(host))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Downloaded {
        adapter: &'static str,
        path: Utf8PathBuf,
    },
    Skipped {
        reason: String,
    },
    Failed {
        adapter: &'static str,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePlan {
    pub id: String,
    pub url: String,
    pub adapter: Option<&'static str>,
    pub destination: Utf8PathBuf,
}

/// Ordered route registry; the first route whose host pattern matches wins.
pub struct Dispatcher {
    layout: OutputLayout,
    routes: Vec<Route>,
}

impl Dispatcher {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            routes: Vec::new(),
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn route_for(&self, url: &str) -> Option<&Route> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        self.routes.iter().find(|route| route.accepts(host))
    }

    pub fn plan(&self, job: &Job) -> RoutePlan {
        RoutePlan {
            id: job.id.to_string(),
            url: job.url.clone(),
            adapter: self.route_for(&job.url).map(Route::name),
            destination: self.layout.video_path(job),
        }
    }

    /// Downloads one job. Adapter errors are logged and returned as `Failed`, never propagated.
    pub fn dispatch(&self, job: &Job) -> JobOutcome {
        let Some(route) = self.route_for(&job.url) else {
            tracing::warn!(id = %job.id, url = %job.url, "no downloader for url, skipping");
            return JobOutcome::Skipped {
                reason: format!("unrecognized url: {}", job.url),
            };
        };

        let destination = self.layout.video_path(job);
        tracing::debug!(id = %job.id, adapter = route.name, %destination, "dispatching");
        let start = Instant::now();
        match route.downloader.download(&job.url, &destination) {
            Ok(()) => {
                tracing::info!(
                    id = %job.id,
                    adapter = route.name,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "downloaded"
                );
                JobOutcome::Downloaded {
                    adapter: route.name,
                    path: destination,
                }
            }
            Err(err) => {
                tracing::warn!(id = %job.id, adapter = route.name, error = %err, "download failed");
                JobOutcome::Failed {
                    adapter: route.name,
                    error: err.to_string(),
                }
            }
        }
    }
}
