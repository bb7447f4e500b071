use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::watch;
use uuid::Uuid;

use crate::{Error, FolioService, Result, facets::Facet, request::Pagination, translate::ParsedQuery};

/// One complete refresh result. Never modified after publication.
#[derive(Debug, Clone, Default)]
pub struct FacetSnapshot {
	facets: Vec<Facet>,
	by_id: HashMap<String, usize>,
}
impl FacetSnapshot {
	pub fn new(facets: Vec<Facet>) -> Self {
		let by_id = facets.iter().enumerate().map(|(index, facet)| (facet.id.clone(), index)).collect();

		Self { facets, by_id }
	}

	pub fn facets(&self) -> &[Facet] {
		&self.facets
	}

	pub fn get(&self, id: &str) -> Option<&Facet> {
		self.by_id.get(id).map(|index| &self.facets[*index])
	}
}

/// Single-writer, many-reader holder of the current snapshot.
///
/// The refresher builds a replacement off to the side and swaps it in whole; readers clone the
/// `Arc` they find and keep a consistent view for as long as they hold it.
#[derive(Clone)]
pub struct FacetCache {
	current: Arc<watch::Sender<Option<Arc<FacetSnapshot>>>>,
}
impl FacetCache {
	pub fn new() -> Self {
		let (current, _) = watch::channel(None);

		Self { current: Arc::new(current) }
	}

	/// The channel's read guard is held only while the `Arc` is cloned.
	pub fn snapshot(&self) -> Result<Arc<FacetSnapshot>> {
		self.current.borrow().clone().ok_or(Error::NotCached)
	}

	pub fn publish(&self, snapshot: FacetSnapshot) {
		self.current.send_replace(Some(Arc::new(snapshot)));
	}

	/// The requested facets that exist in the snapshot, in request order. Unknown ids are
	/// omitted; an empty request returns every facet.
	pub fn get_facets(&self, ids: &[String]) -> Result<Vec<Facet>> {
		let snapshot = self.snapshot()?;

		if ids.is_empty() {
			return Ok(snapshot.facets().to_vec());
		}

		Ok(ids.iter().filter_map(|id| snapshot.get(id)).cloned().collect())
	}

	pub fn subscribe(&self) -> watch::Receiver<Option<Arc<FacetSnapshot>>> {
		self.current.subscribe()
	}
}
impl Default for FacetCache {
	fn default() -> Self {
		Self::new()
	}
}

impl FolioService {
	/// Runs one broad faceted query and publishes the result. On failure the previous snapshot
	/// stays in place.
	pub async fn refresh_facet_cache(&self) -> Result<usize> {
		let request_id = Uuid::new_v4();
		let parsed = ParsedQuery::match_all();
		let aggregate = self
			.run_primary(crate::search::PrimaryArgs {
				request_id,
				parsed: &parsed,
				pagination: Pagination::default(),
				sort: None,
				filter_group: None,
				authenticated: false,
				grouped: false,
				facets: true,
				count_only: true,
				populating_cache: true,
			})
			.await?;
		let snapshot = FacetSnapshot::new(aggregate.facets.unwrap_or_default());
		let count = snapshot.facets().len();

		self.facet_cache.publish(snapshot);

		Ok(count)
	}

	pub fn presearch_facets(&self, ids: &[String]) -> Result<Vec<Facet>> {
		self.facet_cache.get_facets(ids)
	}
}

/// Background refresh loop; runs for the life of the process.
pub async fn run_facet_cache(service: Arc<FolioService>) {
	let delay = Duration::from_millis(service.cfg.facet_cache.startup_delay_ms);
	let interval = Duration::from_millis(service.cfg.facet_cache.refresh_interval_ms);

	if !delay.is_zero() {
		tokio::time::sleep(delay).await;
	}

	loop {
		match service.refresh_facet_cache().await {
			Ok(count) => tracing::info!(facets = count, "Facet cache refreshed."),
			Err(err) => tracing::error!(
				error = %err,
				"Facet cache refresh failed. Keeping the previous snapshot."
			),
		}

		tokio::time::sleep(interval).await;
	}
}
