// orgscan-core/src/application/orchestrator.rs

use futures::future::{BoxFuture, FutureExt, Shared, try_join_all};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::application::api::ApiAccess;
use crate::application::cache::DataCache;
use crate::application::factory::DataFactory;
use crate::application::ports::{Dataset, DatasetContext, DatasetResults};
use crate::domain::dataset::{DatasetIdentity, DatasetValue};
use crate::error::OrgScanError;

type FetchResult = Result<Arc<DatasetValue>, Arc<OrgScanError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

type InFlightTable = Arc<Mutex<HashMap<String, InFlight>>>;

/// Serves datasets from the cache or from their extraction unit, with at most
/// one fetch per cache key for the lifetime of the orchestrator. Successful
/// fetches stay in the in-flight table until `clean`; failed ones leave it as
/// soon as they complete so that the next `run` starts over.
pub struct DatasetOrchestrator {
    datasets: HashMap<&'static str, Arc<dyn Dataset>>,
    api: Arc<ApiAccess>,
    factory: Arc<DataFactory>,
    cache: Arc<DataCache>,
    in_flight: InFlightTable,
    generation: AtomicU64,
}

impl DatasetOrchestrator {
    pub fn new(api: Arc<ApiAccess>, factory: Arc<DataFactory>, cache: Arc<DataCache>) -> Self {
        Self {
            datasets: HashMap::new(),
            api,
            factory,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn register(&mut self, dataset: Arc<dyn Dataset>) {
        self.datasets.insert(dataset.alias(), dataset);
    }

    pub fn with_datasets(mut self, datasets: Vec<Arc<dyn Dataset>>) -> Self {
        datasets.into_iter().for_each(|d| self.register(d));
        self
    }

    pub fn aliases(&self) -> Vec<&'static str> {
        let mut aliases: Vec<_> = self.datasets.keys().copied().collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn api(&self) -> &ApiAccess {
        &self.api
    }

    /// Resolves every request concurrently. The first failure is returned,
    /// tagged with its alias; fetches already started keep running.
    #[instrument(skip(self, requests), fields(requests = requests.len()))]
    pub async fn run(&self, requests: &[DatasetIdentity]) -> Result<DatasetResults, OrgScanError> {
        let fetches = requests.iter().map(|identity| async move {
            let value = self.fetch(identity).await?;
            Ok::<_, OrgScanError>((identity.alias.clone(), value))
        });
        let results: DatasetResults = try_join_all(fetches).await?.into_iter().collect();
        info!(datasets = results.len(), "Datasets ready");
        Ok(results)
    }

    /// Forgets cached values and in-flight fetches for the given identities.
    pub fn clean(&self, requests: &[DatasetIdentity]) {
        let mut in_flight = lock(&self.in_flight);
        for identity in requests {
            in_flight.remove(&identity.cache_key);
            self.cache.remove(&identity.cache_key);
            debug!(key = %identity.cache_key, "Dataset cleaned");
        }
    }

    async fn fetch(&self, identity: &DatasetIdentity) -> Result<Arc<DatasetValue>, OrgScanError> {
        let fetch = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&identity.cache_key) {
                Some(existing) => {
                    debug!(key = %identity.cache_key, "Joining in-flight fetch");
                    existing.fetch.clone()
                }
                None => {
                    let dataset = self
                        .datasets
                        .get(identity.alias.as_str())
                        .cloned()
                        .ok_or_else(|| OrgScanError::UnknownDataset(identity.alias.clone()))?;
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.spawn_fetch(dataset, identity.clone(), generation);
                    in_flight.insert(
                        identity.cache_key.clone(),
                        InFlight {
                            generation,
                            fetch: fetch.clone(),
                        },
                    );
                    fetch
                }
            }
        };

        fetch.await.map_err(|source| OrgScanError::Dataset {
            alias: identity.alias.clone(),
            source,
        })
    }

    // The load runs as its own task: a caller dropping its future does not
    // cancel the fetch other callers are waiting on.
    fn spawn_fetch(
        &self,
        dataset: Arc<dyn Dataset>,
        identity: DatasetIdentity,
        generation: u64,
    ) -> SharedFetch {
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let ctx = DatasetContext {
            api: Arc::clone(&self.api),
            factory: Arc::clone(&self.factory),
            parameters: identity.parameters.clone(),
        };

        let task = tokio::spawn(async move {
            let key = identity.cache_key.as_str();
            let loaded = load(&cache, dataset.as_ref(), &ctx, key).await;

            // `clean` takes the same lock, so an entry cleaned while this fetch
            // ran is never written back.
            let mut table = lock(&in_flight);
            let current = table
                .get(key)
                .is_some_and(|entry| entry.generation == generation);
            match loaded {
                Ok(Loaded::Cached(value)) => Ok(Arc::new(value)),
                Ok(Loaded::Fetched(value)) => {
                    if current {
                        cache.set(key, Some(&value));
                    } else {
                        debug!(key, "Dataset cleaned during fetch, result not cached");
                    }
                    Ok(Arc::new(value))
                }
                Err(e) => {
                    if current {
                        table.remove(key);
                    }
                    Err(e)
                }
            }
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => Err(Arc::new(OrgScanError::InternalError(format!(
                    "Dataset task aborted: {}",
                    join_error
                )))),
            }
        }
        .boxed()
        .shared()
    }
}

enum Loaded {
    Cached(DatasetValue),
    Fetched(DatasetValue),
}

async fn load(
    cache: &DataCache,
    dataset: &dyn Dataset,
    ctx: &DatasetContext,
    cache_key: &str,
) -> Result<Loaded, Arc<OrgScanError>> {
    if let Some(value) = cache.get(cache_key) {
        debug!(key = cache_key, "Served from cache");
        return Ok(Loaded::Cached(value));
    }
    info!(key = cache_key, alias = dataset.alias(), "Extracting dataset");
    let value = dataset.run(ctx).await.map_err(|e| {
        warn!(key = cache_key, error = %e, "Dataset extraction failed");
        Arc::new(e)
    })?;
    Ok(Loaded::Fetched(value))
}

fn lock(table: &InFlightTable) -> MutexGuard<'_, HashMap<String, InFlight>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
