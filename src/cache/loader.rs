//! The [`DataLoader`]: the lazy per-sample call cache of the current window.
//!
//! A full load resets both caches over the sample universe and fetches the
//! page of variants together with the calls of a bounded slice of samples.
//! Incremental loads then fetch the calls of samples as they become visible,
//! skipping every sample that is already loaded or already being fetched.
//!
//! Every full load gets a new generation number. A response that arrives
//! after a newer full load started belongs to a window that no longer
//! exists; it is dropped with [`ViewError::Superseded`] and never merged.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use futures_util::future::join;
use serde::Serialize;

use crate::{
    cache::{AttributeCache, CallsPayload, SampleCache},
    error::ViewError,
    events::{DisplayState, Event, EventBus},
    genotypes::SampleCalls,
    traits::DataSource,
    window::{VariantWindow, WindowRequest},
    INITIAL_SAMPLE_CAP,
};

/// Which kind of load is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadKind {
    Full,
    Partial,
}

/// The state of the current window.
///
/// `Empty -> Loading(Full) -> Ready | Error`; from `Ready`, incremental loads
/// go `Loading(Partial) -> Ready`, whether they succeed or not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Empty,
    Loading(LoadKind),
    Ready,
    Error,
}

/// A snapshot of the current window: the page of variants plus both caches.
#[derive(Clone, Debug, Serialize)]
pub struct WindowData {
    pub generation: u64,
    #[serde(flatten)]
    pub window: VariantWindow,
    pub calls: SampleCache<SampleCalls>,
    pub calls_metadata: AttributeCache,
    /// Set once an incremental load has merged into this window.
    pub lazy_loaded: bool,
}

/// What an incremental load did.
#[derive(Clone, Debug)]
pub enum IncrementalOutcome {
    /// Every requested sample was already loaded; nothing was fetched.
    AlreadySatisfied,
    /// Every unloaded requested sample is already being fetched.
    InFlight,
    /// There is no loaded window to add samples to (yet).
    NoWindow,
    /// The calls of `fetched` were fetched and merged.
    Merged {
        fetched: Vec<String>,
        data: Box<WindowData>,
    },
}

struct LoadedWindow {
    request: WindowRequest,
    window: VariantWindow,
}

struct LoaderState {
    generation: u64,
    status: LoadStatus,
    loaded: Option<LoadedWindow>,
    calls: SampleCache<SampleCalls>,
    calls_metadata: AttributeCache,
    lazy_loaded: bool,
    visible: Vec<String>,
    in_flight: HashSet<String>,
}

impl LoaderState {
    fn snapshot(&self) -> Option<WindowData> {
        self.loaded.as_ref().map(|loaded| WindowData {
            generation: self.generation,
            window: loaded.window.clone(),
            calls: self.calls.clone(),
            calls_metadata: self.calls_metadata.clone(),
            lazy_loaded: self.lazy_loaded,
        })
    }

    fn merge(&mut self, payload: CallsPayload) {
        self.calls.merge(payload.calls);
        self.calls_metadata.merge(payload.calls_metadata);
    }
}

impl Default for LoaderState {
    fn default() -> Self {
        Self {
            generation: 0,
            status: LoadStatus::Empty,
            loaded: None,
            calls: SampleCache::default(),
            calls_metadata: AttributeCache::default(),
            lazy_loaded: false,
            visible: Vec::new(),
            in_flight: HashSet::new(),
        }
    }
}

/// The lazy sample-call cache.
pub struct DataLoader<S: DataSource> {
    source: Rc<S>,
    bus: Rc<EventBus>,
    initial_sample_cap: usize,
    state: RefCell<LoaderState>,
}

impl<S: DataSource> DataLoader<S> {
    pub fn new(source: Rc<S>, bus: Rc<EventBus>) -> Self {
        Self {
            source,
            bus,
            initial_sample_cap: INITIAL_SAMPLE_CAP,
            state: RefCell::new(LoaderState::default()),
        }
    }

    /// Set how many samples a full load fetches calls for when no visible
    /// subset has been reported.
    pub fn with_initial_sample_cap(mut self, cap: usize) -> Self {
        self.initial_sample_cap = cap;
        self
    }

    pub fn initial_sample_cap(&self) -> usize {
        self.initial_sample_cap
    }

    pub fn status(&self) -> LoadStatus {
        self.state.borrow().status
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// A snapshot of the current window, if one is loaded.
    pub fn current(&self) -> Option<WindowData> {
        self.state.borrow().snapshot()
    }

    /// The samples last reported visible by [`DataLoader::incremental_load`].
    pub fn visible_samples(&self) -> Vec<String> {
        self.state.borrow().visible.clone()
    }

    /// The samples whose calls are being fetched right now.
    pub fn in_flight(&self) -> Vec<String> {
        self.state.borrow().in_flight.iter().cloned().collect()
    }

    /// Load a new window. `request.samples` is the sample universe: both
    /// caches are reset over it, but only a bounded slice of it is fetched.
    ///
    /// The slice is the visible subset, if one has been reported and any of
    /// it is in the universe, otherwise the first `initial_sample_cap`
    /// samples. The page of variants and the calls are fetched concurrently
    /// and nothing is merged unless both succeed.
    pub async fn full_load(&self, request: WindowRequest) -> Result<WindowData, ViewError> {
        let (generation, bounded) = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.status = LoadStatus::Loading(LoadKind::Full);
            state.loaded = None;
            state.lazy_loaded = false;
            state.in_flight.clear();
            state.calls = SampleCache::new_unloaded(&request.samples);
            state.calls_metadata = AttributeCache::new(&request.samples);

            let visible: Vec<String> = state
                .visible
                .iter()
                .filter(|id| request.samples.contains(id))
                .cloned()
                .collect();
            let bounded = if visible.is_empty() {
                request
                    .samples
                    .iter()
                    .take(self.initial_sample_cap)
                    .cloned()
                    .collect()
            } else {
                visible
            };
            (state.generation, request.with_samples(bounded))
        };
        log::debug!(
            "full load {} of chromosome {} for {} of {} samples",
            generation,
            request.chrom,
            bounded.samples.len(),
            request.samples.len()
        );

        let (window, calls) = join(
            self.source.variants(&bounded),
            self.source.variant_calls(&bounded),
        )
        .await;

        let mut state = self.state.borrow_mut();
        if state.generation != generation {
            log::debug!(
                "discarding full load {} (current is {})",
                generation,
                state.generation
            );
            return Err(ViewError::Superseded {
                generation,
                current: state.generation,
            });
        }

        let (window, calls) = match (window, calls) {
            (Ok(window), Ok(calls)) => (window, calls),
            (Err(err), _) | (_, Err(err)) => {
                state.status = LoadStatus::Error;
                if err.is_network() {
                    log::error!("could not load window data: {}", err);
                } else {
                    log::warn!("could not load window data: {}", err);
                }
                return Err(err);
            }
        };

        state.merge(calls);
        state.loaded = Some(LoadedWindow { request, window });
        state.status = LoadStatus::Ready;
        log::debug!(
            "full load {} ready: {} variants, {} samples loaded",
            generation,
            state.loaded.as_ref().map_or(0, |loaded| loaded.window.len()),
            state.calls.loaded_count()
        );
        state.snapshot().ok_or(ViewError::MetadataNotLoaded)
    }

    /// Record `ids` as the visible subset and fetch the calls of those that
    /// are neither loaded nor being fetched, merging them into the current
    /// caches. Publishes the updated window on `data:display:changed`.
    ///
    /// A failed fetch leaves the samples unloaded, so a later call with the
    /// same ids fetches them again.
    pub async fn incremental_load(&self, ids: &[String]) -> Result<IncrementalOutcome, ViewError> {
        let (generation, request) = {
            let mut state = self.state.borrow_mut();
            state.visible = ids.to_vec();
            let Some(loaded) = state.loaded.as_ref() else {
                return Ok(IncrementalOutcome::NoWindow);
            };
            let unloaded = state.calls.unloaded(ids);
            if unloaded.is_empty() {
                return Ok(IncrementalOutcome::AlreadySatisfied);
            }
            let to_fetch: Vec<String> = unloaded
                .into_iter()
                .filter(|id| !state.in_flight.contains(id))
                .collect();
            if to_fetch.is_empty() {
                return Ok(IncrementalOutcome::InFlight);
            }
            let request = loaded.request.with_samples(to_fetch);
            state.in_flight.extend(request.samples.iter().cloned());
            state.status = LoadStatus::Loading(LoadKind::Partial);
            (state.generation, request)
        };
        log::debug!("incremental load of {} samples", request.samples.len());

        self.bus.emit(Event::LoadingAnimation { status: true });
        let result = self.source.variant_calls(&request).await;
        self.bus.emit(Event::LoadingAnimation { status: false });

        let data = {
            let mut state = self.state.borrow_mut();
            if state.generation != generation {
                return Err(ViewError::Superseded {
                    generation,
                    current: state.generation,
                });
            }
            for id in &request.samples {
                state.in_flight.remove(id);
            }
            if state.in_flight.is_empty() {
                state.status = LoadStatus::Ready;
            }
            match result {
                Ok(payload) => {
                    state.merge(payload);
                    state.lazy_loaded = true;
                }
                Err(err) => {
                    log::warn!(
                        "incremental load of {} samples failed: {}",
                        request.samples.len(),
                        err
                    );
                    return Err(err);
                }
            }
            match state.snapshot() {
                Some(data) => data,
                None => return Ok(IncrementalOutcome::NoWindow),
            }
        };

        self.bus.emit(Event::DisplayChanged(DisplayState::Window(Box::new(
            data.clone(),
        ))));
        Ok(IncrementalOutcome::Merged {
            fetched: request.samples,
            data: Box::new(data),
        })
    }

    /// Like [`DataLoader::incremental_load`], calling `on_satisfied` when
    /// every requested sample is already loaded.
    pub async fn incremental_load_or_else<F>(
        &self,
        ids: &[String],
        on_satisfied: F,
    ) -> Result<IncrementalOutcome, ViewError>
    where
        F: FnOnce(),
    {
        let outcome = self.incremental_load(ids).await?;
        if let IncrementalOutcome::AlreadySatisfied = outcome {
            on_satisfied();
        }
        Ok(outcome)
    }
}
