//! Test cases and test utility functions.
//!
//! [`MockSource`] is an in-memory [`DataSource`] that records every request
//! it serves. Responses can be scripted, samples withheld, failures injected,
//! and individual calls held back behind a gate until the test releases them.

use std::{
    cell::{Cell, RefCell},
    collections::{HashSet, VecDeque},
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};
use rand::{thread_rng, Rng};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::{
    analysis::{AnalysisRequest, BlastRequest, BlastResponse},
    cache::CallsPayload,
    chromosomes::ChromosomeId,
    chroms,
    error::ViewError,
    events::{Channel, Event, EventBus},
    genotypes::SampleCalls,
    metadata::{DatasetMetadata, GenesTable},
    traits::DataSource,
    window::{VariantWindow, WindowRequest},
    Position,
};

/// The base URL reported in errors raised by [`MockSource`].
pub const MOCK_URL: &str = "mock://backend";

// the diploid genotypes cycled through by mock call responses
const GENOTYPES: [[i16; 2]; 4] = [[0, 0], [0, 1], [1, 1], [-1, -1]];

/// A page of variants from `first` to `last`, with the given adjacent page
/// bounds and chromosomes. Valid pages get up to five evenly spaced
/// variant positions; invalid ones get none.
pub fn window_page(
    first: Position,
    last: Position,
    first_next: Position,
    last_prev: Position,
    first_chromosome: u64,
    last_chromosome: u64,
) -> VariantWindow {
    let mut variants_coordinates: Vec<Position> = Vec::new();
    if first <= last {
        for i in 0..5 {
            let position = first + (last - first) / 4 * i;
            if variants_coordinates.last() != Some(&position) {
                variants_coordinates.push(position);
            }
        }
        if variants_coordinates.last() != Some(&last) {
            variants_coordinates.push(last);
        }
    }
    VariantWindow {
        coordinate_first: first,
        coordinate_last: last,
        coordinate_first_next: first_next,
        coordinate_last_prev: last_prev,
        coordinate_first_chromosome: ChromosomeId::Numeric(first_chromosome),
        coordinate_last_chromosome: ChromosomeId::Numeric(last_chromosome),
        variants_coordinates,
        extra: serde_json::Map::new(),
    }
}

/// Sample ids `S01`, `S02`, ...
pub fn sample_list(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("S{:02}", i)).collect()
}

/// `n` distinct random sample ids.
pub fn random_sample_ids(n: usize) -> Vec<String> {
    let mut rng = thread_rng();
    let mut ids = IndexSet::with_capacity(n);
    while ids.len() < n {
        ids.insert(format!("sample_{:06}", rng.gen_range(0..1_000_000)));
    }
    ids.into_iter().collect()
}

/// A diploid dataset of three chromosomes over `samples`:
/// `1` spans 1-1000, `2` spans 5-2000 and `3` spans 10-3000.
pub fn test_metadata(samples: Vec<String>) -> DatasetMetadata {
    let mut chromosomes = chroms!(1 => (1, 1000), 2 => (5, 2000), 3 => (10, 3000));
    for chromosome in chromosomes.iter_mut() {
        chromosome.label = Some(format!("chr{}", chromosome.id));
    }
    let mut metadata = DatasetMetadata::new(2, chromosomes, samples);
    metadata
        .extra
        .insert("gff3".to_string(), json!({"has_gff3": true}));
    metadata
}

/// A small gene table.
pub fn test_genes() -> GenesTable {
    GenesTable {
        columns: vec!["ID".into(), "seqid".into(), "start".into(), "end".into()],
        data: vec![
            vec![json!("gene1"), json!(1), json!(100), json!(400)],
            vec![json!("gene2"), json!(2), json!(50), json!(90)],
        ],
    }
}

/// Subscribe to every channel of `bus` and collect what is emitted.
pub fn record_events(bus: &EventBus) -> Rc<RefCell<Vec<Event>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for channel in [
        Channel::MetadataLoaded,
        Channel::GenesLoaded,
        Channel::DisplayChanged,
        Channel::LoadingAnimation,
        Channel::LoadingAnimationPca,
    ] {
        let sink = Rc::clone(&events);
        bus.on(channel, move |event| sink.borrow_mut().push(event));
    }
    events
}

/// A request served by [`MockSource`].
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedRequest {
    Configuration,
    Genes,
    Variants(WindowRequest),
    VariantCalls(WindowRequest),
    VcfExportCheck(AnalysisRequest),
    GenomicWindowSummary(AnalysisRequest),
    Pca(AnalysisRequest),
    Blast(BlastRequest),
}

/// An in-memory [`DataSource`].
pub struct MockSource {
    metadata: DatasetMetadata,
    genes: Option<GenesTable>,
    default_window: RefCell<VariantWindow>,
    windows: RefCell<VecDeque<Result<VariantWindow, ViewError>>>,
    withheld: RefCell<HashSet<String>>,
    calls_failures: RefCell<VecDeque<String>>,
    configuration_failure: Cell<bool>,
    variants_gates: RefCell<VecDeque<oneshot::Receiver<()>>>,
    calls_gates: RefCell<VecDeque<oneshot::Receiver<()>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl MockSource {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            metadata,
            genes: None,
            default_window: RefCell::new(window_page(100, 300, 400, 50, 1, 1)),
            windows: RefCell::new(VecDeque::new()),
            withheld: RefCell::new(HashSet::new()),
            calls_failures: RefCell::new(VecDeque::new()),
            configuration_failure: Cell::new(false),
            variants_gates: RefCell::new(VecDeque::new()),
            calls_gates: RefCell::new(VecDeque::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_genes(mut self, genes: GenesTable) -> Self {
        self.genes = Some(genes);
        self
    }

    /// The page returned once the scripted pages run out.
    pub fn set_default_window(&self, window: VariantWindow) {
        *self.default_window.borrow_mut() = window;
    }

    /// Script the response of the next unscripted `/variants` call.
    pub fn push_window(&self, window: VariantWindow) {
        self.windows.borrow_mut().push_back(Ok(window));
    }

    /// Script the next unscripted `/variants` call to report `message`
    /// as a server-side error.
    pub fn push_window_error(&self, message: &str) {
        self.windows
            .borrow_mut()
            .push_back(Err(ViewError::WindowData(message.to_string())));
    }

    /// Leave these samples out of every calls response.
    pub fn withhold(&self, ids: &[String]) {
        self.withheld.borrow_mut().extend(ids.iter().cloned());
    }

    /// Fail the next `/variant_calls` call with a network error.
    pub fn fail_next_calls(&self, message: &str) {
        self.calls_failures
            .borrow_mut()
            .push_back(message.to_string());
    }

    pub fn fail_configuration(&self) {
        self.configuration_failure.set(true);
    }

    /// Hold the next `/variants` call until the returned sender fires
    /// (or is dropped).
    pub fn gate_next_variants(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.variants_gates.borrow_mut().push_back(receiver);
        sender
    }

    /// Hold the next `/variant_calls` call until the returned sender fires
    /// (or is dropped).
    pub fn gate_next_calls(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.calls_gates.borrow_mut().push_back(receiver);
        sender
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn variants_requests(&self) -> Vec<WindowRequest> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|request| match request {
                RecordedRequest::Variants(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// The sample lists of every `/variant_calls` call, in order.
    pub fn calls_requests(&self) -> Vec<Vec<String>> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|request| match request {
                RecordedRequest::VariantCalls(request) => Some(request.samples.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.borrow_mut().push(request);
    }

    fn network_error(endpoint: &str, message: &str) -> ViewError {
        ViewError::Network {
            url: format!("{}/{}", MOCK_URL, endpoint),
            message: message.to_string(),
        }
    }

    fn calls_for(&self, samples: &[String], variants: usize) -> CallsPayload {
        let withheld = self.withheld.borrow();
        let mut calls = IndexMap::new();
        let mut depths = IndexMap::new();
        for (offset, id) in samples.iter().enumerate() {
            if withheld.contains(id) {
                continue;
            }
            let genotypes = (0..variants)
                .map(|i| GENOTYPES[(i + offset) % GENOTYPES.len()].to_vec())
                .collect();
            calls.insert(id.clone(), SampleCalls::Polyploid(genotypes));
            depths.insert(id.clone(), json!(vec![10; variants]));
        }
        let mut calls_metadata = IndexMap::new();
        calls_metadata.insert("dp".to_string(), depths);
        CallsPayload {
            calls,
            calls_metadata,
        }
    }
}

impl DataSource for MockSource {
    async fn configuration(&self) -> Result<DatasetMetadata, ViewError> {
        self.record(RecordedRequest::Configuration);
        if self.configuration_failure.get() {
            return Err(Self::network_error("configuration", "connection refused"));
        }
        Ok(self.metadata.clone())
    }

    async fn genes(&self) -> Result<Option<GenesTable>, ViewError> {
        self.record(RecordedRequest::Genes);
        Ok(self.genes.clone())
    }

    async fn variants(&self, request: &WindowRequest) -> Result<VariantWindow, ViewError> {
        self.record(RecordedRequest::Variants(request.clone()));
        let scripted = self.windows.borrow_mut().pop_front();
        let gate = self.variants_gates.borrow_mut().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match scripted {
            Some(response) => response,
            None => Ok(self.default_window.borrow().clone()),
        }
    }

    async fn variant_calls(&self, request: &WindowRequest) -> Result<CallsPayload, ViewError> {
        self.record(RecordedRequest::VariantCalls(request.clone()));
        let failure = self.calls_failures.borrow_mut().pop_front();
        let gate = self.calls_gates.borrow_mut().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(message) = failure {
            return Err(Self::network_error("variant_calls", &message));
        }
        Ok(self.calls_for(&request.samples, request.count))
    }

    async fn vcf_export_check(&self, request: &AnalysisRequest) -> Result<Value, ViewError> {
        self.record(RecordedRequest::VcfExportCheck(request.clone()));
        Ok(json!({"status": "export_possible", "samples": request.samples.len()}))
    }

    async fn genomic_window_summary(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Value, ViewError> {
        self.record(RecordedRequest::GenomicWindowSummary(request.clone()));
        Ok(json!({"number_of_variants": request.endpos.saturating_sub(request.startpos)}))
    }

    async fn pca(&self, request: &AnalysisRequest) -> Result<Value, ViewError> {
        self.record(RecordedRequest::Pca(request.clone()));
        let coordinates: Vec<[f64; 2]> = (0..request.samples.len())
            .map(|i| [i as f64, -(i as f64)])
            .collect();
        Ok(json!({"pca_result": coordinates}))
    }

    async fn blast(&self, request: &BlastRequest) -> Result<BlastResponse, ViewError> {
        self.record(RecordedRequest::Blast(request.clone()));
        Ok(BlastResponse {
            blast_hits: json!([{"query": request.query, "chromosome": "1", "percentage_of_identical_matches": 100.0}]),
            extra: serde_json::Map::new(),
        })
    }
}
