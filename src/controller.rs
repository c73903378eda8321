//! The [`Controller`]: navigation state and window reconciliation.
//!
//! The controller owns where the viewer is (chromosome, anchor, variant width,
//! viewport width, sample selection) and turns every navigation action into a
//! [`Controller::draw`]: a full load of the window through the
//! [`DataLoader`], followed by at most one corrective reload when the page
//! returned by the backend ran across a chromosome boundary.
//!
//! A page is invalid when its first position lies after its last one (the
//! previous-page lookup wrapped back onto a lower chromosome) or after the
//! first position of the next page (the page ran past the chromosome end).
//! In the first case the window snaps to the start of the current
//! chromosome, in the second to its end.

use std::{cell::RefCell, cmp::Ordering, rc::Rc};

use chrono::Local;
use serde_json::Value;

use crate::{
    analysis::{AnalysisParams, AnalysisRequest, BlastRecord, BlastRequest},
    cache::loader::{DataLoader, IncrementalOutcome, WindowData},
    chromosomes::{ChromosomeId, ChromosomeIndex, ChromosomeMetadata},
    config::ViewerConfig,
    error::ViewError,
    events::{DisplayState, Event, EventBus},
    metadata::{DatasetMetadata, GenesTable},
    samples::{SampleInput, SampleSelection},
    traits::DataSource,
    window::{visible_variant_count, Anchor, GenomicWindow, VariantWindow, WindowRequest},
    Position,
};

/// What a navigation action ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Nothing to load: no variant fits into the viewport, or no samples
    /// are selected.
    Skipped,
    /// The requested window was displayed.
    Displayed,
    /// The requested window crossed a chromosome boundary; the corrected
    /// window was displayed instead.
    Corrected,
    /// A newer draw started before this one finished; its result was dropped.
    Superseded,
    /// The navigation guard did not allow the move; nothing was loaded.
    Unchanged,
}

struct ViewState {
    window: GenomicWindow,
    viewport_width: u32,
    chrome_width: u32,
    samples: SampleSelection,
    data: Option<DisplayState>,
    metadata: Option<DatasetMetadata>,
    chromosomes: Option<ChromosomeIndex>,
    genes: Option<GenesTable>,
}

pub struct Controller<S: DataSource> {
    source: Rc<S>,
    bus: Rc<EventBus>,
    loader: DataLoader<S>,
    config: ViewerConfig,
    state: RefCell<ViewState>,
    blast_history: RefCell<Vec<BlastRecord>>,
}

impl<S: DataSource> Controller<S> {
    pub fn new(source: Rc<S>, bus: Rc<EventBus>, config: ViewerConfig) -> Self {
        let loader = DataLoader::new(Rc::clone(&source), Rc::clone(&bus))
            .with_initial_sample_cap(config.initial_sample_cap);
        let samples = config
            .samples
            .clone()
            .map(SampleSelection::normalize)
            .unwrap_or_default();
        let state = ViewState {
            window: GenomicWindow::new(ChromosomeId::Numeric(1), Anchor::Start(1), config.snp_width),
            viewport_width: config.viewport_width,
            chrome_width: config.chrome_width,
            samples,
            data: None,
            metadata: None,
            chromosomes: None,
            genes: None,
        };
        Self {
            source,
            bus,
            loader,
            config,
            state: RefCell::new(state),
            blast_history: RefCell::new(Vec::new()),
        }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn loader(&self) -> &DataLoader<S> {
        &self.loader
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// The current navigational window.
    pub fn window(&self) -> GenomicWindow {
        self.state.borrow().window.clone()
    }

    pub fn samples(&self) -> SampleSelection {
        self.state.borrow().samples.clone()
    }

    /// What was last published on `data:display:changed`.
    pub fn data(&self) -> Option<DisplayState> {
        self.state.borrow().data.clone()
    }

    pub fn metadata(&self) -> Option<DatasetMetadata> {
        self.state.borrow().metadata.clone()
    }

    pub fn chromosomes(&self) -> Option<ChromosomeIndex> {
        self.state.borrow().chromosomes.clone()
    }

    pub fn genes(&self) -> Option<GenesTable> {
        self.state.borrow().genes.clone()
    }

    pub fn blast_history(&self) -> Vec<BlastRecord> {
        self.blast_history.borrow().clone()
    }

    pub fn last_blast_result(&self) -> Option<Value> {
        self.blast_history
            .borrow()
            .last()
            .map(|record| record.blast_hits.clone())
    }

    /// Bootstrap the viewer: load the dataset metadata, move to the start
    /// of the first chromosome, settle the initial sample selection, then
    /// load the gene table.
    ///
    /// Publishes `metadata:loaded`, then `data:genes:loaded` if the dataset
    /// has a gene table. Does not draw.
    pub async fn setup(&self) -> Result<DatasetMetadata, ViewError> {
        let metadata = self.load_metadata().await?;
        {
            let mut state = self.state.borrow_mut();
            let first = state
                .chromosomes
                .as_ref()
                .and_then(|index| index.first())
                .cloned()
                .ok_or(ViewError::NoChromosomes)?;
            state.window.chromosome = first.id;
            state.window.set_start(first.start);

            if self.config.samples.is_none() {
                state.samples = if self.config.show_all_samples_on_init() {
                    SampleSelection::from_ids(metadata.samples.clone())
                } else {
                    SampleSelection::new()
                };
            }
        }
        log::info!(
            "dataset with {} samples and {} chromosomes (ploidy {})",
            metadata.samples.len(),
            metadata.chromosomes.len(),
            metadata.ploidy
        );
        self.bus.emit(Event::MetadataLoaded(metadata.clone()));

        if let Some(genes) = self.load_genes().await? {
            self.bus.emit(Event::GenesLoaded(genes));
        }
        Ok(metadata)
    }

    /// The dataset metadata, fetched once and cached for the life of the
    /// controller.
    pub async fn load_metadata(&self) -> Result<DatasetMetadata, ViewError> {
        if let Some(metadata) = self.state.borrow().metadata.clone() {
            return Ok(metadata);
        }
        let metadata = self.source.configuration().await.map_err(|err| {
            log::error!("could not load the dataset metadata: {}", err);
            err
        })?;
        let index = metadata.chromosome_index()?;
        let mut state = self.state.borrow_mut();
        state.metadata = Some(metadata.clone());
        state.chromosomes = Some(index);
        Ok(metadata)
    }

    /// The gene table, fetched once; `None` if the dataset has none.
    pub async fn load_genes(&self) -> Result<Option<GenesTable>, ViewError> {
        if let Some(genes) = self.state.borrow().genes.clone() {
            return Ok(Some(genes));
        }
        let genes = self.source.genes().await.map_err(|err| {
            log::error!("could not load the gene table: {}", err);
            err
        })?;
        self.state.borrow_mut().genes = genes.clone();
        Ok(genes)
    }

    fn require_chromosome(&self, id: &ChromosomeId) -> Result<ChromosomeMetadata, ViewError> {
        let state = self.state.borrow();
        let index = state
            .chromosomes
            .as_ref()
            .ok_or(ViewError::MetadataNotLoaded)?;
        index
            .resolve(&id.to_string())
            .cloned()
            .ok_or_else(|| ViewError::UnknownChromosome(id.to_string()))
    }

    /// Move to the start of chromosome `id` and draw.
    pub async fn set_chromosome(&self, id: ChromosomeId) -> Result<DrawOutcome, ViewError> {
        let chromosome = self.require_chromosome(&id)?;
        {
            let mut state = self.state.borrow_mut();
            state.window.chromosome = chromosome.id;
            state.window.set_start(chromosome.start);
        }
        self.draw().await
    }

    pub async fn set_snp_width(&self, snp_width: u32) -> Result<DrawOutcome, ViewError> {
        if snp_width == 0 {
            return Err(ViewError::InvalidSnpWidth);
        }
        self.state.borrow_mut().window.snp_width = snp_width;
        self.draw().await
    }

    /// The viewport was resized.
    pub async fn set_viewport_width(&self, viewport_width: u32) -> Result<DrawOutcome, ViewError> {
        self.state.borrow_mut().viewport_width = viewport_width;
        self.draw().await
    }

    pub async fn go_to_position(&self, position: Position) -> Result<DrawOutcome, ViewError> {
        self.state.borrow_mut().window.set_start(position);
        self.draw().await
    }

    pub async fn go_to_chromosome_and_position(
        &self,
        id: ChromosomeId,
        position: Position,
    ) -> Result<DrawOutcome, ViewError> {
        let chromosome = self.require_chromosome(&id)?;
        {
            let mut state = self.state.borrow_mut();
            state.window.chromosome = chromosome.id;
            state.window.set_start(position);
        }
        self.draw().await
    }

    /// Anchor the window at the start of the current chromosome.
    pub fn reset_startpos(&self) -> Result<(), ViewError> {
        let chromosome = self.require_chromosome(&self.window().chromosome)?;
        self.state.borrow_mut().window.set_start(chromosome.start);
        Ok(())
    }

    /// Anchor the window at the end of the current chromosome.
    pub fn set_to_end(&self) -> Result<(), ViewError> {
        let chromosome = self.require_chromosome(&self.window().chromosome)?;
        self.state.borrow_mut().window.set_end(chromosome.end);
        Ok(())
    }

    fn displayed_window(&self) -> Option<VariantWindow> {
        self.state
            .borrow()
            .data
            .as_ref()
            .and_then(DisplayState::window)
            .map(|data| data.window.clone())
    }

    /// Move to the next page, or with `step`, to the `step`-th variant of
    /// the current page.
    ///
    /// Does nothing unless the current page and the next one do not
    /// overlap.
    pub async fn go_forward(&self, step: Option<usize>) -> Result<DrawOutcome, ViewError> {
        let Some(page) = self.displayed_window() else {
            return Ok(DrawOutcome::Unchanged);
        };
        if !page.has_next_page() {
            log::debug!("already at the last page");
            return Ok(DrawOutcome::Unchanged);
        }
        let start = match step {
            Some(step) => *page
                .variants_coordinates
                .get(step)
                .ok_or(ViewError::StepOutOfRange {
                    step,
                    len: page.len(),
                })?,
            None => page.coordinate_first_next,
        };
        self.state.borrow_mut().window.set_start(start);
        self.draw().await
    }

    /// Move to the previous page, or with `step`, end the window `step`
    /// variants before the last variant of the current page.
    ///
    /// Does nothing unless the current page and the previous one do not
    /// overlap.
    pub async fn go_backward(&self, step: Option<usize>) -> Result<DrawOutcome, ViewError> {
        let Some(page) = self.displayed_window() else {
            return Ok(DrawOutcome::Unchanged);
        };
        if !page.has_previous_page() {
            log::debug!("already at the first page");
            return Ok(DrawOutcome::Unchanged);
        }
        let end = match step {
            Some(step) => {
                let out_of_range = ViewError::StepOutOfRange {
                    step,
                    len: page.len(),
                };
                let index = page
                    .len()
                    .checked_sub(step)
                    .and_then(|remaining| remaining.checked_sub(1))
                    .ok_or(out_of_range)?;
                page.variants_coordinates[index]
            }
            None => page.coordinate_last_prev,
        };
        self.state.borrow_mut().window.set_end(end);
        self.draw().await
    }

    /// Replace the sample selection and draw.
    pub async fn set_samples(&self, samples: SampleInput) -> Result<DrawOutcome, ViewError> {
        self.state.borrow_mut().samples = SampleSelection::normalize(samples);
        self.draw().await
    }

    /// How many variants fit into the viewport; the page size requested from
    /// the backend.
    pub fn compute_visible_count(&self) -> i64 {
        let state = self.state.borrow();
        visible_variant_count(
            state.viewport_width,
            state.chrome_width,
            state.window.snp_width,
        )
    }

    /// The pixel width taken by the variant columns.
    pub fn current_width_of_variants(&self) -> i64 {
        self.state.borrow().window.snp_width as i64 * self.compute_visible_count()
    }

    fn window_request(&self) -> Option<WindowRequest> {
        let count = self.compute_visible_count();
        if count < 1 {
            log::debug!("no variant fits into the viewport, nothing to load");
            return None;
        }
        let state = self.state.borrow();
        if state.samples.is_empty() {
            log::debug!("no samples selected, nothing to load");
            return None;
        }
        Some(WindowRequest::new(
            &state.window,
            state.samples.ids().to_vec(),
            count as usize,
        ))
    }

    /// Load the current window and publish it on `data:display:changed`,
    /// correcting a window that crossed a chromosome boundary with exactly
    /// one reload.
    ///
    /// `loading:animation` goes `true` before the first load and `false`
    /// after the result is published. A window the server cannot serve is
    /// published as an error and returned as [`ViewError::WindowData`].
    pub async fn draw(&self) -> Result<DrawOutcome, ViewError> {
        let Some(request) = self.window_request() else {
            return Ok(DrawOutcome::Skipped);
        };
        self.bus.emit(Event::LoadingAnimation { status: true });

        let data = match self.loader.full_load(request).await {
            Ok(data) => data,
            Err(err) => return self.fail_draw(err),
        };
        if !data.window.is_invalid() {
            self.publish(data);
            return Ok(DrawOutcome::Displayed);
        }

        let corrected = self.correct_anchor(&data.window);
        if !corrected {
            log::debug!(
                "page {}-{} wrapped without a chromosome change; reloading as is",
                data.window.coordinate_first,
                data.window.coordinate_last
            );
        }
        let Some(request) = self.window_request() else {
            self.publish(data);
            return Ok(DrawOutcome::Displayed);
        };
        log::info!(
            "invalid page, reloading once from {:?}",
            request.startpos.or(request.endpos)
        );
        match self.loader.full_load(request).await {
            Ok(data) if corrected => {
                self.publish(data);
                Ok(DrawOutcome::Corrected)
            }
            Ok(data) => {
                self.publish(data);
                Ok(DrawOutcome::Displayed)
            }
            Err(err) => self.fail_draw(err),
        }
    }

    /// Apply the boundary corrections to the current anchor. Returns whether
    /// the anchor changed.
    fn correct_anchor(&self, page: &VariantWindow) -> bool {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(index) = state.chromosomes.as_ref() else {
            log::warn!("no chromosome metadata, cannot correct the window");
            return false;
        };
        let Some(chromosome) = index.get(&state.window.chromosome) else {
            log::warn!(
                "chromosome {} is not in the metadata, cannot correct the window",
                state.window.chromosome
            );
            return false;
        };
        let current = &state.window.chromosome;
        let mut anchor = None;
        if page.starts_after_end()
            && index.compare(&page.coordinate_first_chromosome, current) == Ordering::Less
        {
            anchor = Some(Anchor::Start(chromosome.start));
        }
        if page.starts_after_next()
            && index.compare(&page.coordinate_last_chromosome, current) == Ordering::Greater
        {
            anchor = Some(Anchor::End(chromosome.end));
        }
        match anchor {
            Some(anchor) => {
                state.window.anchor = anchor;
                true
            }
            None => false,
        }
    }

    fn publish(&self, data: WindowData) {
        let display = DisplayState::Window(Box::new(data));
        self.state.borrow_mut().data = Some(display.clone());
        self.bus.emit(Event::DisplayChanged(display));
        self.bus.emit(Event::LoadingAnimation { status: false });
    }

    fn fail_draw(&self, err: ViewError) -> Result<DrawOutcome, ViewError> {
        match err {
            // the newer draw owns the display and the loading indicator
            ViewError::Superseded { .. } => Ok(DrawOutcome::Superseded),
            ViewError::WindowData(message) => {
                let display = DisplayState::Error {
                    error: message.clone(),
                };
                self.state.borrow_mut().data = Some(display.clone());
                self.bus.emit(Event::DisplayChanged(display));
                self.bus.emit(Event::LoadingAnimation { status: false });
                Err(ViewError::WindowData(message))
            }
            err => {
                self.bus.emit(Event::LoadingAnimation { status: false });
                Err(err)
            }
        }
    }

    /// Fetch the calls of newly visible samples into the current window.
    pub async fn lazy_load_samples(&self, ids: &[String]) -> Result<IncrementalOutcome, ViewError> {
        let outcome = self.loader.incremental_load(ids).await?;
        self.keep_display(&outcome);
        Ok(outcome)
    }

    /// Like [`Controller::lazy_load_samples`], calling `on_satisfied` when
    /// there was nothing left to fetch.
    pub async fn lazy_load_samples_or_else<F: FnOnce()>(
        &self,
        ids: &[String],
        on_satisfied: F,
    ) -> Result<IncrementalOutcome, ViewError> {
        let outcome = self.loader.incremental_load_or_else(ids, on_satisfied).await?;
        self.keep_display(&outcome);
        Ok(outcome)
    }

    fn keep_display(&self, outcome: &IncrementalOutcome) {
        if let IncrementalOutcome::Merged { data, .. } = outcome {
            self.state.borrow_mut().data = Some(DisplayState::Window(data.clone()));
        }
    }

    /// The samples analyses run over: the selection, or the whole cohort
    /// when nothing is selected.
    fn analysis_samples(&self) -> Vec<String> {
        let state = self.state.borrow();
        if !state.samples.is_empty() {
            return state.samples.ids().to_vec();
        }
        state
            .metadata
            .as_ref()
            .map(|metadata| metadata.samples.clone())
            .unwrap_or_default()
    }

    fn analysis_request(&self, params: AnalysisParams) -> AnalysisRequest {
        AnalysisRequest::new(self.window().chromosome, self.analysis_samples(), params)
    }

    /// `POST /vcf_export_check` for the current chromosome.
    pub async fn vcf_export_check(&self, params: AnalysisParams) -> Result<Value, ViewError> {
        let request = self.analysis_request(params);
        self.source.vcf_export_check(&request).await.map_err(|err| {
            log::error!("export check failed: {}", err);
            err
        })
    }

    /// `POST /genomic_window_summary` for the current chromosome.
    pub async fn genomic_window_summary(&self, params: AnalysisParams) -> Result<Value, ViewError> {
        let request = self.analysis_request(params);
        self.source
            .genomic_window_summary(&request)
            .await
            .map_err(|err| {
                log::error!("window summary failed: {}", err);
                err
            })
    }

    /// `POST /pca` for the current chromosome, bracketed by
    /// `loading:animation:pca`.
    pub async fn pca(&self, params: AnalysisParams) -> Result<Value, ViewError> {
        let request = self.analysis_request(params);
        self.bus.emit(Event::LoadingAnimationPca { status: true });
        let result = self.source.pca(&request).await;
        self.bus.emit(Event::LoadingAnimationPca { status: false });
        result.map_err(|err| {
            log::error!("pca failed: {}", err);
            err
        })
    }

    /// `POST /blast`; the hits are returned and kept in the blast history.
    pub async fn blast(&self, query: &str, blast_type: &str) -> Result<Value, ViewError> {
        let request = BlastRequest {
            query: query.to_string(),
            blast_type: blast_type.to_string(),
        };
        let response = self.source.blast(&request).await.map_err(|err| {
            log::error!("blast failed: {}", err);
            err
        })?;
        self.blast_history.borrow_mut().push(BlastRecord {
            query: request.query,
            blast_hits: response.blast_hits.clone(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        Ok(response.blast_hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::Channel,
        prelude::*,
        test_utilities::{
            record_events, sample_list, test_genes, test_metadata, window_page, MockSource,
            RecordedRequest,
        },
    };
    use futures_util::future::join;

    fn controller(config: ViewerConfig) -> (Rc<MockSource>, Controller<MockSource>) {
        let source = Rc::new(MockSource::new(test_metadata(sample_list(4))).with_genes(test_genes()));
        let controller = Controller::new(Rc::clone(&source), Rc::new(EventBus::new()), config);
        (source, controller)
    }

    async fn ready() -> (Rc<MockSource>, Controller<MockSource>) {
        let (source, controller) = controller(ViewerConfig::default());
        controller.setup().await.unwrap();
        (source, controller)
    }

    fn channels(events: &Rc<RefCell<Vec<Event>>>) -> Vec<Channel> {
        events.borrow().iter().map(Event::channel).collect()
    }

    #[tokio::test]
    async fn test_setup() {
        let (source, controller) = controller(ViewerConfig::default());
        let events = record_events(controller.bus());
        let metadata = controller.setup().await.unwrap();

        assert_eq!(metadata.samples.len(), 4);
        assert_eq!(controller.window().chromosome, ChromosomeId::Numeric(1));
        assert_eq!(controller.window().anchor, Anchor::Start(1));
        assert_eq!(controller.samples().ids(), sample_list(4).as_slice());
        assert_eq!(channels(&events), vec![Channel::MetadataLoaded, Channel::GenesLoaded]);
        assert_eq!(controller.genes().unwrap().len(), 2);

        // metadata is cached
        controller.load_metadata().await.unwrap();
        let configuration_requests = source
            .requests()
            .iter()
            .filter(|request| **request == RecordedRequest::Configuration)
            .count();
        assert_eq!(configuration_requests, 1);
    }

    #[tokio::test]
    async fn test_setup_keeps_configured_samples() {
        let mut config = ViewerConfig::default();
        config.samples = Some(SampleInput::Ids(sample_ids!["S02"]));
        let (_source, controller) = controller(config);
        controller.setup().await.unwrap();
        assert_eq!(controller.samples().ids(), sample_ids!["S02"].as_slice());
    }

    #[tokio::test]
    async fn test_setup_without_default_samples() {
        let mut config = ViewerConfig::default();
        config.show_all_samples_on_init = Some(false);
        let (source, controller) = controller(config);
        controller.setup().await.unwrap();
        assert!(controller.samples().is_empty());

        assert_eq!(controller.draw().await.unwrap(), DrawOutcome::Skipped);
        assert!(source.variants_requests().is_empty());
    }

    #[tokio::test]
    async fn test_setup_failure() {
        let (source, controller) = controller(ViewerConfig::default());
        source.fail_configuration();
        let err = controller.setup().await.unwrap_err();
        assert!(err.is_network());
        assert!(controller.metadata().is_none());
    }

    #[tokio::test]
    async fn test_visible_count_and_width() {
        let (_source, controller) = ready().await;
        assert_eq!(controller.compute_visible_count(), 40);
        assert_eq!(controller.current_width_of_variants(), 800);
    }

    #[tokio::test]
    async fn test_draw_publishes_window() {
        let (source, controller) = ready().await;
        let events = record_events(controller.bus());

        assert_eq!(controller.draw().await.unwrap(), DrawOutcome::Displayed);
        assert_eq!(
            channels(&events),
            vec![
                Channel::LoadingAnimation,
                Channel::DisplayChanged,
                Channel::LoadingAnimation
            ]
        );
        assert!(matches!(events.borrow()[0], Event::LoadingAnimation { status: true }));
        assert!(matches!(events.borrow()[2], Event::LoadingAnimation { status: false }));

        let request = &source.variants_requests()[0];
        assert_eq!(request.chrom, ChromosomeId::Numeric(1));
        assert_eq!(request.startpos, Some(1));
        assert_eq!(request.endpos, None);
        assert_eq!(request.count, 40);
        let data = controller.data().unwrap();
        assert_eq!(data.window().unwrap().window.coordinate_first, 100);
    }

    #[tokio::test]
    async fn test_boundary_correction_snaps_to_end() {
        let (source, controller) = ready().await;
        let events = record_events(controller.bus());
        source.push_window(window_page(500, 100, 50, 400, 1, 2));

        assert_eq!(controller.draw().await.unwrap(), DrawOutcome::Corrected);
        let requests = source.variants_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].startpos, None);
        assert_eq!(requests[1].endpos, Some(1000));
        assert_eq!(controller.window().anchor, Anchor::End(1000));

        let displayed = channels(&events)
            .into_iter()
            .filter(|channel| *channel == Channel::DisplayChanged)
            .count();
        assert_eq!(displayed, 1);
        assert_eq!(
            controller.data().unwrap().window().unwrap().window.coordinate_first,
            100
        );
    }

    #[tokio::test]
    async fn test_boundary_correction_snaps_to_start() {
        let (source, controller) = ready().await;
        source.push_window(window_page(500, 100, 50, 400, 1, 2));

        // on chromosome 2 the page wrapped back onto chromosome 1
        let outcome = controller
            .go_to_chromosome_and_position(ChromosomeId::Numeric(2), 7)
            .await
            .unwrap();
        assert_eq!(outcome, DrawOutcome::Corrected);
        let requests = source.variants_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].startpos, Some(7));
        assert_eq!(requests[1].startpos, Some(5));
        assert_eq!(requests[1].endpos, None);
    }

    #[tokio::test]
    async fn test_invalid_window_without_chromosome_change_reloads_once() {
        let (source, controller) = ready().await;
        source.push_window(window_page(500, 100, 50, 400, 1, 1));
        assert_eq!(controller.draw().await.unwrap(), DrawOutcome::Displayed);

        // reloaded once with the anchor unchanged; the reload is final
        let requests = source.variants_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].startpos, requests[0].startpos);
        assert_eq!(controller.window().anchor, Anchor::Start(1));
        let data = controller.data().unwrap();
        assert!(!data.window().unwrap().window.is_invalid());
    }

    #[tokio::test]
    async fn test_both_corrections_end_anchor_wins() {
        let (source, controller) = ready().await;
        source.push_window(window_page(500, 100, 50, 400, 1, 3));

        let outcome = controller
            .go_to_chromosome_and_position(ChromosomeId::Numeric(2), 700)
            .await
            .unwrap();
        assert_eq!(outcome, DrawOutcome::Corrected);
        assert_eq!(controller.window().anchor, Anchor::End(2000));
        let requests = source.variants_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].startpos, None);
        assert_eq!(requests[1].endpos, Some(2000));
    }

    #[tokio::test]
    async fn test_window_data_error_is_published() {
        let (source, controller) = ready().await;
        let events = record_events(controller.bus());
        source.push_window_error("The provided chromosome number 9 is not included");

        let err = controller.draw().await.unwrap_err();
        assert!(matches!(err, ViewError::WindowData(_)));
        assert_eq!(source.variants_requests().len(), 1);
        assert_eq!(
            channels(&events),
            vec![
                Channel::LoadingAnimation,
                Channel::DisplayChanged,
                Channel::LoadingAnimation
            ]
        );
        match controller.data().unwrap() {
            DisplayState::Error { error } => assert!(error.contains("chromosome number 9")),
            other => panic!("unexpected display {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_error_clears_loading() {
        let (source, controller) = ready().await;
        let events = record_events(controller.bus());
        source.fail_next_calls("timed out");
        assert!(controller.draw().await.unwrap_err().is_network());
        assert_eq!(
            channels(&events),
            vec![Channel::LoadingAnimation, Channel::LoadingAnimation]
        );
    }

    #[tokio::test]
    async fn test_go_forward() {
        let (source, controller) = ready().await;
        controller.draw().await.unwrap();

        // 300 < 400: the next page does not overlap
        assert_eq!(controller.go_forward(None).await.unwrap(), DrawOutcome::Displayed);
        assert_eq!(source.variants_requests()[1].startpos, Some(400));

        controller.go_forward(Some(2)).await.unwrap();
        assert_eq!(source.variants_requests()[2].startpos, Some(200));

        let err = controller.go_forward(Some(10)).await.unwrap_err();
        assert!(matches!(err, ViewError::StepOutOfRange { step: 10, len: 5 }));
    }

    #[tokio::test]
    async fn test_go_forward_guard() {
        let (source, controller) = ready().await;
        source.set_default_window(window_page(100, 300, 300, 50, 1, 1));
        controller.draw().await.unwrap();
        source.clear_requests();

        assert_eq!(controller.go_forward(None).await.unwrap(), DrawOutcome::Unchanged);
        assert_eq!(controller.go_forward(Some(1)).await.unwrap(), DrawOutcome::Unchanged);
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_go_backward() {
        let (source, controller) = ready().await;
        controller.draw().await.unwrap();

        controller.go_backward(None).await.unwrap();
        let request = &source.variants_requests()[1];
        assert_eq!(request.startpos, None);
        assert_eq!(request.endpos, Some(50));

        // the second to last variant of the page
        controller.go_backward(Some(1)).await.unwrap();
        assert_eq!(source.variants_requests()[2].endpos, Some(250));

        for step in [5, usize::MAX] {
            let err = controller.go_backward(Some(step)).await.unwrap_err();
            assert!(matches!(err, ViewError::StepOutOfRange { len: 5, .. }));
        }
        assert_eq!(source.variants_requests().len(), 3);

        source.set_default_window(window_page(100, 300, 400, 100, 1, 1));
        controller.draw().await.unwrap();
        assert_eq!(controller.go_backward(None).await.unwrap(), DrawOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_navigation_before_any_draw_is_unchanged() {
        let (source, controller) = ready().await;
        assert_eq!(controller.go_forward(None).await.unwrap(), DrawOutcome::Unchanged);
        assert_eq!(controller.go_backward(None).await.unwrap(), DrawOutcome::Unchanged);
        assert!(source.variants_requests().is_empty());
    }

    #[tokio::test]
    async fn test_set_chromosome() {
        let (source, controller) = ready().await;
        controller.set_chromosome(ChromosomeId::Numeric(3)).await.unwrap();
        let request = &source.variants_requests()[0];
        assert_eq!(request.chrom, ChromosomeId::Numeric(3));
        assert_eq!(request.startpos, Some(10));

        let err = controller
            .set_chromosome(ChromosomeId::Named("Un".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewError::UnknownChromosome(_)));
    }

    #[tokio::test]
    async fn test_reset_and_end_anchors() {
        let (_source, controller) = ready().await;
        controller.go_to_position(500).await.unwrap();
        controller.set_to_end().unwrap();
        assert_eq!(controller.window().anchor, Anchor::End(1000));
        assert_eq!(controller.window().startpos(), None);
        controller.reset_startpos().unwrap();
        assert_eq!(controller.window().anchor, Anchor::Start(1));
        assert_eq!(controller.window().endpos(), None);
    }

    #[tokio::test]
    async fn test_set_samples_normalizes_records() {
        let (source, controller) = ready().await;
        let records = vec![SampleRecord::new("S1").with_link("<b>Sample 1</b>")];
        controller.set_samples(SampleInput::Records(records)).await.unwrap();

        let samples = controller.samples();
        assert_eq!(samples.ids(), sample_ids!["S1"].as_slice());
        assert_eq!(samples.display_name("S1"), "Sample 1");
        assert_eq!(source.variants_requests()[0].samples, sample_ids!["S1"]);
    }

    #[tokio::test]
    async fn test_widths() {
        let (source, controller) = ready().await;
        assert!(matches!(
            controller.set_snp_width(0).await,
            Err(ViewError::InvalidSnpWidth)
        ));
        controller.set_snp_width(40).await.unwrap();
        assert_eq!(source.variants_requests()[0].count, 20);

        let events = record_events(controller.bus());
        let outcome = controller.set_viewport_width(150).await.unwrap();
        assert_eq!(outcome, DrawOutcome::Skipped);
        assert_eq!(source.variants_requests().len(), 1);
        assert!(events.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_lazy_load_keeps_display_current() {
        let mut config = ViewerConfig::default();
        config.initial_sample_cap = 2;
        let (source, controller) = controller(config);
        controller.setup().await.unwrap();
        controller.draw().await.unwrap();

        let outcome = controller
            .lazy_load_samples(&sample_ids!["S02", "S03", "S04"])
            .await
            .unwrap();
        assert!(matches!(outcome, IncrementalOutcome::Merged { ref fetched, .. } if fetched == &sample_ids!["S03", "S04"]));
        let data = controller.data().unwrap();
        assert_eq!(data.window().unwrap().calls.loaded_count(), 4);

        let satisfied = std::cell::Cell::new(false);
        controller
            .lazy_load_samples_or_else(&sample_ids!["S01"], || satisfied.set(true))
            .await
            .unwrap();
        assert!(satisfied.get());
        assert_eq!(source.calls_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_draws_publish_once() {
        let (source, controller) = ready().await;
        let events = record_events(controller.bus());
        let release = source.gate_next_variants();

        let first = controller.draw();
        let second = async {
            let outcome = controller.go_to_position(700).await;
            let _ = release.send(());
            outcome
        };
        let (first, second) = join(first, second).await;
        assert_eq!(first.unwrap(), DrawOutcome::Superseded);
        assert_eq!(second.unwrap(), DrawOutcome::Displayed);

        let displayed = channels(&events)
            .into_iter()
            .filter(|channel| *channel == Channel::DisplayChanged)
            .count();
        assert_eq!(displayed, 1);
    }

    #[tokio::test]
    async fn test_analytics() {
        let mut config = ViewerConfig::default();
        config.show_all_samples_on_init = Some(false);
        let (source, controller) = controller(config);
        controller.setup().await.unwrap();
        let events = record_events(controller.bus());

        // no selection: analyses run over the whole cohort
        let summary = controller
            .genomic_window_summary(AnalysisParams::new(100, 400))
            .await
            .unwrap();
        assert_eq!(summary["number_of_variants"], 300);
        let check = controller
            .vcf_export_check(AnalysisParams::new(1, 10))
            .await
            .unwrap();
        assert_eq!(check["samples"], 4);

        controller
            .pca(AnalysisParams::new(1, 1000).with_umap_neighbors(10))
            .await
            .unwrap();
        assert_eq!(
            channels(&events),
            vec![Channel::LoadingAnimationPca, Channel::LoadingAnimationPca]
        );
        match source.requests().last().unwrap() {
            RecordedRequest::Pca(request) => {
                assert_eq!(request.samples, sample_list(4));
                assert_eq!(request.umap_n_neighbors, Some(10));
                assert_eq!(request.chrom, ChromosomeId::Numeric(1));
            }
            other => panic!("unexpected request {:?}", other),
        }

        let hits = controller.blast("ACGTACGT", "blastn").await.unwrap();
        assert_eq!(hits[0]["query"], "ACGTACGT");
        let history = controller.blast_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "ACGTACGT");
        assert!(!history[0].timestamp.is_empty());
        assert_eq!(controller.last_blast_result(), Some(hits));
    }
}
