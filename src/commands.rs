//! The commands behind the `snpview` binary.

use std::{io::Write, path::PathBuf};

use crate::{
    cache::loader::WindowData,
    chromosomes::ChromosomeId,
    controller::{Controller, DrawOutcome},
    error::ViewError,
    events::DisplayState,
    io::OutputFile,
    reporting::{CommandOutput, Report},
    samples::SampleSelection,
    traits::{DataSource, TsvSerialize},
    Position,
};

fn output_stream(output: Option<&PathBuf>, header: Option<Vec<String>>) -> OutputFile {
    output.map_or(OutputFile::new_stdout(header.clone()), |file| {
        OutputFile::new(file, header)
    })
}

/// List the chromosomes of the dataset as TSV: id, label, first and last
/// variant position, centromere position and number of variants.
pub async fn snpview_chromosomes<S: DataSource>(
    source: &S,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<usize>, ViewError> {
    let metadata = source.configuration().await?;
    let index = metadata.chromosome_index()?;

    let mut writer = output_stream(output, None).writer()?;
    for chromosome in index.iter() {
        writeln!(writer, "{}", chromosome.to_tsv())?;
    }
    writer.flush()?;

    Ok(CommandOutput::new(index.len(), Report::new()))
}

/// Where `snpview show` should navigate before writing the window.
#[derive(Clone, Debug, Default)]
pub struct ShowOptions {
    /// Chromosome to open; the first one if not set.
    pub chromosome: Option<String>,
    /// Window start; the start of the chromosome if not set.
    pub position: Option<Position>,
    /// Pages to move forward after the first draw.
    pub forward: usize,
    /// Pages to move backward, after moving forward.
    pub backward: usize,
    /// Move by this many variants instead of whole pages.
    pub step: Option<usize>,
    /// Fetch the calls of every selected sample, not just the first ones.
    pub load_all: bool,
}

/// Bootstrap the viewer, navigate as `options` says and write the resulting
/// window as TSV: one row per selected sample, with its id, display name,
/// and the variant class code at every position (`.` for samples whose
/// calls were not loaded).
pub async fn snpview_show<S: DataSource>(
    controller: &Controller<S>,
    options: &ShowOptions,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<DrawOutcome>, ViewError> {
    let mut report = Report::new();
    controller.setup().await?;

    let mut outcome = match (&options.chromosome, options.position) {
        (Some(chromosome), position) => {
            let index = controller
                .chromosomes()
                .ok_or(ViewError::MetadataNotLoaded)?;
            let start = index
                .resolve(chromosome)
                .ok_or_else(|| ViewError::UnknownChromosome(chromosome.clone()))?
                .start;
            let id = ChromosomeId::parse(chromosome);
            controller
                .go_to_chromosome_and_position(id, position.unwrap_or(start))
                .await?
        }
        (None, Some(position)) => controller.go_to_position(position).await?,
        (None, None) => controller.draw().await?,
    };
    note_outcome(&mut report, outcome);

    for _ in 0..options.forward {
        outcome = controller.go_forward(options.step).await?;
        note_outcome(&mut report, outcome);
        if outcome == DrawOutcome::Unchanged {
            break;
        }
    }
    for _ in 0..options.backward {
        outcome = controller.go_backward(options.step).await?;
        note_outcome(&mut report, outcome);
        if outcome == DrawOutcome::Unchanged {
            break;
        }
    }

    let samples = controller.samples();
    if options.load_all && !samples.is_empty() {
        controller.lazy_load_samples(samples.ids()).await?;
    }

    match controller.data() {
        Some(DisplayState::Window(data)) => {
            write_window(&data, &samples, output, &mut report)?;
        }
        Some(DisplayState::Error { error }) => return Err(ViewError::WindowData(error)),
        None => report.add_issue("nothing to show: no variants fit or no samples selected".to_string()),
    }
    Ok(CommandOutput::new(outcome, report))
}

fn note_outcome(report: &mut Report, outcome: DrawOutcome) {
    match outcome {
        DrawOutcome::Corrected => report.add_issue(
            "the window crossed a chromosome boundary and was moved back onto the chromosome"
                .to_string(),
        ),
        DrawOutcome::Unchanged => {
            report.add_issue("no further page in that direction".to_string())
        }
        _ => {}
    }
}

fn write_window(
    data: &WindowData,
    samples: &SampleSelection,
    output: Option<&PathBuf>,
    report: &mut Report,
) -> Result<(), ViewError> {
    let window = &data.window;
    let header = vec![format!(
        "chrom={} first={} last={} variants={}",
        window.coordinate_first_chromosome,
        window.coordinate_first,
        window.coordinate_last,
        window.len()
    )];
    let mut writer = output_stream(output, Some(header)).writer()?;

    let mut columns = vec!["sample".to_string(), "name".to_string()];
    columns.extend(window.variants_coordinates.iter().map(|p| p.to_string()));
    writeln!(writer, "{}", columns.to_tsv())?;

    let mut unloaded = 0;
    for id in samples.ids() {
        let codes: Vec<String> = match data.calls.value(id) {
            Some(calls) => calls
                .variant_types()
                .iter()
                .map(|variant_type| variant_type.to_tsv())
                .collect(),
            None => {
                unloaded += 1;
                vec![".".to_string(); window.len()]
            }
        };
        let name = samples.display_name(id).to_string();
        writeln!(writer, "{}\t{}\t{}", id, name, codes.to_tsv())?;
    }
    writer.flush()?;

    if unloaded > 0 {
        report.add_issue(format!(
            "{} of {} samples have no calls loaded (use --all to fetch them)",
            unloaded,
            samples.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ViewerConfig,
        events::EventBus,
        test_utilities::{sample_list, test_metadata, MockSource},
    };
    use std::rc::Rc;
    use tempfile::tempdir;

    fn controller(cap: usize) -> Controller<MockSource> {
        let mut config = ViewerConfig::default();
        config.initial_sample_cap = cap;
        let source = Rc::new(MockSource::new(test_metadata(sample_list(3))));
        Controller::new(source, Rc::new(EventBus::new()), config)
    }

    #[tokio::test]
    async fn test_chromosomes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chromosomes.tsv");
        let source = MockSource::new(test_metadata(sample_list(1)));
        let output = snpview_chromosomes(&source, Some(&path)).await.unwrap();
        assert_eq!(*output.value(), 3);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2\tchr2\t5\t2000"));
    }

    #[tokio::test]
    async fn test_show_reports_unloaded_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("window.tsv");
        let controller = controller(2);
        let output = snpview_show(&controller, &ShowOptions::default(), Some(&path))
            .await
            .unwrap();
        assert_eq!(*output.value(), DrawOutcome::Displayed);
        assert_eq!(output.report().issues().len(), 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "#chrom=1 first=100 last=300 variants=5");
        assert_eq!(lines[1], "sample\tname\t100\t150\t200\t250\t300");
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("S01\tS01\t"));
        assert_eq!(lines[4], "S03\tS03\t.\t.\t.\t.\t.");
    }

    #[tokio::test]
    async fn test_show_load_all_and_navigate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("window.tsv.gz");
        let controller = controller(2);
        let options = ShowOptions {
            chromosome: Some("2".to_string()),
            forward: 1,
            load_all: true,
            ..Default::default()
        };
        let output = snpview_show(&controller, &options, Some(&path))
            .await
            .unwrap();
        assert!(output.report().is_empty());
        assert_eq!(controller.window().chromosome, ChromosomeId::Numeric(2));
        assert_eq!(controller.window().startpos(), Some(400));
        let data = controller.data().unwrap();
        assert_eq!(data.window().unwrap().calls.loaded_count(), 3);
    }

    #[tokio::test]
    async fn test_show_unknown_chromosome() {
        let controller = controller(2);
        let options = ShowOptions {
            chromosome: Some("chrZ".to_string()),
            ..Default::default()
        };
        let err = snpview_show(&controller, &options, None).await.unwrap_err();
        assert!(matches!(err, ViewError::UnknownChromosome(ref id) if id == "chrZ"));
    }
}
