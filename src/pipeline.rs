use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::app;
use crate::config::Config;
use crate::data::decoder::RegionDecoder;
use crate::data::loader::load_store;
use crate::data::model::Survey;
use crate::data::store::Store;
use crate::error::{MaskError, Result};
use crate::mask::{transform_region, Calibration};
use crate::publish::{HttpTransport, Publisher, Transport};
use crate::ui::raster::{image_path, save_png};
use crate::ui::scene::Scene;

// ---------------------------------------------------------------------------
// Sinks – the optional consumers of a decoded survey
// ---------------------------------------------------------------------------

/// Something a run does with a decoded survey.
pub trait SurveySink {
    fn name(&self) -> &'static str;
    fn consume(&mut self, survey: &Survey) -> Result<()>;
}

/// Transforms each region's mask and posts it to LSSS.
///
/// Regions are posted in file order; the first failure stops the rest.
pub struct PublishSink<T> {
    publisher: Publisher<T>,
    calibration: Calibration,
    published: usize,
}

impl<T: Transport> PublishSink<T> {
    pub fn new(publisher: Publisher<T>, calibration: Calibration) -> Self {
        PublishSink {
            publisher,
            calibration,
            published: 0,
        }
    }

    pub fn publisher(&self) -> &Publisher<T> {
        &self.publisher
    }

    /// Regions posted so far.
    pub fn published(&self) -> usize {
        self.published
    }
}

impl<T: Transport> SurveySink for PublishSink<T> {
    fn name(&self) -> &'static str {
        "publish"
    }

    fn consume(&mut self, survey: &Survey) -> Result<()> {
        for region in &survey.regions {
            let records = transform_region(region, &self.calibration)?;
            if self.publisher.publish_mask(region, &records)? {
                self.published += 1;
            }
        }
        Ok(())
    }
}

/// Writes each region's ping records as one JSON line.
pub struct PrintSink<W> {
    out: W,
    calibration: Calibration,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W, calibration: Calibration) -> Self {
        PrintSink { out, calibration }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SurveySink for PrintSink<W> {
    fn name(&self) -> &'static str {
        "print"
    }

    fn consume(&mut self, survey: &Survey) -> Result<()> {
        for region in &survey.regions {
            let records = transform_region(region, &self.calibration)?;
            let line = serde_json::to_string(&records)
                .map_err(|e| MaskError::Render(format!("serialising region {}: {e}", region.id)))?;
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

/// Writes `<stem>.png` beside the input file.
pub struct ImageSink;

impl SurveySink for ImageSink {
    fn name(&self) -> &'static str {
        "image"
    }

    fn consume(&mut self, survey: &Survey) -> Result<()> {
        save_png(&Scene::from_survey(survey), &image_path(&survey.source))
    }
}

/// Opens the interactive viewer and blocks until it is closed.
pub struct ViewerSink;

impl SurveySink for ViewerSink {
    fn name(&self) -> &'static str {
        "viewer"
    }

    fn consume(&mut self, survey: &Survey) -> Result<()> {
        app::show(survey.clone())
    }
}

// ---------------------------------------------------------------------------
// Pipeline – decode once, hand the survey to every enabled sink
// ---------------------------------------------------------------------------

pub struct Pipeline {
    decoder: RegionDecoder,
    sinks: Vec<Box<dyn SurveySink>>,
}

impl Pipeline {
    pub fn new(sinks: Vec<Box<dyn SurveySink>>) -> Self {
        Pipeline {
            decoder: RegionDecoder::new(),
            sinks,
        }
    }

    /// Sinks for the outputs enabled in `config`, in the order they run:
    /// print, publish, image, viewer.
    pub fn from_config(config: &Config, print_json: bool) -> Result<Self> {
        let mut sinks: Vec<Box<dyn SurveySink>> = Vec::new();
        if print_json {
            sinks.push(Box::new(PrintSink::new(
                std::io::stdout(),
                config.calibration.into(),
            )));
        }
        if config.outputs.publish {
            let publisher = Publisher::new(config.base_url.clone(), HttpTransport::new()?);
            sinks.push(Box::new(PublishSink::new(
                publisher,
                config.calibration.into(),
            )));
        }
        if config.outputs.save_image {
            sinks.push(Box::new(ImageSink));
        }
        if config.outputs.show {
            sinks.push(Box::new(ViewerSink));
        }
        Ok(Self::new(sinks))
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Decode `store` and feed the survey to every sink.
    pub fn run_store(&mut self, store: &dyn Store, source: &Path) -> Result<Survey> {
        let survey = self.decoder.decode(store, source)?;
        for sink in &mut self.sinks {
            log::debug!("running {} output for {}", sink.name(), source.display());
            sink.consume(&survey)?;
        }
        Ok(survey)
    }

    /// Open `path`, process it and release the store.
    pub fn run_file(&mut self, path: &Path) -> anyhow::Result<Survey> {
        log::info!("Processing {}", path.display());
        let store = load_store(path).with_context(|| format!("opening {}", path.display()))?;
        let survey = self
            .run_store(store.as_ref(), path)
            .with_context(|| format!("processing {}", path.display()))?;
        Ok(survey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::decoder::tests::sample_store;
    use crate::data::decoder::INTERPRETATION_GROUP;
    use crate::data::store::{Array, MemoryStore, Variable};
    use crate::publish::tests::RecordingTransport;
    use crate::publish::{Body, DEFAULT_BASE_URL};

    fn publish_sink(responses: Vec<(u16, &str)>) -> PublishSink<RecordingTransport> {
        PublishSink::new(
            Publisher::new(DEFAULT_BASE_URL, RecordingTransport::answering(responses)),
            Calibration::default(),
        )
    }

    fn decode(store: &MemoryStore) -> Survey {
        RegionDecoder::new()
            .decode(store, Path::new("demo_mask.json"))
            .unwrap()
    }

    /// Give region 2 a one-ping mask so both regions publish.
    fn two_mask_store() -> MemoryStore {
        let g = INTERPRETATION_GROUP;
        let mut store = sample_store();
        store.insert(
            format!("{g}/mask_times"),
            Variable::new(Array::Ragged(vec![
                Array::Float(vec![100000.0, 200000.0]),
                Array::Float(vec![300000.0]),
            ]))
            .with_attr("units", "ms")
            .with_attr("calendar", "gregorian"),
        );
        store.insert(
            format!("{g}/mask_depths"),
            Variable::new(Array::Ragged(vec![
                Array::Ragged(vec![
                    Array::Float(vec![10.0, 20.0]),
                    Array::Float(vec![15.0, 60.0, 70.0, 90.0]),
                ]),
                Array::Ragged(vec![Array::Float(vec![5.0, 25.0])]),
            ]))
            .with_attr("units", "m"),
        );
        store
    }

    #[test]
    fn publishes_non_empty_regions_only() {
        let mut sink = publish_sink(vec![]);
        sink.consume(&decode(&sample_store())).unwrap();

        assert_eq!(sink.published(), 1);
        let requests = sink.publisher().transport().requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].0,
            "http://localhost:8000/lsss/module/PelagicEchogramModule/school-mask"
        );
        assert_eq!(
            requests[0].1,
            Body::Json(serde_json::json!([
                {"pingNumber": -13189163900i64, "depthRanges": [{"min": 60.0, "max": 77.0}]},
                {"pingNumber": -13189163800i64, "depthRanges": [
                    {"min": 65.0, "max": 117.0},
                    {"min": 120.0, "max": 147.0}
                ]}
            ]))
        );
    }

    #[test]
    fn rejected_region_stops_later_regions() {
        let mut sink = publish_sink(vec![(500, "internal error")]);
        let err = sink.consume(&decode(&two_mask_store())).unwrap_err();

        assert!(matches!(err, MaskError::RemoteRejected { status: 500, .. }));
        assert_eq!(sink.published(), 0);
        assert_eq!(sink.publisher().transport().requests.borrow().len(), 1);
    }

    #[test]
    fn malformed_mask_stops_before_posting() {
        let mut store = two_mask_store();
        store.insert(
            format!("{INTERPRETATION_GROUP}/mask_depths"),
            Variable::new(Array::Ragged(vec![
                Array::Ragged(vec![
                    Array::Float(vec![10.0, 20.0]),
                    Array::Float(vec![15.0, 60.0, 70.0]),
                ]),
                Array::Ragged(vec![Array::Float(vec![5.0, 25.0])]),
            ]))
            .with_attr("units", "m"),
        );
        let mut sink = publish_sink(vec![]);
        let err = sink.consume(&decode(&store)).unwrap_err();

        assert!(matches!(err, MaskError::MalformedMask { region_id: 1, ping_index: 1, .. }));
        assert!(sink.publisher().transport().requests.borrow().is_empty());
    }

    #[test]
    fn print_sink_writes_one_line_per_region() {
        let mut sink = PrintSink::new(Vec::new(), Calibration::default());
        sink.consume(&decode(&sample_store())).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"[{"pingNumber":-13189163900"#));
        assert_eq!(lines[1], "[]");
    }

    #[test]
    fn pipeline_runs_sinks_in_order_on_one_survey() {
        let mut pipeline = Pipeline::new(vec![Box::new(PrintSink::new(
            std::io::sink(),
            Calibration::default(),
        ))]);
        let survey = pipeline
            .run_store(&sample_store(), Path::new("demo_mask.json"))
            .unwrap();
        assert_eq!(survey.len(), 2);
        assert_eq!(pipeline.sink_names(), vec!["print"]);
    }

    #[test]
    fn from_config_selects_enabled_outputs() {
        let mut config = Config::default();
        config.outputs.publish = false;
        config.outputs.save_image = true;
        let pipeline = Pipeline::from_config(&config, true).unwrap();
        assert_eq!(pipeline.sink_names(), vec!["print", "image"]);
    }

    #[test]
    fn run_file_writes_image_beside_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo_mask.json");
        std::fs::write(
            &path,
            r#"{ "Interpretation/v1": {
                "mask_times":  { "data": [[100000, 200000]], "attrs": { "units": "ms", "calendar": "gregorian" } },
                "mask_depths": { "data": [[[10, 20], [15, 60, 70, 90]]], "attrs": { "units": "m" } },
                "sound_speed": { "data": 1500, "attrs": { "units": "m/s" } },
                "min_depth": { "data": [10] }, "max_depth": { "data": [90] },
                "start_time": { "data": [100000] }, "end_time": { "data": [200000] },
                "region_id": { "data": [1] }, "region_name": { "data": ["school"] },
                "region_type": { "data": [0], "enum": { "TRACKING": 0 } },
                "region_category_ids": { "data": [1] },
                "region_category_names": { "data": ["herring"] },
                "region_category_proportions": { "data": [1.0] }
            } }"#,
        )
        .unwrap();

        let mut pipeline = Pipeline::new(vec![Box::new(ImageSink)]);
        let survey = pipeline.run_file(&path).unwrap();

        assert_eq!(survey.regions[0].type_name, "TRACKING");
        assert!(dir.path().join("demo_mask.png").exists());
    }

    #[test]
    fn missing_file_reports_path() {
        let mut pipeline = Pipeline::new(Vec::new());
        let err = pipeline.run_file(Path::new("does/not/exist.json")).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.json"));
    }
}
