//! `geefetch fetch`: composite, export and download per period.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{error, info, warn};

use geefetch_cloud::blocking::Session;
use geefetch_cloud::{ExportJob, ExportSettings, HttpOptions};
use geefetch_core::graph::{Geometry, Image, ImageCollection};
use geefetch_core::imagery::{count_band, Aggregation, IndexRegistry, Sensor, COUNT_BAND};
use geefetch_core::vector::{read_geojson, Bounds, FeatureCollection};
use geefetch_core::{DateRange, EndMode, Period, PeriodGenerator, PeriodSpec};

use crate::{done, open_session, progress_bar, spinner};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Area of interest (GeoJSON in WGS84, or UTM named by its `crs` member)
    #[arg(long)]
    pub aoi: PathBuf,
    /// Export one image per AOI feature instead of one over the whole AOI
    #[arg(long, alias = "splited-aoi")]
    pub split_aoi: bool,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,
    /// End date (YYYY-MM-DD or "now")
    #[arg(long, default_value = "now")]
    pub end: String,
    /// Period length, e.g. 1M, 2w, 10d, Y
    #[arg(long, default_value = "1M")]
    pub period_size: PeriodSpec,
    /// Interval between period starts (default: the period size)
    #[arg(long)]
    pub period_frequency: Option<PeriodSpec>,
    /// Period ends are the last covered day instead of the first uncovered one
    #[arg(long)]
    pub inclusive_end: bool,
    /// Spectral indices to compute (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub indices: Vec<String>,
    /// Raw bands to export, scaled to physical units (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub bands: Vec<String>,
    /// Also export a COUNT band with the number of valid observations per pixel
    #[arg(long)]
    pub count_band: bool,
    /// Output directory (created if missing)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Sensor: sentinel2 or landsat8
    #[arg(long, default_value = "sentinel2")]
    pub sensor: Sensor,
    /// Composite function: median or mean
    #[arg(long, default_value = "median")]
    pub aggr_fn: Aggregation,
    /// Sentinel-2 Cloud Score+ threshold, 0 (keep all) to 1 (clear only)
    #[arg(long, default_value = "0.65")]
    pub cloud_score_threshold: f64,
    /// Output resolution in meters
    #[arg(long, default_value = "10.0")]
    pub res: f64,
    /// Output CRS
    #[arg(long, default_value = "EPSG:4326")]
    pub crs: String,
    /// Service-account credentials (JSON key file)
    #[arg(long, env = "GEEFETCH_CREDENTIALS")]
    pub ee_credentials: Option<PathBuf>,
    /// Cloud project for Earth Engine calls (default: the key's project)
    #[arg(long)]
    pub ee_project: Option<String>,
    /// Drive folder the exports are written to, removed at the end
    #[arg(long, default_value = "GEE")]
    pub drive_folder: String,
    /// Seconds between two export status checks
    #[arg(long, default_value = "10")]
    pub poll_interval: u64,
    /// Retries on transient HTTP failures
    #[arg(long, default_value = "3")]
    pub max_retries: u32,
    /// Seconds a download may stall before it is abandoned
    #[arg(long, default_value = "60")]
    pub read_timeout: u64,
    /// Print the planned exports and exit without contacting any service
    #[arg(long)]
    pub dry_run: bool,
}

// ─── Plan ───────────────────────────────────────────────────────────────

/// One exported quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum Product {
    Index(String),
    Band(String),
    Count,
}

impl Product {
    pub fn label(&self) -> &str {
        match self {
            Product::Index(name) | Product::Band(name) => name,
            Product::Count => COUNT_BAND,
        }
    }
}

/// Export footprint: the whole AOI, or feature `n` when split.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub index: Option<usize>,
    pub bounds: Bounds,
}

/// `<label>_<start>_<end>[_<n>]`
pub fn export_name(product: &Product, period: &Period, region: &Region) -> String {
    let mut name = format!("{}_{}", product.label(), period.label());
    if let Some(n) = region.index {
        name.push_str(&format!("_{n}"));
    }
    name
}

/// Validated configuration of a fetch run.
pub struct FetchPlan {
    pub sensor: Sensor,
    pub aggregation: Aggregation,
    pub cloud_score_threshold: f64,
    pub periods: Vec<Period>,
    pub products: Vec<Product>,
    pub aoi: FeatureCollection,
    pub regions: Vec<Region>,
    pub search_region: Bounds,
    registry: IndexRegistry,
}

impl FetchPlan {
    /// Validate every argument and load the AOI. No remote call is made.
    pub fn from_args(args: &FetchArgs) -> Result<Self> {
        let range = DateRange::parse(&args.start, &args.end).context("Invalid date range")?;
        let mode = if args.inclusive_end {
            EndMode::Inclusive
        } else {
            EndMode::Exclusive
        };
        let periods: Vec<Period> = PeriodGenerator::new(range, args.period_size, args.period_frequency)
            .with_end_mode(mode)
            .iter()
            .collect();

        if !(0.0..=1.0).contains(&args.cloud_score_threshold) {
            bail!(
                "Cloud score threshold must be between 0 and 1, got {}",
                args.cloud_score_threshold
            );
        }
        if args.res <= 0.0 || !args.res.is_finite() {
            bail!("Resolution must be a positive number of meters, got {}", args.res);
        }

        let registry = args.sensor.indices();
        let indices = unique(&args.indices);
        let bands = unique(&args.bands);
        registry.validate(indices.iter().map(String::as_str))?;
        args.sensor.validate_bands(bands.iter().map(String::as_str))?;

        let mut products: Vec<Product> = indices.into_iter().map(Product::Index).collect();
        products.extend(bands.into_iter().map(Product::Band));
        if args.count_band {
            products.push(Product::Count);
        }
        if products.is_empty() {
            bail!("Nothing to export: pass --indices, --bands or --count-band");
        }

        if !args.aoi.exists() {
            bail!("Area of interest {} does not exist", args.aoi.display());
        }
        let aoi = read_geojson(&args.aoi)
            .with_context(|| format!("Failed to read area of interest {}", args.aoi.display()))?;
        let search_region = aoi.total_bounds().context("Area of interest has no geometry")?;
        let regions = if args.split_aoi {
            aoi.feature_bounds()
                .into_iter()
                .enumerate()
                .map(|(n, bounds)| Region {
                    index: Some(n),
                    bounds,
                })
                .collect()
        } else {
            vec![Region {
                index: None,
                bounds: search_region,
            }]
        };

        Ok(Self {
            sensor: args.sensor,
            aggregation: args.aggr_fn,
            cloud_score_threshold: args.cloud_score_threshold,
            periods,
            products,
            aoi,
            regions,
            search_region,
            registry,
        })
    }

    /// Export names planned for `period`, in export order.
    pub fn names(&self, period: &Period) -> Vec<String> {
        self.regions
            .iter()
            .flat_map(|region| {
                self.products
                    .iter()
                    .map(move |product| export_name(product, period, region))
            })
            .collect()
    }

    /// Cloud-masked images of `period`.
    pub fn images(&self, period: &Period) -> ImageCollection {
        self.sensor.cloudless_images(
            &Geometry::rectangle(&self.search_region),
            period,
            self.cloud_score_threshold,
        )
    }

    /// Export jobs of `period` built from its masked `images`.
    pub fn jobs(&self, period: &Period, images: &ImageCollection) -> Result<Vec<ExportJob>> {
        let composite = self
            .aggregation
            .apply(images)
            .clip(&Geometry::from_aoi(&self.aoi)?);

        let mut jobs = Vec::new();
        for region in &self.regions {
            for product in &self.products {
                let image = self.product_image(product, &composite, images)?;
                jobs.push(ExportJob::new(
                    export_name(product, period, region),
                    image,
                    region.bounds,
                ));
            }
        }
        Ok(jobs)
    }

    fn product_image(
        &self,
        product: &Product,
        composite: &Image,
        images: &ImageCollection,
    ) -> Result<Image> {
        Ok(match product {
            Product::Index(name) => self.registry.apply(name, composite)?,
            Product::Band(name) => self.sensor.band(composite, name)?,
            Product::Count => count_band(images, self.sensor.count_source_band()),
        })
    }
}

/// Trimmed, non-empty names without duplicates, in first-seen order.
fn unique(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

// ─── Run ────────────────────────────────────────────────────────────────

pub fn run(args: FetchArgs) -> Result<()> {
    let plan = FetchPlan::from_args(&args)?;
    info!(
        "{} period(s), {} export(s) per period",
        plan.periods.len(),
        plan.regions.len() * plan.products.len()
    );

    if args.dry_run {
        for period in &plan.periods {
            println!("{period}");
            for name in plan.names(period) {
                println!("  {name}");
            }
        }
        return Ok(());
    }

    let credentials = args
        .ee_credentials
        .as_deref()
        .context("Missing --ee-credentials (or GEEFETCH_CREDENTIALS)")?;
    if !credentials.exists() {
        bail!(
            "Google Earth Engine credentials {} does not exist",
            credentials.display()
        );
    }
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    let http = HttpOptions {
        max_retries: args.max_retries,
        read_timeout: Duration::from_secs(args.read_timeout),
        ..HttpOptions::default()
    };
    let session = open_session(
        credentials,
        args.ee_project.clone(),
        http,
        Duration::from_secs(args.poll_interval),
    )?;
    info!("Earth Engine project: {}", session.project());

    let jobs = prepare_jobs(&session, &plan)?;
    if jobs.is_empty() {
        warn!("No images found for any period, nothing to export");
        return Ok(());
    }

    let settings = ExportSettings {
        folder: args.drive_folder.clone(),
        crs: args.crs.clone(),
        scale: args.res,
    };
    let failures = run_exports(&session, &jobs, &settings, &args.output);

    match session.clean_drive_folder(&settings.folder) {
        Ok(n) if n > 0 => info!("Removed Drive folder {}", settings.folder),
        Ok(_) => {}
        Err(e) => warn!("Failed to clean Drive folder {}: {}", settings.folder, e),
    }

    info!(
        "{} of {} export(s) downloaded to {}",
        jobs.len() - failures.len(),
        jobs.len(),
        args.output.display()
    );
    if !failures.is_empty() {
        for (name, reason) in &failures {
            error!("{}: {}", name, reason);
        }
        bail!("{} of {} exports failed", failures.len(), jobs.len());
    }
    Ok(())
}

/// Build the export jobs of every period that has at least one image.
fn prepare_jobs(session: &Session, plan: &FetchPlan) -> Result<Vec<ExportJob>> {
    let mut jobs = Vec::new();
    for period in &plan.periods {
        let pb = spinner(&format!("Preparing period {period}..."));
        let images = plan.images(period);
        let empty = session
            .collection_is_empty(&images)
            .with_context(|| format!("Failed to query images for period {period}"))?;
        pb.finish_and_clear();

        if empty {
            info!("No images found for period {}, skipping", period);
            continue;
        }
        let period_jobs = plan.jobs(period, &images)?;
        for job in &period_jobs {
            info!("[+] {}", job.name);
        }
        jobs.extend(period_jobs);
    }
    Ok(jobs)
}

/// Run every job in order; returns the failed ones with their error.
fn run_exports(
    session: &Session,
    jobs: &[ExportJob],
    settings: &ExportSettings,
    output: &Path,
) -> Vec<(String, String)> {
    let pb = progress_bar(jobs.len() as u64);
    let mut failures = Vec::new();

    for job in jobs {
        pb.set_message(format!("Exporting {}", job.name));
        let start = Instant::now();
        match session.export_and_download(job, settings, output) {
            Ok(paths) => {
                for path in &paths {
                    pb.suspend(|| done(&job.name, path, start.elapsed()));
                }
            }
            Err(e) => {
                pb.suspend(|| error!("Export {} failed: {}", job.name, e));
                failures.push((job.name.clone(), e.to_string()));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        fetch: FetchArgs,
    }

    const AOI: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [5, 6]}}
        ]
    }"#;

    fn aoi_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".geojson").tempfile().unwrap();
        f.write_all(AOI.as_bytes()).unwrap();
        f
    }

    fn args(aoi: &Path, extra: &[&str]) -> FetchArgs {
        let mut argv = vec![
            "geefetch",
            "--aoi",
            aoi.to_str().unwrap(),
            "--start",
            "2020-01-01",
            "--end",
            "2020-03-01",
            "--output",
            "out",
        ];
        argv.extend_from_slice(extra);
        TestCli::try_parse_from(argv).unwrap().fetch
    }

    #[test]
    fn names_follow_product_period_region() {
        let aoi = aoi_file();
        let plan = FetchPlan::from_args(&args(
            aoi.path(),
            &["--indices", "NDVI,NBR", "--bands", "B4", "--count-band", "--split-aoi"],
        ))
        .unwrap();

        assert_eq!(plan.regions.len(), 2);
        let names = plan.names(&plan.periods[0]);
        assert_eq!(
            names,
            [
                "NDVI_2020-01-01_2020-02-01_0",
                "NBR_2020-01-01_2020-02-01_0",
                "B4_2020-01-01_2020-02-01_0",
                "COUNT_2020-01-01_2020-02-01_0",
                "NDVI_2020-01-01_2020-02-01_1",
                "NBR_2020-01-01_2020-02-01_1",
                "B4_2020-01-01_2020-02-01_1",
                "COUNT_2020-01-01_2020-02-01_1",
            ]
        );
    }

    #[test]
    fn whole_aoi_has_no_suffix_and_total_bounds() {
        let aoi = aoi_file();
        let plan = FetchPlan::from_args(&args(aoi.path(), &["--indices", "NDVI"])).unwrap();
        assert_eq!(plan.regions.len(), 1);
        assert_eq!(plan.regions[0].bounds, Bounds::new(0.0, 0.0, 5.0, 6.0));
        assert_eq!(plan.names(&plan.periods[1]), ["NDVI_2020-02-01_2020-03-01"]);
    }

    #[test]
    fn duplicate_indices_are_exported_once() {
        let aoi = aoi_file();
        let plan = FetchPlan::from_args(&args(
            aoi.path(),
            &["--indices", "NDVI", "--indices", " NDVI,NBR,"],
        ))
        .unwrap();
        assert_eq!(
            plan.products,
            [
                Product::Index("NDVI".into()),
                Product::Index("NBR".into())
            ]
        );
    }

    #[test]
    fn unknown_index_and_band_are_rejected() {
        let aoi = aoi_file();
        let err = FetchPlan::from_args(&args(aoi.path(), &["--indices", "EVI"])).err().unwrap();
        assert!(err.to_string().contains("Unknown index: EVI"));

        let err = FetchPlan::from_args(&args(
            aoi.path(),
            &["--sensor", "landsat8", "--bands", "B4"],
        ))
        .err()
        .unwrap();
        assert!(err.to_string().contains("Unknown band: B4"));
    }

    #[test]
    fn nothing_to_export_is_an_error() {
        let aoi = aoi_file();
        assert!(FetchPlan::from_args(&args(aoi.path(), &[])).is_err());
    }

    #[test]
    fn jobs_use_registry_and_count_band() {
        let aoi = aoi_file();
        let plan = FetchPlan::from_args(&args(
            aoi.path(),
            &["--indices", "NDVI", "--count-band"],
        ))
        .unwrap();
        let period = plan.periods[0];
        let jobs = plan.jobs(&period, &plan.images(&period)).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].image.value().function_name(), Some("Image.rename"));
        assert_eq!(jobs[1].name, "COUNT_2020-01-01_2020-02-01");
        assert_eq!(jobs[1].region, Bounds::new(0.0, 0.0, 5.0, 6.0));
    }
}
