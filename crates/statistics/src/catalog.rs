//! The concrete climate statistics and the remote computations behind them.
//!
//! Every remote computation is a [`Computation`]: it knows its cache
//! namespace, its canonical arguments and the image it asks the remote
//! service for. [`StatisticContext`] memoizes each one and combines them into
//! the final [`StatOutput`]s.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use climate_common::time::format_date;
use climate_common::{ClimateResult, DateRange, DateSegment, Raster};
use storage::{CacheArgs, MemoCache};
use tiling::{download_image, BandExpression, CalendarFilter, ImageSpec, Reducer, RemoteRasterService, TilingConfig};

use crate::sampler::{sampled_fraction, DateSample, DEFAULT_SEED};
use crate::seasons::{combine_seasons, month_filters, SeasonScheme, SeasonalSummary};
use crate::segments::SegmentAggregator;

/// Sampling resolution in degrees used by every statistic.
pub const DEFAULT_RESOLUTION: f64 = 0.25;

/// 10 mph in m/s.
pub const TEN_MPH_IN_MPS: f32 = 4.4704;

pub const DEFAULT_SAMPLE_COUNT: usize = 2000;

pub const TEMPERATURE_BANDS: [&str; 2] = ["minimum_2m_air_temperature", "maximum_2m_air_temperature"];

/// Cache namespaces.
pub mod namespaces {
    pub const MEAN_DAILY_STATS: &str = "weather-agg/mean_daily_stats/mean_daily_stats_for_segment";
    pub const CLOUD_COVER: &str = "weather-agg/cloud_cover/cloud_cover_for_segment";
    pub const PRECIPITATION: &str = "weather-agg/precipitation/precipitation_for_range";
    pub const HIGH_DEWPOINT: &str = "weather-agg/dewpoint/high_dewpoint_for_date";
    pub const MEAN_WIND_SPEED: &str = "weather-agg/wind_speed/mean_wind_speed_for_date";
    pub const HIGH_WIND_FRACTION: &str = "weather-agg/wind_speed/high_wind_dates";
}

const ERA5_DAILY: &str = "ECMWF/ERA5/DAILY";
const ERA5_HOURLY: &str = "ECMWF/ERA5/HOURLY";
const ERA5_LAND_HOURLY: &str = "ECMWF/ERA5_LAND/HOURLY";

/// Rain or snow share of total precipitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationKind {
    Rain,
    Snow,
}

impl PrecipitationKind {
    pub const ALL: [PrecipitationKind; 2] = [PrecipitationKind::Rain, PrecipitationKind::Snow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Snow => "snow",
        }
    }

    /// Per-hour expression over precipitation type `pt` and total `tp`.
    fn expression(self) -> BandExpression {
        let text = match self {
            Self::Rain => "rain=(pt <= 4 ? 1 : (pt == 7 ? 0.5 : 0)) * tp",
            Self::Snow => "snow=(pt <= 4 ? 0 : (pt == 7 ? 0.5 : 1)) * tp",
        };
        BandExpression::new(text)
            .bind("pt", "precipitation_type")
            .bind("tp", "total_precipitation")
    }
}

/// One memoized remote computation producing a global raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Computation {
    /// Mean of a daily band over the whole range, optionally restricted to a
    /// day-of-year window.
    MeanDailyStats {
        band: String,
        #[serde(default)]
        filter: Option<CalendarFilter>,
    },
    /// Mean sunshine fraction (`1 - cloud cover` while the sun is up).
    CloudCover { start: NaiveDate, end: NaiveDate },
    /// Total rain or snow over `[start, end)`.
    Precipitation {
        start: NaiveDate,
        end: NaiveDate,
        precipitation: PrecipitationKind,
    },
    /// Maximum hourly dewpoint on one day.
    HighDewpoint { date: NaiveDate },
    /// Mean hourly 10 m wind speed on one day.
    MeanWindSpeed { date: NaiveDate },
}

impl Computation {
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::MeanDailyStats { .. } => namespaces::MEAN_DAILY_STATS,
            Self::CloudCover { .. } => namespaces::CLOUD_COVER,
            Self::Precipitation { .. } => namespaces::PRECIPITATION,
            Self::HighDewpoint { .. } => namespaces::HIGH_DEWPOINT,
            Self::MeanWindSpeed { .. } => namespaces::MEAN_WIND_SPEED,
        }
    }

    /// Canonical cache arguments under `config`.
    pub fn args(&self, config: &CatalogConfig) -> ClimateResult<CacheArgs> {
        let args = CacheArgs::new().with_default("resolution", config.resolution, DEFAULT_RESOLUTION);
        Ok(match self {
            Self::MeanDailyStats { band, filter } => args
                .arg("band", band.as_str())
                .with_default("filter", serde_json::to_value(filter)?, Value::Null)
                .arg("start", format_date(config.range.start))
                .arg("end", format_date(config.range.end)),
            Self::CloudCover { start, end } => args
                .arg("start", format_date(*start))
                .arg("end", format_date(*end)),
            Self::Precipitation { start, end, precipitation } => args
                .arg("start", format_date(*start))
                .arg("end", format_date(*end))
                .arg("precipitation", precipitation.as_str()),
            Self::HighDewpoint { date } | Self::MeanWindSpeed { date } => args.arg("date", format_date(*date)),
        })
    }

    /// The server-side image, the band to download and the tile size.
    pub fn image(&self, range: &DateRange) -> ClimateResult<(ImageSpec, String, u32)> {
        Ok(match self {
            Self::MeanDailyStats { band, filter } => {
                let mut spec = ImageSpec::new(ERA5_DAILY, range.as_segment(), Reducer::Mean);
                if let Some(filter) = filter {
                    spec = spec.with_calendar_filter(*filter);
                }
                (spec, band.clone(), 60)
            }
            Self::CloudCover { start, end } => {
                let expression = BandExpression::new("sun = flux > 0.001 ? (1 - cloud) : 0")
                    .bind("flux", "mean_surface_direct_short_wave_radiation_flux_clear_sky")
                    .bind("cloud", "total_cloud_cover");
                let spec = ImageSpec::new(ERA5_HOURLY, DateSegment::new(*start, *end)?, Reducer::Mean)
                    .with_expression(expression);
                (spec, "sun".to_string(), 45)
            }
            Self::Precipitation { start, end, precipitation } => {
                let spec = ImageSpec::new(ERA5_HOURLY, DateSegment::new(*start, *end)?, Reducer::Sum)
                    .with_expression(precipitation.expression());
                (spec, precipitation.as_str().to_string(), 45)
            }
            Self::HighDewpoint { date } => {
                let spec = ImageSpec::new(ERA5_LAND_HOURLY, one_day(*date)?, Reducer::Max);
                (spec, "dewpoint_temperature_2m".to_string(), 60)
            }
            Self::MeanWindSpeed { date } => {
                let expression = BandExpression::new(
                    "wind_speed = sqrt(u_component_of_wind_10m * u_component_of_wind_10m + v_component_of_wind_10m * v_component_of_wind_10m)",
                )
                .bind("u_component_of_wind_10m", "u_component_of_wind_10m")
                .bind("v_component_of_wind_10m", "v_component_of_wind_10m");
                let spec = ImageSpec::new(ERA5_LAND_HOURLY, one_day(*date)?, Reducer::Mean).with_expression(expression);
                (spec, "wind_speed".to_string(), 60)
            }
        })
    }
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeanDailyStats { band, filter: Some(filter) } => {
                write!(f, "mean_daily_stats({}, days {}-{})", band, filter.start_day, filter.end_day)
            }
            Self::MeanDailyStats { band, filter: None } => write!(f, "mean_daily_stats({})", band),
            Self::CloudCover { start, end } => write!(f, "cloud_cover({}, {})", start, end),
            Self::Precipitation { start, end, precipitation } => {
                write!(f, "precipitation({}, {}, {})", start, end, precipitation.as_str())
            }
            Self::HighDewpoint { date } => write!(f, "high_dewpoint({})", date),
            Self::MeanWindSpeed { date } => write!(f, "mean_wind_speed({})", date),
        }
    }
}

fn one_day(date: NaiveDate) -> ClimateResult<DateSegment> {
    DateSegment::new(date, date + Duration::days(1))
}

/// Physical unit of a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "K")]
    Kelvin,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "m")]
    Meters,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kelvin => "K",
            Self::Percent => "%",
            Self::Meters => "m",
        }
    }
}

/// A finished, named statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct StatOutput {
    pub name: String,
    pub unit: Unit,
    pub raster: Raster,
}

impl StatOutput {
    pub fn new(name: impl Into<String>, unit: Unit, raster: Raster) -> Self {
        Self {
            name: name.into(),
            unit,
            raster,
        }
    }
}

/// Parameters shared by every statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogConfig {
    pub range: DateRange,
    pub resolution: f64,
    pub seed: u64,
    /// Sampled days for the high-wind frequency.
    pub wind_samples: usize,
    /// Sampled days for high dewpoints.
    pub dewpoint_samples: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            resolution: DEFAULT_RESOLUTION,
            seed: DEFAULT_SEED,
            wind_samples: DEFAULT_SAMPLE_COUNT,
            dewpoint_samples: DEFAULT_SAMPLE_COUNT,
        }
    }
}

/// Short name used in output file names, e.g. `maxdaily_temp`.
pub fn band_label(band: &str) -> String {
    match band {
        "minimum_2m_air_temperature" => "mindaily_temp".to_string(),
        "maximum_2m_air_temperature" => "maxdaily_temp".to_string(),
        other => other.to_string(),
    }
}

/// Remote service, cache and configuration for computing statistics.
#[derive(Clone)]
pub struct StatisticContext {
    service: Arc<dyn RemoteRasterService>,
    memo: Arc<MemoCache>,
    config: CatalogConfig,
}

impl StatisticContext {
    pub fn new(service: Arc<dyn RemoteRasterService>, memo: Arc<MemoCache>, config: CatalogConfig) -> Self {
        Self { service, memo, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn memo(&self) -> &Arc<MemoCache> {
        &self.memo
    }

    fn aggregator(&self) -> SegmentAggregator {
        SegmentAggregator::new(self.config.range)
    }

    fn sample(&self) -> DateSample {
        DateSample::new(self.config.range, self.config.seed)
    }

    /// Whether `computation` is already in the cache.
    pub async fn is_cached(&self, computation: &Computation) -> ClimateResult<bool> {
        self.memo
            .contains(computation.namespace(), &computation.args(&self.config)?)
            .await
    }

    /// Run `computation`, or return its cached result.
    #[instrument(skip(self, computation), fields(computation = %computation))]
    pub async fn compute(&self, computation: &Computation) -> ClimateResult<Raster> {
        let args = computation.args(&self.config)?;
        self.memo
            .memoize(computation.namespace(), &args, || async {
                let (spec, band, degree_size) = computation.image(&self.config.range)?;
                let tiling = TilingConfig::new(degree_size, self.config.resolution);
                download_image(self.service.as_ref(), &spec, &band, &tiling).await
            })
            .await
    }

    pub async fn mean_daily_stats_for_segment(&self, band: &str, filter: Option<CalendarFilter>) -> ClimateResult<Raster> {
        self.compute(&Computation::MeanDailyStats {
            band: band.to_string(),
            filter,
        })
        .await
    }

    /// Winter, spring, summer and fall means of `band`.
    pub async fn seasonal_summary(&self, band: &str, scheme: SeasonScheme) -> ClimateResult<SeasonalSummary<Raster>> {
        let filters = scheme.filters();
        let mut values = Vec::with_capacity(filters.len());
        for filter in &filters {
            values.push(self.mean_daily_stats_for_segment(band, Some(*filter)).await?);
        }
        combine_seasons(&filters, values)
    }

    /// Twelve monthly means of `band`, January first.
    pub async fn monthly_means(&self, band: &str) -> ClimateResult<Vec<Raster>> {
        let mut months = Vec::with_capacity(12);
        for filter in month_filters() {
            months.push(self.mean_daily_stats_for_segment(band, Some(filter)).await?);
        }
        Ok(months)
    }

    pub async fn cloud_cover_for_segment(&self, segment: DateSegment) -> ClimateResult<Raster> {
        self.compute(&Computation::CloudCover {
            start: segment.start,
            end: segment.end,
        })
        .await
    }

    /// Day-weighted sunshine fraction over the whole range, by decade.
    pub async fn sunniness(&self) -> ClimateResult<Raster> {
        let aggregator = self.aggregator();
        let decades = aggregator.decade_segments()?;
        aggregator
            .aggregate_with(&decades, |segment| self.cloud_cover_for_segment(segment))
            .await
    }

    pub async fn precipitation_for_range(&self, segment: DateSegment, precipitation: PrecipitationKind) -> ClimateResult<Raster> {
        self.compute(&Computation::Precipitation {
            start: segment.start,
            end: segment.end,
            precipitation,
        })
        .await
    }

    /// Total rain or snow over the range, summed year by year.
    pub async fn precipitation_total(&self, precipitation: PrecipitationKind) -> ClimateResult<Raster> {
        let aggregator = self.aggregator();
        let years = aggregator.yearly_segments()?;
        aggregator
            .sum_with(&years, |segment| self.precipitation_for_range(segment, precipitation))
            .await
    }

    pub async fn high_dewpoint_for_date(&self, date: NaiveDate) -> ClimateResult<Raster> {
        self.compute(&Computation::HighDewpoint { date }).await
    }

    pub async fn mean_wind_speed_for_date(&self, date: NaiveDate) -> ClimateResult<Raster> {
        self.compute(&Computation::MeanWindSpeed { date }).await
    }

    /// Cache arguments of [`Self::high_wind_fraction`].
    pub fn high_wind_args(&self, count: usize) -> CacheArgs {
        CacheArgs::new()
            .arg("count", count)
            .with_default("seed", self.config.seed, DEFAULT_SEED)
            .with_default("resolution", self.config.resolution, DEFAULT_RESOLUTION)
            .arg("start", format_date(self.config.range.start))
            .arg("end", format_date(self.config.range.end))
    }

    /// Fraction of `count` sampled days with mean wind above 10 mph.
    pub async fn high_wind_fraction(&self, count: usize) -> ClimateResult<Raster> {
        let sample = self.sample();
        self.memo
            .memoize(namespaces::HIGH_WIND_FRACTION, &self.high_wind_args(count), || async {
                sampled_fraction(&sample, count, TEN_MPH_IN_MPS, |date| self.mean_wind_speed_for_date(date)).await
            })
            .await
    }

    /// Dates whose dewpoint and wind computations the catalogue samples.
    pub fn sampled_dates(&self, count: usize) -> ClimateResult<Vec<NaiveDate>> {
        self.sample().take(count)
    }

    /// Overall, seasonal and monthly means for both temperature bands.
    pub async fn temperature_stats(&self) -> ClimateResult<Vec<StatOutput>> {
        let mut outputs = Vec::new();
        for band in TEMPERATURE_BANDS {
            let label = band_label(band);

            let overall = self.mean_daily_stats_for_segment(band, None).await?;
            outputs.push(StatOutput::new(format!("{}_overall", label), Unit::Kelvin, overall));

            for scheme in [SeasonScheme::Astronomical, SeasonScheme::Meteorological] {
                let summary = self.seasonal_summary(band, scheme).await?;
                for (season, raster) in summary.into_vec() {
                    outputs.push(StatOutput::new(
                        format!("{}_{}_{}", label, scheme.as_str(), season.as_str()),
                        Unit::Kelvin,
                        raster,
                    ));
                }
            }

            for (i, raster) in self.monthly_means(band).await?.into_iter().enumerate() {
                outputs.push(StatOutput::new(format!("{}_month_{:02}", label, i + 1), Unit::Kelvin, raster));
            }
        }
        Ok(outputs)
    }

    /// Every final statistic.
    pub async fn all_stats(&self) -> ClimateResult<Vec<StatOutput>> {
        let mut outputs = vec![
            StatOutput::new("sunniness", Unit::Percent, self.sunniness().await?),
            StatOutput::new(
                "windspeed_over_10mph",
                Unit::Percent,
                self.high_wind_fraction(self.config.wind_samples).await?,
            ),
        ];
        outputs.extend(self.temperature_stats().await?);
        for precipitation in PrecipitationKind::ALL {
            outputs.push(StatOutput::new(
                format!("{}_total", precipitation.as_str()),
                Unit::Meters,
                self.precipitation_total(precipitation).await?,
            ));
        }

        info!(count = outputs.len(), stats = ?self.memo.stats(), "Computed all statistics");
        Ok(outputs)
    }

    /// Every remote computation [`Self::all_stats`] and the dewpoint sample
    /// depend on, in a flat list suitable for parallel warming.
    pub fn default_plan(&self) -> ClimateResult<Vec<Computation>> {
        let mut plan = Vec::new();

        for band in TEMPERATURE_BANDS {
            plan.push(Computation::MeanDailyStats {
                band: band.to_string(),
                filter: None,
            });
            let filters = SeasonScheme::Astronomical
                .filters()
                .into_iter()
                .chain(SeasonScheme::Meteorological.filters())
                .chain(month_filters());
            for filter in filters {
                plan.push(Computation::MeanDailyStats {
                    band: band.to_string(),
                    filter: Some(filter),
                });
            }
        }

        let aggregator = self.aggregator();
        for segment in aggregator.decade_segments()? {
            plan.push(Computation::CloudCover {
                start: segment.start,
                end: segment.end,
            });
        }
        for segment in aggregator.yearly_segments()? {
            for precipitation in PrecipitationKind::ALL {
                plan.push(Computation::Precipitation {
                    start: segment.start,
                    end: segment.end,
                    precipitation,
                });
            }
        }

        for date in self.sampled_dates(self.config.wind_samples)? {
            plan.push(Computation::MeanWindSpeed { date });
        }
        for date in self.sampled_dates(self.config.dewpoint_samples)? {
            plan.push(Computation::HighDewpoint { date });
        }

        Ok(plan)
    }
}
