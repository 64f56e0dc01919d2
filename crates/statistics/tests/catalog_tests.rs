//! Statistic catalogue against the in-memory remote service.

use std::sync::Arc;

use chrono::Datelike;
use climate_common::{ClimateError, DateRange};
use statistics::{CatalogConfig, PrecipitationKind, SeasonScheme, StatisticContext};
use storage::{MemoCache, MemoryStore};
use test_utils::{assert_approx_eq, assert_raster_approx_eq, FakeRasterService};

/// Coarse resolution keeps every global raster at 36x72.
const RESOLUTION: f64 = 5.0;

fn context(service: Arc<FakeRasterService>, config: CatalogConfig) -> StatisticContext {
    let memo = Arc::new(MemoCache::new(Arc::new(MemoryStore::new())));
    StatisticContext::new(service, memo, config)
}

fn coarse() -> CatalogConfig {
    CatalogConfig {
        resolution: RESOLUTION,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_sunniness_of_constant_field_is_constant() {
    let service = Arc::new(FakeRasterService::constant(1.0));
    let ctx = context(service.clone(), coarse());

    let sunniness = ctx.sunniness().await.unwrap();

    assert_eq!(sunniness.shape(), (36, 72));
    assert_raster_approx_eq!(sunniness, 1.0, 1e-6);
    // one evaluation per decade
    assert_eq!(service.evaluate_calls(), 3);
}

#[tokio::test]
async fn test_sunniness_weights_decades_by_days() {
    let service = Arc::new(FakeRasterService::with_values(|spec, _, _, _| {
        match spec.window.start.year() {
            1990 => 0.0,
            2000 => 0.5,
            _ => 1.0,
        }
    }));
    let ctx = context(service, coarse());

    let sunniness = ctx.sunniness().await.unwrap();

    // 3652, 3653 and 3652 days
    let expected = (3653.0 * 0.5 + 3652.0 * 1.0) / 10957.0;
    assert_raster_approx_eq!(sunniness, expected, 1e-5);
}

#[tokio::test]
async fn test_second_run_makes_no_remote_calls() {
    let service = Arc::new(FakeRasterService::constant(0.3));
    let ctx = context(service.clone(), coarse());

    let first = ctx.sunniness().await.unwrap();
    let calls = service.total_calls();
    let second = ctx.sunniness().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(service.total_calls(), calls);
}

#[tokio::test]
async fn test_precipitation_total_sums_years() {
    let service = Arc::new(FakeRasterService::with_values(|_, band, _, _| match band {
        "rain" => 1.0,
        _ => 0.25,
    }));
    let ctx = context(service.clone(), coarse());

    let rain = ctx.precipitation_total(PrecipitationKind::Rain).await.unwrap();
    let snow = ctx.precipitation_total(PrecipitationKind::Snow).await.unwrap();

    assert_raster_approx_eq!(rain, 30.0, 1e-4);
    assert_raster_approx_eq!(snow, 7.5, 1e-4);
    assert_eq!(service.evaluate_calls(), 60);
}

#[tokio::test]
async fn test_seasonal_winter_combines_both_year_ends() {
    // early-winter filter returns 0, late-winter filter returns 88, others their start day
    let service = Arc::new(FakeRasterService::with_values(|spec, _, _, _| {
        match spec.calendar_filter {
            Some(f) if f.start_day == 1 => 0.0,
            Some(f) if f.end_day == 365 => 88.0,
            Some(f) => f.start_day as f32,
            None => -1.0,
        }
    }));
    let ctx = context(service, coarse());

    let summary = ctx
        .seasonal_summary("maximum_2m_air_temperature", SeasonScheme::Astronomical)
        .await
        .unwrap();

    // winter pieces are 78 and 10 days long
    assert_raster_approx_eq!(summary.winter, 10.0, 1e-4);
    assert_raster_approx_eq!(summary.spring, 79.0, 1e-6);
    assert_raster_approx_eq!(summary.summer, 172.0, 1e-6);
    assert_raster_approx_eq!(summary.fall, 265.0, 1e-6);
}

#[tokio::test]
async fn test_high_wind_fraction_counts_sampled_days() {
    // windy on even days of the month
    let service = Arc::new(FakeRasterService::with_values(|spec, _, _, _| {
        if spec.window.start.day() % 2 == 0 {
            10.0
        } else {
            1.0
        }
    }));
    let config = CatalogConfig {
        range: DateRange::parse("2001-01-01", "2001-12-31").unwrap(),
        resolution: RESOLUTION,
        wind_samples: 20,
        ..Default::default()
    };
    let ctx = context(service.clone(), config);

    let dates = ctx.sampled_dates(20).unwrap();
    let windy = dates.iter().filter(|d| d.day() % 2 == 0).count();

    let fraction = ctx.high_wind_fraction(20).await.unwrap();
    assert_raster_approx_eq!(fraction, windy as f64 / 20.0, 1e-6);
    assert_eq!(service.evaluate_calls(), 20);

    // the fraction itself is memoized
    ctx.high_wind_fraction(20).await.unwrap();
    assert_eq!(service.evaluate_calls(), 20);
    assert!(ctx.memo().stats().hits >= 1);
}

#[tokio::test]
async fn test_missing_segment_aborts_aggregation() {
    let service = Arc::new(FakeRasterService::constant(1.0).without_band("sun"));
    let ctx = context(service.clone(), coarse());

    let err = ctx.sunniness().await.unwrap_err();
    assert!(matches!(err, ClimateError::DataUnavailable { .. }));
    // the first decade failed, so nothing else was attempted
    assert_eq!(service.evaluate_calls(), 1);
    assert_eq!(ctx.memo().stats().stores, 0);
}

#[tokio::test]
async fn test_default_plan_covers_all_stats() {
    let config = CatalogConfig {
        range: DateRange::parse("2001-01-01", "2002-12-31").unwrap(),
        resolution: RESOLUTION,
        wind_samples: 3,
        dewpoint_samples: 2,
        ..Default::default()
    };
    let service = Arc::new(FakeRasterService::constant(2.0));
    let ctx = context(service.clone(), config);

    let plan = ctx.default_plan().unwrap();
    // 2 bands x (1 + 5 + 5 + 12), 1 decade, 2 years x 2 kinds, 3 wind + 2 dewpoint days
    assert_eq!(plan.len(), 46 + 1 + 4 + 5);

    for computation in &plan {
        ctx.compute(computation).await.unwrap();
    }
    let warmed = service.total_calls();

    let stats = ctx.all_stats().await.unwrap();
    assert_eq!(service.total_calls(), warmed);
    assert_eq!(stats.len(), 2 + 2 * (1 + 4 + 4 + 12) + 2);
    assert!(stats.iter().any(|s| s.name == "maxdaily_temp_month_07"));
    assert_approx_eq!(stats[0].raster.mean(), 2.0, 1e-5);
}
