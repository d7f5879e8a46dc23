use std::process::ExitCode;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fuel_finder::config::PipelineConfig;
use fuel_finder::dataset::{DatasetCache, DatasetClient, DatasetLoader, DatasetService};
use fuel_finder::favorites::{FavoritesStore, MemoryDocumentStore};
use fuel_finder::geo::{ChannelSensor, GeolocationWatch};
use fuel_finder::persistence::FileStore;
use fuel_finder::session::{DatasetStatus, PipelineView, Session};

/// How many stations to print.
const LISTED: usize = 10;

/// Upper bound on waiting for the first settled view.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(90);

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let store = FileStore::new(&config.data_dir);

    let client = match DatasetClient::new(config.dataset.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create dataset client");
            return ExitCode::FAILURE;
        }
    };
    let cache = DatasetCache::new(store.clone()).with_ttl(config.cache_ttl);
    let dataset = DatasetService::spawn(DatasetLoader::new(client, cache));

    // The sender must outlive the session.
    let (_identity, identity_rx) = watch::channel(config.user.clone());
    let favorites = FavoritesStore::spawn(
        MemoryDocumentStore::new(),
        store.clone(),
        identity_rx,
        config.favorites,
    )
    .await;

    let position = config.position;
    let mut geolocation = None;
    let mut _feed = None;
    if let Some(coords) = position {
        let (sensor, feed) = ChannelSensor::new();
        feed.position(coords).await;
        geolocation = Some(GeolocationWatch::start(sensor, config.watch));
        _feed = Some(feed);
    }

    let session = Session::spawn(
        dataset,
        favorites,
        geolocation,
        store.clone(),
        &config,
    )
    .await;

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !query.is_empty() {
        session.set_query(query.clone());
    }

    let mut views = session.subscribe();
    let settled = tokio::time::timeout(
        SETTLE_TIMEOUT,
        views.wait_for(|v| {
            !matches!(v.dataset, DatasetStatus::Loading)
                && v.criteria.query == query
                && (position.is_none() || v.position.last_known.is_some())
        }),
    )
    .await;

    let view = match settled {
        Ok(Ok(view)) => view.clone(),
        Ok(Err(_)) => {
            error!("session stopped unexpectedly");
            return ExitCode::FAILURE;
        }
        Err(_) => {
            error!("timed out waiting for station data");
            return ExitCode::FAILURE;
        }
    };

    let code = report(&view);
    session.shutdown().await;
    code
}

fn report(view: &PipelineView) -> ExitCode {
    match &view.dataset {
        DatasetStatus::Failed { message } => {
            error!(error = %message, "station data unavailable");
            return ExitCode::FAILURE;
        }
        DatasetStatus::Ready {
            fetched_at,
            stations,
            origin,
        } => info!(stations, fetched_at = %fetched_at, origin = ?origin, "dataset ready"),
        DatasetStatus::Loading => {}
    }

    for advisory in view.advisories() {
        warn!(?advisory, "advisory");
    }

    let outcome = &view.outcome;
    println!(
        "{} stations match ({}), sorted by {}",
        outcome.visible.len(),
        view.criteria.fuel.label(),
        view.criteria.sort
    );

    for (i, visible) in outcome.visible.iter().take(LISTED).enumerate() {
        let station = &visible.station;
        let distance = visible
            .distance_km
            .map(|d| format!("{d:.1} km"))
            .unwrap_or_default();
        println!(
            "{:>2}. {:<24} {:.3} €/l  {:<30} {}",
            i + 1,
            station.brand,
            visible.price,
            station.municipality,
            distance
        );
    }

    if outcome.average_price > 0.0 {
        println!("Average: {:.3} €/l", outcome.average_price);
    }
    if let Some(nearest) = &outcome.nearest {
        println!(
            "Nearest: {} in {}",
            nearest.station.brand, nearest.station.municipality
        );
    }
    if !view.favorite_stations.is_empty() {
        println!("Favorites:");
        for favorite in &view.favorite_stations {
            println!("  {} ({})", favorite.station.brand, favorite.station.id);
        }
    }

    ExitCode::SUCCESS
}
