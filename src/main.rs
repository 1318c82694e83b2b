use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aptos_copytrade::{
    api::{self, AppState},
    aptos::{AptosClient, NodeReader},
    catalog::{Catalog, SortKey},
    following::FollowingStore,
    metrics::Metrics,
    trading::{DeskSettings, Poller, TradingDesk},
    utils::config::{Config, VenueMode},
    venue::{mock::MockVenue, rest::RestVenue, PerpsVenue},
    wallet::{
        key_wallet::KeyWallet, mock::MockWallet, NotificationLevel, ProviderInfo, ReadyState, WalletAdapter,
        WalletManager,
    },
};

struct Wiring {
    adapter: Arc<dyn WalletAdapter>,
    node: Arc<dyn NodeReader>,
    venue: Arc<dyn PerpsVenue>,
}

fn mock_wiring() -> Wiring {
    warn!("Venue set to MOCK MODE, nothing is sent on-chain");
    let venue = Arc::new(MockVenue::new());
    venue.set_apt_balance(MockWallet::DEFAULT_ADDRESS, 500_000_000);
    venue.set_usdc_balance(MockWallet::DEFAULT_ADDRESS, 50_000_000);

    let providers = vec![
        ProviderInfo::new("Petra", ReadyState::Installed),
        ProviderInfo::new("Martian", ReadyState::NotDetected),
        ProviderInfo::new("Pontem Wallet", ReadyState::Loadable),
    ];
    let adapter = Arc::new(MockWallet::new(providers).with_venue(venue.clone()));

    Wiring {
        adapter,
        node: venue.clone(),
        venue,
    }
}

fn rest_wiring(config: &Config) -> Result<Wiring> {
    let private_key = config
        .wallet
        .private_key
        .as_deref()
        .ok_or_else(|| anyhow!("venue.mode = rest needs wallet.private_key or APTOS_PRIVATE_KEY"))?;

    let client = Arc::new(AptosClient::new(config.aptos.clone()));
    let wallet = KeyWallet::from_hex(config.wallet.provider_name.clone(), private_key, client.clone())?;
    info!("Local key wallet address: {}", wallet.address());

    let venue = Arc::new(RestVenue::new(&config.venue, client.clone()));
    Ok(Wiring {
        adapter: Arc::new(wallet),
        node: client,
        venue,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting Aptos copy-trading session...");
    let metrics = Metrics::new()?;

    let wiring = match config.venue.mode {
        VenueMode::Mock => mock_wiring(),
        VenueMode::Rest => rest_wiring(&config)?,
    };

    let manager = Arc::new(WalletManager::new(wiring.adapter.clone(), wiring.node.clone()));
    let mut notifications = manager.notifications();
    tokio::spawn(async move {
        while let Ok(note) = notifications.recv().await {
            match note.level {
                NotificationLevel::Info => info!("{}: {}", note.title, note.description),
                NotificationLevel::Error => error!("{}: {}", note.title, note.description),
            }
        }
    });

    let following = Arc::new(FollowingStore::new(&config.storage.following_path));
    let connected = if config.wallet.connect_first_available {
        matches!(manager.connect_first_available().await, Ok(Some(_)))
    } else {
        manager.connect_wallet(config.wallet.kind).await.is_ok()
    };
    if connected {
        let session = manager.session();
        info!("Connected {} with {} APT", session.address.as_deref().unwrap_or("-"), session.balance);
        if let Some(address) = session.address.as_deref() {
            match following.load_or_init(address) {
                Ok(record) => info!("Following {} traders", record.following.len()),
                Err(e) => warn!("Could not load following cache: {}", e),
            }
        }
    }

    let desk = Arc::new(TradingDesk::new(
        wiring.venue,
        manager.clone(),
        wiring.node,
        DeskSettings::from(&config),
        metrics.clone(),
    ));
    let price_feed = desk.clone().spawn_price_feed();
    let poller = Poller::start(
        desk.clone(),
        manager.subscribe(),
        Duration::from_secs(config.session.poll_interval_secs),
        metrics.clone(),
    );

    let catalog = Catalog::mock();
    for trader in catalog.discover("", SortKey::Roi).iter().take(3) {
        info!("Top trader {}: {}% ROI, {} followers", trader.name, trader.stats.roi, trader.stats.followers);
    }

    let api_server = async {
        if config.api.enabled {
            let state = AppState {
                desk: desk.clone(),
                catalog,
                following: following.clone(),
                metrics: metrics.clone(),
            };
            api::serve(state, &config.api.bind_address).await
        } else {
            std::future::pending().await
        }
    };

    tokio::select! {
        result = api_server => {
            if let Err(e) = result {
                error!("Status API stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    poller.stop().await;
    price_feed.abort();
    if manager.session().connected {
        manager.disconnect_wallet().await;
    }
    info!("Session closed");
    Ok(())
}
