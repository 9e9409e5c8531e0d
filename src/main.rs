//! Main entry point for the relay server.
//!
//! Loads the settings and card data, starts the dispatch loop on its own
//! arbiter, and serves the STOMP WebSocket endpoint.

use std::sync::Arc;

use actix::{Actor, Arbiter};
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer, web};
use log::{info, warn};

use config::game::DEBUG_FIXED_RNG_SEED;
use config::settings::ServerSettings;
use game::passthrough::PassthroughEngineFactory;
use game::random::{RandomSource, SeededRandom, ThreadRandom};
use game::store::{DirectoryCardStore, SharedCaches};
use server::dispatch::{DispatchLoop, inbound_queue};
use server::game_session::GameServerCore;
use server::state::AppState;

pub mod config;
mod game;
mod server;


#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Arc::new(ServerSettings::load().map_err(std::io::Error::other)?);
    info!("[Config] {:?}", settings);

    let store = DirectoryCardStore::new(settings.carddata_directory.clone());
    let caches = match SharedCaches::load(&store) {
        Ok(caches) => caches,
        Err(e) => {
            warn!(
                "[CardStore] Could not load card data from {}: {}; starting with empty caches",
                settings.carddata_directory.display(),
                e
            );
            SharedCaches::default()
        }
    };
    info!("[CardStore] {} cards cached", caches.card_count());

    let random: Box<dyn RandomSource> = if settings.debug_fixed_rng_seed {
        warn!("[Config] Using fixed RNG seed {}", DEBUG_FIXED_RNG_SEED);
        Box::new(SeededRandom::new(DEBUG_FIXED_RNG_SEED))
    } else {
        Box::new(ThreadRandom)
    };

    let core = GameServerCore::new(
        settings.clone(),
        Arc::new(caches),
        Box::new(PassthroughEngineFactory),
        random,
    );
    let (inbound, receiver) = inbound_queue();
    let dispatch_arbiter = Arbiter::new();
    DispatchLoop::start_in_arbiter(&dispatch_arbiter.handle(), move |_| DispatchLoop::new(core, receiver));

    let state = web::Data::new(AppState::new(inbound));
    let bind = (settings.bind_address.clone(), settings.ws_port);
    info!("[Server] Listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(server::router::config)
    })
    .bind(bind)?
    .run()
    .await
}
