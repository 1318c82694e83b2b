use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::{models, Catalog, PortfolioSummary, SortKey, TraderProfile, TraderSummary};
use crate::following::{CopyMarket, CopySettings, FollowingStore};
use crate::metrics::Metrics;
use crate::trading::desk::{DeskState, TradingDesk};
use crate::wallet::session::WalletSession;

pub struct AppState {
    pub desk: Arc<TradingDesk>,
    pub catalog: Catalog,
    pub following: Arc<FollowingStore>,
    pub metrics: Metrics,
}

#[derive(Serialize)]
struct StatusResponse {
    wallet: WalletSession,
    desk: DeskState,
    portfolio: PortfolioSummary,
}

#[derive(Deserialize)]
struct DiscoverQuery {
    #[serde(default)]
    query: String,
    #[serde(default)]
    sort: SortKey,
}

#[derive(Serialize)]
struct ProfileResponse {
    #[serde(flatten)]
    profile: TraderProfile,
    similar: Vec<TraderSummary>,
    following: bool,
}

#[derive(Deserialize)]
struct FollowRequest {
    #[serde(default = "default_allocation")]
    allocation: u8,
    #[serde(default)]
    settings: CopySettings,
}

fn default_allocation() -> u8 {
    10
}

async fn get_status(data: web::Data<AppState>) -> impl Responder {
    let wallet = data.desk.wallet().session();
    let portfolio = PortfolioSummary::from_balance(&wallet.balance);
    HttpResponse::Ok().json(StatusResponse {
        wallet,
        desk: data.desk.snapshot().await,
        portfolio,
    })
}

async fn get_traders(data: web::Data<AppState>, query: web::Query<DiscoverQuery>) -> impl Responder {
    HttpResponse::Ok().json(data.catalog.discover(&query.query, query.sort))
}

async fn get_trader(data: web::Data<AppState>, id: web::Path<String>) -> impl Responder {
    match data.catalog.profile(&id) {
        Some(profile) => HttpResponse::Ok().json(ProfileResponse {
            similar: data.catalog.similar_traders(&id),
            following: data.following.is_following(&id),
            profile,
        }),
        None => HttpResponse::NotFound().body("Trader Not Found"),
    }
}

async fn get_positions(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.desk.snapshot().await.positions)
}

async fn get_following(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.following.list())
}

async fn follow(
    data: web::Data<AppState>,
    id: web::Path<String>,
    req: web::Json<FollowRequest>,
) -> impl Responder {
    let Some(trader) = data.catalog.trader(&id).cloned() else {
        return HttpResponse::NotFound().body("Trader Not Found");
    };
    let store = data.following.clone();
    let FollowRequest { allocation, settings } = req.into_inner();

    match web::block(move || store.follow(&trader, allocation, settings)).await {
        Ok(Ok(record)) => HttpResponse::Ok().json(record),
        Ok(Err(e)) => {
            error!("Follow failed: {}", e);
            HttpResponse::BadRequest().body(e.to_string())
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

async fn unfollow(data: web::Data<AppState>, id: web::Path<String>) -> impl Responder {
    let (id, store) = (id.into_inner(), data.following.clone());
    match web::block(move || store.unfollow(&id)).await {
        Ok(Ok(Some(trader))) => HttpResponse::Ok().json(trader),
        Ok(Ok(None)) => HttpResponse::NotFound().body("Not following"),
        Ok(Err(e)) => HttpResponse::BadRequest().body(e.to_string()),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

async fn toggle_setting(data: web::Data<AppState>, path: web::Path<(String, CopyMarket)>) -> impl Responder {
    let (id, market) = path.into_inner();
    let store = data.following.clone();
    match web::block(move || store.toggle_setting(&id, market)).await {
        Ok(Ok(Some(settings))) => HttpResponse::Ok().json(settings),
        Ok(Ok(None)) => HttpResponse::NotFound().body("Not following"),
        Ok(Err(e)) => HttpResponse::BadRequest().body(e.to_string()),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

async fn get_models() -> impl Responder {
    let cards: Vec<_> = models::top_models().iter().map(|m| m.card()).collect();
    HttpResponse::Ok().json(cards)
}

async fn get_model(id: web::Path<String>) -> impl Responder {
    match models::model(&id) {
        Some(model) => HttpResponse::Ok().json(model),
        None => HttpResponse::NotFound().body("Model Not Found"),
    }
}

async fn get_account(data: web::Data<AppState>) -> impl Responder {
    match data.desk.wallet().account_info().await {
        Some(info) => HttpResponse::Ok().json(info),
        None => HttpResponse::NotFound().body("No wallet connected"),
    }
}

async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(data.metrics.render())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(get_status))
        .route("/traders", web::get().to(get_traders))
        .route("/traders/{id}", web::get().to(get_trader))
        .route("/positions", web::get().to(get_positions))
        .route("/following", web::get().to(get_following))
        .route("/following/{id}", web::post().to(follow))
        .route("/following/{id}", web::delete().to(unfollow))
        .route("/following/{id}/settings/{market}", web::put().to(toggle_setting))
        .route("/models", web::get().to(get_models))
        .route("/models/{id}", web::get().to(get_model))
        .route("/account", web::get().to(get_account))
        .route("/metrics", web::get().to(get_metrics));
}

pub async fn serve(state: AppState, bind_address: &str) -> std::io::Result<()> {
    let data = web::Data::new(state);
    info!("Status API listening on {}", bind_address);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind(bind_address)?
        .run()
        .await
}
