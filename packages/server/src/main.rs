use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use werewolf_server::{app, state::AppState, utils::config::CONFIG};

// ログ設定
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    let dotenv_result = dotenv();
    init_tracing();
    if let Err(e) = dotenv_result {
        warn!("Warning: .envファイルの読み込みに失敗しました: {}", e);
    }

    let state = AppState::new();
    info!(config = %state.game.default_config().describe(), "game defaults loaded");

    // CORSレイヤーの設定
    let origin = CONFIG.cors_origin.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    // ルーティングの設定
    let app = app::create_app_with_state(state.clone())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http() // HTTPトレースログを有効化
                .make_span_with(|request: &http::Request<_>| {
                    tracing::info_span!(
                        "HTTP request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
        );

    // サーバーの起動
    let listener = tokio::net::TcpListener::bind(CONFIG.bind_addr).await?;
    info!("サーバーを起動しました: http://{}", CONFIG.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.game.shutdown().await;
    Ok(())
}
