use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use drama_feed::common::logger::PrettyLogger;
use drama_feed::feed::loader::{DramaFeedLoader, EpisodeListLoader, LoadOutcome};
use drama_feed::feed::short_feed::{BuildOptions, ShortFeed};
use drama_feed::feed::storage::FileStore;
use drama_feed::parser::stream_utils::get_preferred_stream_url;
use drama_feed::parser::utils::FormatTool;
use drama_feed::search::{SearchController, SearchPhase};
use drama_feed::{
    ApiConfig, DramaClient, DramaFeedCategory, EpisodeService, log_error, log_info, log_step,
    log_success, log_warning,
};

mod cli;

use cli::{Cli, Command};

async fn run_feed(client: DramaClient, category: DramaFeedCategory, cancel: &CancellationToken) -> Result<()> {
    log_step!("加载分类 {}", category);
    let loader = DramaFeedLoader::new(client, category);
    let outcome = loader.load(Some(cancel)).await;
    let state = loader.state();

    match outcome {
        LoadOutcome::Loaded => {
            for (i, drama) in state.data.iter().enumerate() {
                PrettyLogger::drama(i, drama);
            }
            let updated_at = state.last_updated.map(|t| t.with_timezone(&chrono::Local));
            log_success!(
                "共 {} 部短剧，更新于 {}",
                state.data.len(),
                FormatTool::format_updated_at(updated_at.as_ref())
            );
            Ok(())
        }
        LoadOutcome::Ignored => {
            log_warning!("已取消");
            Ok(())
        }
        LoadOutcome::Failed => Err(anyhow!(state.error.unwrap_or_default())),
    }
}

async fn run_episodes(
    service: EpisodeService,
    book_id: &str,
    force_refresh: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    log_step!("加载剧集 {}", book_id);
    let loader = EpisodeListLoader::new(Arc::new(service), book_id.trim());
    let outcome = if force_refresh {
        loader.refresh().await
    } else {
        loader.load(Some(cancel.clone())).await
    };
    let state = loader.state();

    if outcome == LoadOutcome::Failed {
        return Err(anyhow!(state.error.unwrap_or_default()));
    }
    for episode in &state.data {
        let stream = get_preferred_stream_url(episode);
        PrettyLogger::episode(episode, stream.as_deref());
    }
    log_success!("共 {} 集", state.data.len());
    Ok(())
}

struct ShortsArgs {
    category: DramaFeedCategory,
    offline: bool,
    refresh: bool,
    watched: Vec<String>,
    store_dir: std::path::PathBuf,
}

async fn run_shorts(
    client: DramaClient,
    config: &ApiConfig,
    args: ShortsArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let service = EpisodeService::new(client.clone());
    let store = Arc::new(FileStore::new(&args.store_dir));
    let feed = ShortFeed::new(args.category, Arc::new(service), store, config);

    let hydrated = feed.hydrate().await;
    debug!("本地缓存: {} 项", hydrated.items.len());

    for id in &args.watched {
        feed.mark_as_watched(id).await?;
    }

    let dramas = if args.offline {
        Vec::new()
    } else {
        let loader = DramaFeedLoader::new(client, args.category);
        if loader.load(Some(cancel)).await == LoadOutcome::Failed {
            log_warning!(
                "分类加载失败: {}",
                loader.state().error.unwrap_or_default()
            );
        }
        loader.dramas()
    };

    log_step!("组装短视频流 ({})", args.category);
    let options = BuildOptions {
        refreshing: args.refresh,
        force_refresh: args.refresh,
    };
    let snapshot = feed.build(&dramas, !args.offline, options).await;

    if let Some(error) = snapshot.error {
        log_error!("{}", error);
        return Ok(());
    }
    if snapshot.is_using_offline_cache {
        log_warning!("正在使用本地缓存");
    }
    for (i, item) in snapshot.items.iter().enumerate() {
        PrettyLogger::short_item(i, item);
    }
    log_success!("共 {} 项", snapshot.items.len());
    Ok(())
}

async fn run_search(client: DramaClient, config: &ApiConfig, query: &str) -> Result<()> {
    let controller = SearchController::new(Arc::new(client), config.search_debounce);
    let mut updates = controller.subscribe();

    // 模拟逐字输入，只有最后一次会真正发出请求
    let mut typed = String::new();
    let mut generation = 0;
    for ch in query.chars() {
        typed.push(ch);
        generation = controller.set_query(&typed);
    }

    if generation == 0 || typed.trim().is_empty() {
        log_info!("关键字为空");
        return Ok(());
    }

    let snapshot = updates
        .wait_for(|s| s.generation == generation && s.phase == SearchPhase::Idle)
        .await?
        .clone();

    if let Some(error) = snapshot.search_error {
        return Err(anyhow!(error));
    }
    for (i, item) in snapshot.results.iter().enumerate() {
        PrettyLogger::search_result(i, item);
    }
    log_success!("共 {} 条结果", snapshot.results.len());
    Ok(())
}

async fn run_popular(client: DramaClient, config: &ApiConfig) -> Result<()> {
    let controller = SearchController::new(Arc::new(client), config.search_debounce);
    // 创建时已开始加载，等它结束
    let snapshot = controller
        .subscribe()
        .wait_for(|s| !s.is_loading_popular)
        .await?
        .clone();

    if let Some(error) = snapshot.popular_error {
        return Err(anyhow!(error));
    }
    for (i, drama) in snapshot.popular.iter().enumerate() {
        PrettyLogger::drama(i, drama);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // 初始化日志
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = ApiConfig::with_base_url(&args.base_url);
    info!("API: {}", config.base_url);
    let client = DramaClient::new(config.clone())?;

    // Ctrl-C 取消当前加载
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let result = match args.command {
        Command::Feed { category } => run_feed(client, category, &cancel).await,
        Command::Episodes {
            book_id,
            force_refresh,
        } => run_episodes(EpisodeService::new(client), &book_id, force_refresh, &cancel).await,
        Command::Shorts {
            category,
            offline,
            refresh,
            watched,
            store_dir,
        } => {
            let shorts = ShortsArgs {
                category,
                offline,
                refresh,
                watched,
                store_dir,
            };
            run_shorts(client, &config, shorts, &cancel).await
        }
        Command::Search { query } => run_search(client, &config, &query).await,
        Command::Popular => run_popular(client, &config).await,
    };

    if let Err(e) = &result {
        log_error!("{}", e);
    }
    result
}
