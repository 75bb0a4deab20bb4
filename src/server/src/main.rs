//! 抽奖平台后端服务 - 服务器主程序

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use luckee_lottery_server::core::scheduler::LotteryScheduler;
use luckee_lottery_server::routes::create_routes;
use luckee_lottery_server::{ServerConfig, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("启动抽奖服务器...");

    let config = ServerConfig::from_env();
    if config.admin_token.is_none() {
        tracing::warn!("未配置 ADMIN_TOKEN，管理接口将拒绝所有请求");
    }

    let state = Arc::new(ServerState::new(config.clone()).await.context("初始化存储失败")?);

    // 定时开奖
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = LotteryScheduler::new(state.store(), config.scheduler_interval).spawn(shutdown_rx);

    let routes = create_routes(Arc::clone(&state));
    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), async {
        let _ = tokio::signal::ctrl_c().await;
        info!("收到关闭信号");
    });
    info!("服务器启动在 {}", addr);
    server.await;

    // 等待进行中的开奖完成后再退出
    let _ = shutdown_tx.send(true);
    scheduler.await.context("定时开奖任务异常退出")?;
    info!("服务器已停止");
    Ok(())
}
