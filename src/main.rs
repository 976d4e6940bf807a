// ==========================================
// 考试引擎 - 运行器主入口
// ==========================================
// 打开数据库并按配置间隔执行考试自动处理
// ==========================================

use std::time::Duration;

use anyhow::anyhow;
use exam_engine::app::{get_default_db_path, AppState};
use exam_engine::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", exam_engine::APP_NAME);
    tracing::info!("系统版本: {}", exam_engine::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let interval_secs = app_state.settings.sweep_interval_secs.max(1);
    tracing::info!(interval_secs, "考试自动处理已启动");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = app_state.clock.now();
                if let Err(e) = app_state.auto_processor.run_once(now) {
                    tracing::error!(error = %e, "自动处理扫描失败");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到退出信号，停止自动处理");
                break;
            }
        }
    }

    Ok(())
}
