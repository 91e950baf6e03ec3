//! 学生成绩服务主入口

use std::sync::Arc;
use std::time::Duration;
use student_api::{
    auth::{Clock, SystemClock},
    config::AppConfig,
    db,
    handlers::health,
    middleware::AppState,
    repository::{StudentRepository, UserRepository},
    routes, telemetry,
};
use tokio::net::TcpListener;
use tokio::signal;

/// 吊销表清理间隔
const REVOCATION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("student-api {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    if let Ok(env) = std::env::var("STUDENTS_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config);
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Student API starting");

    // 3. 数据库连接池 + 迁移
    let db_pool = db::create_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;

    tracing::info!("Database initialized");

    // 4. 构建应用状态
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(UserRepository::new(db_pool.clone())),
        Arc::new(StudentRepository::new(db_pool.clone())),
        clock.clone(),
    )?);

    if let Some(revocations) = app_state.gate.revocations().cloned() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REVOCATION_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = revocations.purge_expired(clock.now());
                if purged > 0 {
                    tracing::debug!(purged, "Expired revocations purged");
                }
            }
        });
    }

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    db_pool.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// Returns on Ctrl+C or SIGTERM; in-flight requests then get
/// `timeout_secs` to finish before the process exits anyway.
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("student-api {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: student-api [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 STUDENTS_ 前缀的环境变量完成");
    println!("  可用选项请参考 .env.example");
}
