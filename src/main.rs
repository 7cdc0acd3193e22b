use std::env;
use std::sync::Arc;

use anyhow::{bail, Result};

use skill_session_engine::cli::SessionRenderer;
use skill_session_engine::config::{EngineConfig, SessionConfig};
use skill_session_engine::core::ExecutionMode;
use skill_session_engine::llm::{GeminiProvider, ModelRouter, ADVANCED_MODEL, FAST_MODEL};
use skill_session_engine::logging::{self, LoggingConfig};
use skill_session_engine::runtime::SessionOrchestrator;
use skill_session_engine::skills::{ModelTier, SkillProfile, StaticSkillResolver};
use skill_session_engine::tools::{CodeExecutionTool, RequestHumanInputTool, ToolRegistry};

const USAGE: &str = "usage: skill-session-engine \"<task>\" [--skill ID] [--autonomous] [--advanced]";

struct Args {
    task: String,
    skill_id: String,
    mode: ExecutionMode,
    tier: ModelTier,
}

fn parse_args() -> Result<Args> {
    let mut task = None;
    let mut skill_id = "general".to_string();
    let mut mode = ExecutionMode::Interactive;
    let mut tier = ModelTier::Fast;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--skill" | "-s" => match args.next() {
                Some(id) => skill_id = id,
                None => bail!("--skill needs a value\n{}", USAGE),
            },
            "--autonomous" | "-a" => mode = ExecutionMode::Autonomous,
            "--advanced" => tier = ModelTier::Advanced,
            "--help" | "-h" => bail!("{}", USAGE),
            other if task.is_none() => task = Some(other.to_string()),
            other => bail!("unexpected argument '{}'\n{}", other, USAGE),
        }
    }

    let Some(task) = task else {
        bail!("{}", USAGE);
    };

    Ok(Args {
        task,
        skill_id,
        mode,
        tier,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut logging_config = LoggingConfig::new();
    if let Ok(dir) = env::var("SKILL_ENGINE_LOG_DIR") {
        logging_config = logging_config.with_log_dir(dir);
    }
    let _guard = logging::init_logging(&logging_config)?;

    let args = parse_args()?;
    let config = EngineConfig::from_env()?;

    tracing::info!("=== Skill Session Engine Starting ===");

    // One client, two tiers
    let gemini = GeminiProvider::from_env()?;
    let fast = Arc::new(gemini.variant(FAST_MODEL));
    let advanced = Arc::new(gemini.variant(ADVANCED_MODEL));
    let router = ModelRouter::new(fast, advanced);

    let mut tools = ToolRegistry::new();
    tools.register(RequestHumanInputTool::new());
    tools.register(CodeExecutionTool::new());
    tracing::info!("Registered {} tools", tools.len());

    let skills = StaticSkillResolver::new()
        .with_profile(SkillProfile::new(&args.skill_id).with_tier(args.tier));

    let orchestrator = Arc::new(SessionOrchestrator::new(
        config,
        tools,
        router,
        Arc::new(skills),
    )?);
    orchestrator.start_cleanup().await;

    let renderer = SessionRenderer::new(orchestrator.clone());
    renderer.console().print_banner(&args.skill_id, args.mode);
    renderer.console().print_user(&args.task);
    renderer.console().print_separator();

    let session = orchestrator
        .start_session(&args.skill_id, &args.task, args.mode, SessionConfig::new())
        .await?;
    tracing::info!(session_id = %session.session_id, "Session created");

    let status = renderer.run(&session.session_id).await?;
    renderer.console().print_separator();
    renderer
        .console()
        .print_system(&format!("Session {} ended {}", session.session_id, status));

    orchestrator.shutdown().await;
    tracing::info!("=== Skill Session Engine Shutting Down ===");

    Ok(())
}
