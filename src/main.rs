use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use voice_interviewer::{
    create_router, AppState, AudioBackendConfig, AudioBackendFactory, AudioSource, Config,
    HttpBackend, InterviewBackend, InterviewSession, SessionOutcome, TimedPlayer,
};

#[derive(Parser)]
#[command(name = "voice-interviewer")]
#[command(about = "Run a voice interview against the interview backend")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/voice-interviewer")]
    config: String,

    /// Candidate name
    #[arg(long)]
    name: String,

    /// Candidate email
    #[arg(long)]
    email: String,

    /// WAV file replayed as the candidate's microphone (overrides config)
    #[arg(short, long)]
    audio_file: Option<String>,

    /// Do not serve the operator control API
    #[arg(long)]
    no_control_api: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Voice Interviewer v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Interview backend: {}", cfg.backend.base_url);

    let backend: Arc<dyn InterviewBackend> = Arc::new(HttpBackend::new(&cfg.backend.base_url)?);
    let session_id = backend
        .start_session(&args.name, &args.email)
        .await
        .context("Could not start interview session")?;

    let source = match args.audio_file.or_else(|| cfg.audio.source_file.clone()) {
        Some(path) => AudioSource::File(PathBuf::from(shellexpand::tilde(&path).as_ref())),
        None => {
            warn!("No audio source configured, candidate microphone is muted");
            AudioSource::Muted
        }
    };

    let device = AudioBackendFactory::create(
        source,
        AudioBackendConfig {
            target_sample_rate: cfg.audio.sample_rate,
            target_channels: cfg.audio.channels,
            buffer_duration_ms: cfg.audio.frame_ms,
        },
    )?;
    info!("Audio device: {}", device.name());

    let session = InterviewSession::new(cfg.session_config(), backend, Arc::new(TimedPlayer));
    let (handle, task) = session.start(session_id, device).await?;

    let server = if args.no_control_api {
        None
    } else {
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind control API on {}", addr))?;
        info!("Control API listening on http://{}", addr);

        let app = create_router(AppState::new(handle.clone()));
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Control API stopped: {}", e);
            }
        }))
    };

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, abandoning interview");
            let _ = interrupt.abandon().await;
        }
    });

    let outcome = task.await.context("Interview controller panicked")?;

    if let Some(server) = server {
        server.abort();
    }

    outcome.summary().print();

    match outcome {
        SessionOutcome::Completed { result_url, .. } => {
            info!("Interview complete");
            if let Some(url) = result_url {
                info!("Results: {}", url);
            }
            Ok(())
        }
        SessionOutcome::UploadFailed { error, .. } => {
            anyhow::bail!("Interview recording could not be uploaded: {}", error)
        }
        SessionOutcome::Abandoned { session_id, .. } => {
            info!("Interview {} abandoned", session_id);
            Ok(())
        }
    }
}
