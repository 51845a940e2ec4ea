//! Application entry point: Growth Experts assistant widget.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (default on first run) and apply
//!    environment overrides.
//! 3. Create the [`tokio`] runtime.
//! 4. Build the adapters (capture, completion, speech, hosted voice).
//! 5. Spawn the [`SessionController`] on the runtime.
//! 6. Spawn the global hotkey listener thread.
//! 7. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.
//! 8. Send [`AssistantCommand::Shutdown`] and wait for the controller to end
//!    any live call before the runtime is dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui;
use tokio::sync::mpsc;

use growth_assistant::{
    app::AssistantApp,
    completion::ChatCompletionClient,
    config::{AppConfig, AppPaths, AssistantMode},
    hotkey::{HotkeyBindings, HotkeyListener},
    input::MicrophoneCapture,
    output::SpeakerOutput,
    session::{new_shared_panel, Adapters, AssistantCommand, SessionController},
    stt::{Recognizer, SttError, WhisperRecognizer},
    voice::HttpVoiceSession,
};

// ---------------------------------------------------------------------------
// Recogniser selection
// ---------------------------------------------------------------------------

fn load_recognizer(config: &AppConfig) -> Arc<dyn Recognizer> {
    let model_path = AppPaths::new().model_file(&config.speech.model);

    if config.assistant.mode != AssistantMode::Local {
        return Arc::new(NoModel {
            path: model_path.display().to_string(),
        });
    }

    match WhisperRecognizer::load(&model_path, &config.speech.language) {
        Ok(engine) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            Arc::new(engine)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Voice input will report an error.",
                model_path.display()
            );
            Arc::new(NoModel {
                path: model_path.display().to_string(),
            })
        }
    }
}

/// Stands in for Whisper when no model file is available, so the widget still
/// launches and typed messages keep working.
struct NoModel {
    path: String,
}

impl Recognizer for NoModel {
    fn recognize(&self, _audio: &[f32]) -> Result<String, SttError> {
        Err(SttError::ModelNotFound(self.path.clone()))
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_decorations(false)
        .with_transparent(true)
        .with_inner_size([150.0, 64.0])
        .with_min_inner_size([120.0, 48.0])
        .with_resizable(false);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

/// Upper bound on the final teardown (provider DELETE included).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Growth Experts assistant starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    config.apply_env();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let adapters = Adapters {
        capture: Arc::new(MicrophoneCapture::new(
            load_recognizer(&config),
            config.speech.clone(),
        )),
        completion: Arc::new(ChatCompletionClient::from_config(&config.completion)),
        speech: Arc::new(SpeakerOutput::from_config(&config.tts)),
        voice: Arc::new(HttpVoiceSession::from_config(&config.voice)),
    };

    let panel = new_shared_panel();
    let (command_tx, command_rx) = mpsc::channel::<AssistantCommand>(16);

    let controller = SessionController::new(config.clone(), adapters, Arc::clone(&panel));
    let controller_task = rt.spawn(controller.run(command_rx));
    let shutdown_tx = command_tx.clone();

    let bindings = HotkeyBindings::from_config(&config.assistant).unwrap_or_else(|e| {
        log::warn!("{e}; falling back to default hotkeys");
        HotkeyBindings::default()
    });
    let hotkeys = match HotkeyListener::start(bindings, command_tx.clone()) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("Global hotkeys unavailable: {e}");
            None
        }
    };

    let app = AssistantApp::new(panel, command_tx, config.clone());
    let options = native_options(&config);

    let result = eframe::run_native(
        "Growth Experts Assistant",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    // The hotkey thread keeps a sender alive, so the channel never closes on
    // its own; ask the controller to stop explicitly.
    drop(hotkeys);
    rt.block_on(async {
        if shutdown_tx.send(AssistantCommand::Shutdown).await.is_err() {
            log::warn!("controller already stopped");
            return;
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, controller_task).await {
            Ok(Ok(())) => log::debug!("controller stopped"),
            Ok(Err(e)) => log::error!("controller task failed: {e}"),
            Err(_) => log::warn!("controller did not stop within {SHUTDOWN_GRACE:?}"),
        }
    });

    result.map_err(|e| anyhow::anyhow!("window error: {e}"))?;
    log::info!("Growth Experts assistant shut down");
    Ok(())
}
