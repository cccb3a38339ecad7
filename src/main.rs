use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use tracing_subscriber::EnvFilter;

use genie_tutor::api::ApiServerBuilder;
use genie_tutor::client::{Conversation, Phase, TutorClient};
use genie_tutor::prompt::{Language, Scenario, UnknownSelector, parse_optional};
use genie_tutor::voice::{
    AudioCapture, AudioPlayback, NATIVE_CONTAINER, ensure_secure_origin, input_device_names, rms,
    samples_to_wav,
};
use genie_tutor::{Config, Error};

/// Genie - voice English tutor for kids
#[derive(Parser)]
#[command(name = "genie", version, about)]
struct Cli {
    /// Port to listen on (overrides `GENIE_PORT` / `PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the tutor server (default)
    Serve,
    /// Talk to a running server from this machine's microphone
    Talk {
        /// Server base URL
        #[arg(long, env = "GENIE_SERVER", default_value = "http://localhost:3000")]
        server: String,
        /// Roleplay scenario, e.g. "At School"; prompted when omitted
        #[arg(long)]
        scenario: Option<String>,
        /// Reply language, e.g. "Spanish"; prompted when omitted
        #[arg(long)]
        language: Option<String>,
        /// Input device name; prompted when omitted
        #[arg(long)]
        device: Option<String>,
    },
    /// List audio input devices
    Devices,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// Input device name
        #[arg(long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,genie_tutor=info",
        1 => "info,genie_tutor=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.port).await,
        Command::Talk {
            server,
            scenario,
            language,
            device,
        } => talk(&server, scenario, language, device).await,
        Command::Devices => list_devices(),
        Command::TestMic { duration, device } => test_mic(duration, device.as_deref()).await,
    }
}

/// Run the HTTP server until interrupted
async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let mut builder = ApiServerBuilder::from_config(config);
    if let Some(port) = port {
        builder = builder.port(port);
    }

    tokio::select! {
        result = builder.build().run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

/// Ask for an optional selector value, "Off" meaning none
fn pick<T: Copy>(
    prompt: &str,
    off_label: &str,
    options: &[T],
    label: fn(T) -> &'static str,
) -> anyhow::Result<Option<T>> {
    let mut items = vec![off_label];
    items.extend(options.iter().map(|&o| label(o)));

    let idx = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()?;

    Ok(idx.checked_sub(1).and_then(|i| options.get(i).copied()))
}

/// Resolve a selector from a flag, or prompt for it
fn selector<T>(
    flag: Option<String>,
    prompt: &str,
    off_label: &str,
    options: &[T],
    label: fn(T) -> &'static str,
) -> anyhow::Result<Option<T>>
where
    T: Copy + std::str::FromStr<Err = UnknownSelector>,
{
    match flag {
        Some(raw) => Ok(parse_optional(Some(raw.as_str()))?),
        None => pick(prompt, off_label, options, label),
    }
}

/// Pick an input device, `None` for the system default
fn pick_device() -> anyhow::Result<Option<String>> {
    let names = match input_device_names() {
        Ok(names) if !names.is_empty() => names,
        Ok(_) => return Ok(None),
        Err(e) => {
            tracing::warn!(error = %e, "could not list input devices");
            return Ok(None);
        }
    };

    let mut items = vec!["System default".to_string()];
    items.extend(names.iter().cloned());

    let idx = Select::new()
        .with_prompt("Microphone")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(idx.checked_sub(1).and_then(|i| names.get(i).cloned()))
}

/// Block until the user presses Enter
async fn wait_for_enter() -> anyhow::Result<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await??;
    Ok(())
}

/// Record one utterance into the conversation, or record why capture failed
#[allow(clippy::future_not_send)]
async fn record_turn(
    conversation: &mut Conversation<TutorClient>,
    device: Option<&str>,
) -> anyhow::Result<bool> {
    if let Err(e) = ensure_secure_origin(conversation.backend().base_url()) {
        conversation.capture_failed(e);
        return Ok(false);
    }

    let opened = AudioCapture::with_device(device).and_then(|mut capture| {
        capture.start()?;
        Ok(capture)
    });
    let mut capture = match opened {
        Ok(capture) => capture,
        Err(Error::Capture(e)) => {
            conversation.capture_failed(e);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    conversation.start_recording(
        Some(capture.device_name().to_string()),
        |mime| mime == NATIVE_CONTAINER,
        NATIVE_CONTAINER,
    );
    println!("Recording from {}... press Enter to stop.", capture.device_name());

    wait_for_enter().await?;
    capture.stop();

    let wav = samples_to_wav(&capture.take_buffer(), capture.sample_rate())?;
    conversation.push_chunk(wav);
    Ok(true)
}

/// Talk to a running server
#[allow(clippy::future_not_send)]
async fn talk(
    server: &str,
    scenario: Option<String>,
    language: Option<String>,
    device: Option<String>,
) -> anyhow::Result<()> {
    let client = TutorClient::parse(server)?;

    match client.capabilities().await {
        Ok(caps) => {
            if !caps.stt_available || !caps.chat_available {
                println!("Warning: the server is missing OPENAI_API_KEY; turns will fail.");
            }
            if !caps.tts_available {
                println!("Speech synthesis is not configured; replies will be text only.");
            }
        }
        Err(e) => tracing::warn!(error = %e, server, "could not fetch server capabilities"),
    }

    let scenario = selector(scenario, "Roleplay mode", "Off", &Scenario::ALL, Scenario::label)?;
    let language = selector(language, "Reply language", "Default", &Language::ALL, Language::label)?;
    let device = match device {
        Some(name) => Some(name),
        None => pick_device()?,
    };

    let mut conversation = Conversation::new(client);
    conversation.set_scenario(scenario);
    conversation.set_language(language);

    let playback = AudioPlayback::new()
        .map_err(|e| tracing::warn!(error = %e, "audio output unavailable, replies will be text only"))
        .ok();

    loop {
        let go = Confirm::new()
            .with_prompt("Talk to Genie?")
            .default(true)
            .interact()?;
        if !go {
            break;
        }

        if !record_turn(&mut conversation, device.as_deref()).await? {
            if let Phase::Error(e) = conversation.phase() {
                println!("{e}");
            }
            conversation.dismiss_error();
            continue;
        }

        println!("Processing...");
        match conversation.stop_and_submit().await {
            Ok(turn) => {
                if let Some(said) = conversation.log().transcripts().last() {
                    println!("You said: {said}");
                }
                println!("Genie: {}", turn.reply);

                if let (Some(clip), Some(playback)) = (conversation.clip(), playback.as_ref()) {
                    if let Err(e) = playback.play_file(clip.path()).await {
                        tracing::warn!(error = %e, "could not play reply");
                    }
                }
            }
            Err(e) => println!("{e}"),
        }
        conversation.dismiss_error();
    }

    Ok(())
}

/// List audio input devices
fn list_devices() -> anyhow::Result<()> {
    let names = input_device_names()?;
    if names.is_empty() {
        println!("No input devices found.");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64, device: Option<&str>) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::with_device(device)?;
    capture.start()?;

    println!("Device: {}", capture.device_name());
    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, run `genie devices` and pick another with --device.");

    Ok(())
}
