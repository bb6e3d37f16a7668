use std::path::PathBuf;

use clap::{Parser, Subcommand};

use voxbridge_core::config::Config;

#[derive(Parser)]
#[command(
    name = "voxbridge",
    about = "Real-time voice-conversion relay for 16-bit mono PCM streams",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = "voxbridge.json5")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Operating mode: continuous or utterance
        #[arg(long)]
        mode: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Target-voice identifier handed to the engine
        #[arg(long)]
        voice: Option<String>,

        /// Engine warmup rounds before accepting connections
        #[arg(long)]
        warmup: Option<u32>,
    },

    /// Send raw PCM to a relay in utterance mode
    ///
    /// Endpoints the input into utterances and sends each as one framed
    /// request, writing converted audio in arrival order.
    Send {
        /// Input file of raw 16-bit mono PCM (stdin when omitted)
        input: Option<PathBuf>,

        /// Output file for converted PCM (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Relay address, host:port (config listener port when omitted)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve {
            mode,
            port,
            voice,
            warmup,
        } => {
            if let Some(mode) = mode {
                config.mode = mode.parse()?;
            }
            if let Some(port) = port {
                config.listener.port = port;
            }
            if let Some(voice) = voice {
                config.engine.target_voice = voice;
            }
            if let Some(warmup) = warmup {
                config.engine.warmup = warmup;
            }
            config.validate()?;

            let engine = voxbridge_engine::build(&config.engine, config.audio.sample_rate)?;
            tracing::info!(
                engine = %config.engine.kind,
                voice = %config.engine.target_voice,
                "starting voxbridge relay"
            );
            voxbridge_server::run(config, engine).await?;
        }
        Commands::Send {
            input,
            output,
            addr,
        } => {
            let addr = addr.unwrap_or_else(|| format!("127.0.0.1:{}", config.listener.port));
            send_utterances(&config, input, output, &addr).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Check => {
                config.validate()?;
                println!("{}: ok", cli.config.display());
            }
        },
    }

    Ok(())
}

/// Utterance-mode client: endpoint the input, one framed round trip per
/// utterance. A zero-length response is the relay's skip sentinel and
/// produces no output bytes.
async fn send_utterances(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    addr: &str,
) -> anyhow::Result<()> {
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use voxbridge_dsp::endpoint::EndpointDetector;

    let pcm = match &input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut std::io::stdin().lock(), &mut buf)?;
            buf
        }
    };

    let rate = config.audio.sample_rate;
    let utt = &config.utterance;
    let mut detector = EndpointDetector::new(
        utt.vad_threshold,
        utt.silence_frames(rate),
        utt.max_frames(rate),
    );

    let mut utterances: Vec<Vec<u8>> = Vec::new();
    for frame in pcm.chunks(utt.frame_bytes) {
        if let Some(payload) = detector.push(frame) {
            utterances.push(payload);
        }
    }
    if let Some(payload) = detector.flush() {
        utterances.push(payload);
    }
    if utterances.is_empty() {
        tracing::info!("no speech detected in input, nothing to send");
        return Ok(());
    }

    let mut stream = tokio::net::TcpStream::connect(addr).await?;
    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };

    for (i, payload) in utterances.iter().enumerate() {
        tracing::info!(utterance = i, bytes = payload.len(), "sending");
        stream
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await?;
        stream.write_all(payload).await?;

        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await?;
        let len = u32::from_be_bytes(header) as usize;
        if len == 0 {
            tracing::info!(utterance = i, "relay reported silence, skipping");
            continue;
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;
        out.write_all(&body)?;
    }
    out.flush()?;

    Ok(())
}
