mod watcher;

use clap::{Parser, Subcommand};
use hibiki_channels::youtube::YouTubeLiveChat;
use hibiki_core::{chatlog::ChatLog, config, persona::PersonaCatalog, prompt, traits::Generator};
use hibiki_providers::gemini::GeminiGenerator;
use std::sync::Arc;
use watcher::LiveChatWatcher;

#[derive(Parser)]
#[command(
    name = "hibiki",
    version,
    about = "Hibiki — live-stream chat companion with persona auto-replies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the live chat until interrupted.
    Start,
    /// Check config, generator availability, and live status.
    Status,
    /// Generate one persona reply for a message, without watching.
    Ask {
        /// The viewer message to reply to.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            let catalog = PersonaCatalog::load(&cfg.persona.path)?;
            let (persona, character) = catalog.select(&cfg.persona.persona, &cfg.persona.character)?;

            if cfg.youtube.api_key.is_empty() {
                anyhow::bail!(
                    "youtube.api_key is empty. Set it in {} before starting.",
                    cli.config
                );
            }

            let transport = Arc::new(YouTubeLiveChat::new(cfg.youtube.clone()));
            let generator = build_generator(&cfg);
            if cfg.watch.auto_reply && generator.is_none() {
                anyhow::bail!(
                    "auto-reply is enabled but gemini.api_key is empty. \
                     Set the key or disable watch.auto_reply."
                );
            }

            let send_farewell = cfg.watch.auto_greet;
            let watcher = LiveChatWatcher::new(
                transport,
                generator,
                persona,
                character,
                cfg.youtube.channel_id.clone(),
                cfg.watch.clone(),
            )?;

            println!("Hibiki — watching live chat (ctrl-c to stop)...");
            watcher.start()?;

            let log = watcher.log();
            let tail_handle = tokio::spawn(async move {
                print_log_tail(log).await;
            });

            tokio::signal::ctrl_c().await?;
            println!();
            tail_handle.abort();
            watcher.stop(send_farewell).await;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Hibiki — Status Check\n");
            println!("Config: {}", cli.config);

            let catalog = PersonaCatalog::load(&cfg.persona.path)?;
            match catalog.select(&cfg.persona.persona, &cfg.persona.character) {
                Ok((p, c)) => println!("Persona: {} / {}", p.name, c.name),
                Err(e) => println!("Persona: {e}"),
            }
            println!();

            match build_generator(&cfg) {
                Some(generator) => {
                    let available = generator.is_available().await;
                    println!(
                        "  gemini: {}",
                        if available { "available" } else { "not reachable" }
                    );
                }
                None => println!("  gemini: no api key configured"),
            }

            if cfg.youtube.api_key.is_empty() {
                println!("  youtube: no api key configured");
            } else {
                use hibiki_core::traits::ChatTransport;
                let transport = YouTubeLiveChat::new(cfg.youtube.clone());
                match transport.resolve_chat_id().await {
                    Ok(Some(_)) => println!("  youtube: live chat resolvable"),
                    Ok(None) => println!("  youtube: configured, no live broadcast right now"),
                    Err(e) => println!("  youtube: {e}"),
                }
            }
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: hibiki ask <message>");
            }

            let cfg = config::load(&cli.config)?;
            let catalog = PersonaCatalog::load(&cfg.persona.path)?;
            let (persona, character) = catalog.select(&cfg.persona.persona, &cfg.persona.character)?;

            let generator = build_generator(&cfg)
                .ok_or_else(|| anyhow::anyhow!("gemini.api_key is empty, cannot generate"))?;

            let text = message.join(" ");
            let prompt_text = prompt::build_reply_prompt(
                &persona,
                &character,
                &text,
                cfg.watch.reply_max_chars,
            );
            let reply = generator.generate(&prompt_text).await?;
            println!(
                "{}",
                prompt::truncate_chars(reply.trim(), cfg.watch.reply_max_chars)
            );
        }
    }

    Ok(())
}

/// Build the configured generator, if an API key is present.
fn build_generator(cfg: &config::Config) -> Option<Arc<dyn Generator>> {
    if cfg.gemini.api_key.is_empty() {
        return None;
    }
    Some(Arc::new(GeminiGenerator::from_config(
        cfg.gemini.api_key.clone(),
        cfg.gemini.model.clone(),
    )))
}

/// Print new display records as they arrive. The terminal stands in
/// for the dashboard here; it reads the same shared log.
async fn print_log_tail(log: Arc<ChatLog>) {
    let mut printed: u64 = 0;
    loop {
        let total = log.total_appended();
        if total > printed {
            let new = (total - printed) as usize;
            for record in log.tail(new) {
                let tag = if record.author == "System" {
                    "!!"
                } else if record.is_bot {
                    match record.sent {
                        Some(false) => "x>",
                        _ => "=>",
                    }
                } else if record.is_owner {
                    "**"
                } else {
                    "  "
                };
                println!(
                    "{} {tag} {}: {}",
                    record.timestamp.format("%H:%M:%S"),
                    record.author,
                    record.text
                );
            }
            printed = total;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
}
