use anyhow::Result;
use clap::{Parser, Subcommand};
use cwtester_core::{
    audio::{list_audio_devices, AudioSink, CpalSink, NullSink},
    sequencer::Player,
    Options, CHANNELS, DEFAULT_FREQUENCY_HZ, DEFAULT_WPM, SAMPLE_RATE,
};
use std::io::{self, Read};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "cwtester")]
#[command(about = "Morse code tone generator with sample-accurate playback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send text as Morse code
    Send {
        /// Speed in words per minute
        #[arg(long, default_value_t = DEFAULT_WPM)]
        wpm: f64,

        /// Tone frequency in Hz
        #[arg(long, default_value_t = DEFAULT_FREQUENCY_HZ)]
        frequency: f64,

        /// Output sample rate
        #[arg(long, default_value_t = SAMPLE_RATE)]
        sample_rate: u32,

        /// Output channels (1 or 2)
        #[arg(long, default_value_t = CHANNELS)]
        channels: u16,

        /// Discard audio instead of opening the output device
        #[arg(long)]
        null: bool,

        /// Text to send (if not provided, reads from stdin)
        text: Option<String>,
    },

    /// List available output devices
    Devices,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            wpm,
            frequency,
            sample_rate,
            channels,
            null,
            text,
        } => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            if text.trim().is_empty() {
                eprintln!("Error: No text to send");
                std::process::exit(1);
            }

            let options = Options {
                wpm,
                frequency_hz: frequency,
                sample_rate,
                channels,
                ..Default::default()
            };

            let sink: Box<dyn AudioSink> = if null {
                Box::new(NullSink)
            } else {
                Box::new(CpalSink::open()?)
            };

            send_text(&text, options, sink)?;
        }

        Commands::Devices => {
            println!("Available output devices:");
            for device in list_audio_devices() {
                println!("  {}", device);
            }
        }
    }

    Ok(())
}

fn send_text(text: &str, options: Options, sink: Box<dyn AudioSink>) -> Result<()> {
    let player = Player::new(options, sink)?;

    player.reset()?;
    player.string(text.trim())?;

    let expected = player.duration();
    eprintln!("Sending {} characters at {} wpm...", text.trim().chars().count(), player.options().wpm);

    let start = Instant::now();
    player.sync_play()?;
    let actual = start.elapsed();

    eprintln!(
        "Time to play {}ms, expected {}ms, diff={}ms",
        actual.as_millis(),
        expected.as_millis(),
        actual.as_millis() as i128 - expected.as_millis() as i128
    );

    Ok(())
}
