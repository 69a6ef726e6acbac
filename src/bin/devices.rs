//! List audio capture and playback devices.
//!
//! Small diagnostic for the settings surface: prints every input/output
//! device the session could be configured with, plus the config path.

use duolog::TranslateConfig;
use duolog::audio::capture::CpalCaptureDevice;
use duolog::audio::playback::CpalPlaybackSink;

fn main() -> duolog::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("config path: {}", TranslateConfig::default_config_path().display());

    println!("\ninput devices:");
    for name in CpalCaptureDevice::list_input_devices()? {
        println!("  {name}");
    }

    println!("\noutput devices:");
    for name in CpalPlaybackSink::list_output_devices()? {
        println!("  {name}");
    }

    Ok(())
}
