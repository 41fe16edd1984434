use screenreel::testing::SyntheticSource;
use screenreel::{fetch, FfmpegLauncher, RecordingSession, RecordingSettings};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    screenreel::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: screenreel-cli <command> [args]");
        eprintln!("Commands:");
        eprintln!("  fetch <dir>                         ensure ffmpeg exists under <dir>");
        eprintln!("  demo <output.mp4> [--seconds <n>] [--fps <n>] [--crf <n>]");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "fetch" => cmd_fetch(&args),
        "demo" => cmd_demo(&args),
        other => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(1);
        }
    }
}

fn cmd_fetch(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 3 {
        eprintln!("Usage: screenreel-cli fetch <dir>");
        std::process::exit(1);
    }
    let path = fetch::ensure_encoder(&PathBuf::from(&args[2]))?;
    println!("{}", path.display());
    Ok(())
}

/// Record a synthetic test pattern so the whole pipeline can be exercised
/// without a capture backend.
fn cmd_demo(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 3 {
        eprintln!("Usage: screenreel-cli demo <output.mp4> [--seconds <n>] [--fps <n>] [--crf <n>]");
        std::process::exit(1);
    }
    let output = PathBuf::from(&args[2]);

    let (seconds, fps, crf) = match parse_demo_flags(&args[3..]) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    let settings = RecordingSettings::new(&output)
        .with_frame_rate(fps)
        .with_crf(crf);
    let mut session =
        RecordingSession::start(SyntheticSource::new(1280, 720), FfmpegLauncher, settings)?;

    std::thread::sleep(Duration::from_secs(seconds));
    let summary = session.stop();

    println!(
        "emitted {} frames, delivered {}, output {}",
        summary.frames_emitted,
        summary.frames_delivered,
        output.display()
    );
    if let Some(e) = summary.producer_error {
        eprintln!("capture error: {}", e);
    }
    if let Some(e) = summary.consumer_error {
        eprintln!("encoder error: {}", e);
    }
    Ok(())
}

fn parse_demo_flags(flags: &[String]) -> Result<(u64, u32, u8), String> {
    let mut seconds = 3u64;
    let mut fps = 30u32;
    let mut crf = 23u8;
    let mut i = 0;
    while i < flags.len() {
        let flag = flags[i].as_str();
        match flag {
            "--seconds" | "--fps" | "--crf" => {
                i += 1;
                let value = flags
                    .get(i)
                    .ok_or_else(|| format!("Missing value for {}", flag))?;
                match flag {
                    "--seconds" => {
                        seconds = value
                            .parse()
                            .map_err(|_| format!("Bad value for {}: {}", flag, value))?;
                    }
                    "--fps" => {
                        fps = value
                            .parse()
                            .map_err(|_| format!("Bad value for {}: {}", flag, value))?;
                    }
                    _ => {
                        crf = value
                            .parse()
                            .map_err(|_| format!("Bad value for {}: {}", flag, value))?;
                    }
                }
            }
            other => return Err(format!("Unknown flag: {}", other)),
        }
        i += 1;
    }
    Ok((seconds, fps, crf))
}

#[cfg(test)]
mod tests {
    use super::parse_demo_flags;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_when_no_flags() {
        assert_eq!(parse_demo_flags(&[]), Ok((3, 30, 23)));
    }

    #[test]
    fn all_flags_parsed() {
        let flags = strings(&["--seconds", "5", "--fps", "60", "--crf", "18"]);
        assert_eq!(parse_demo_flags(&flags), Ok((5, 60, 18)));
    }

    #[test]
    fn trailing_flag_without_value_is_an_error_not_a_panic() {
        let flags = strings(&["--fps"]);
        assert_eq!(
            parse_demo_flags(&flags),
            Err("Missing value for --fps".to_string())
        );
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let flags = strings(&["--bogus"]);
        assert!(parse_demo_flags(&flags).is_err());
    }
}
