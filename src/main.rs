use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};

use mod_replayer::export::{render_to_wav, ExportConfig};
use mod_replayer::{parse, Module, Note};

const USAGE: &str = "Usage:
  mod-replayer [--info] [--out <file.wav>] [--rate <hz>] [--mono] [--seconds <n>] <file.mod>

Flags:
  --info            Print the module summary and exit
  --out <file>      Render the song to a WAV file
  --rate <hz>       Output sample rate (default 44100)
  --mono            Render one channel instead of stereo
  --seconds <n>     Stop rendering after n seconds (default 600)
  -h, --help        Show this help

Set RUST_LOG=debug for parser diagnostics.";

#[derive(Debug)]
struct Options {
    file: PathBuf,
    info_only: bool,
    out: Option<PathBuf>,
    sample_rate: u32,
    mono: bool,
    seconds: f32,
}

/// Parse command line flags; `Ok(None)` means help was requested.
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Option<Options>> {
    let mut file = None;
    let mut info_only = false;
    let mut out = None;
    let mut sample_rate = 44_100;
    let mut mono = false;
    let mut seconds = 600.0;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--info" => info_only = true,
            "--mono" => mono = true,
            "--out" => {
                let value = args.next().context("--out requires a file name")?;
                out = Some(PathBuf::from(value));
            }
            "--rate" => {
                let value = args.next().context("--rate requires a value")?;
                sample_rate = value
                    .parse()
                    .with_context(|| format!("invalid sample rate '{}'", value))?;
            }
            "--seconds" => {
                let value = args.next().context("--seconds requires a value")?;
                seconds = value
                    .parse()
                    .with_context(|| format!("invalid duration '{}'", value))?;
            }
            _ if arg.starts_with('-') => bail!("unknown flag: {}", arg),
            _ => file = Some(PathBuf::from(arg)),
        }
    }

    let Some(file) = file else {
        return Ok(None);
    };
    if sample_rate == 0 {
        bail!("sample rate must be positive");
    }

    Ok(Some(Options {
        file,
        info_only,
        out,
        sample_rate,
        mono,
        seconds,
    }))
}

fn print_summary(module: &Module) {
    let format = module.format.tag.as_deref().unwrap_or("untagged (15 samples)");
    println!("Name:      {}", module.name);
    println!("Format:    {} / {} channels", format, module.channel_count());
    println!(
        "Song:      {} positions, {} patterns, restart at {}",
        module.patterns.song_length(),
        module.patterns.pattern_count(),
        module.patterns.restart_position
    );

    let used: Vec<_> = module
        .samples
        .iter()
        .enumerate()
        .filter(|(_, sample)| !sample.is_empty())
        .collect();
    println!("Samples:   {} used of {}", used.len(), module.samples.len());
    for (index, sample) in used {
        let repeat = if sample.has_loop() {
            format!("loop {}+{}", sample.repeat_offset, sample.repeat_length)
        } else {
            "one-shot".to_string()
        };
        println!(
            "  {:>2} {:<22} {:>6} frames  vol {:>3.0}%  fine {:>+2}  {}",
            index + 1,
            sample.name,
            sample.len(),
            sample.volume() * 100.0,
            sample.finetune,
            repeat
        );
    }
    println!("Tuning:    {} = period {}", Note::OCTAVE_2_C, Note::OCTAVE_2_C.period());
}

fn run() -> anyhow::Result<()> {
    let Some(options) = parse_args(env::args().skip(1))? else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let data = fs::read(&options.file)
        .with_context(|| format!("failed to read '{}'", options.file.display()))?;
    let module = parse(&data)
        .with_context(|| format!("failed to parse '{}'", options.file.display()))?;

    print_summary(&module);
    if options.info_only {
        return Ok(());
    }

    let Some(out) = options.out else {
        println!("\nNo --out given; nothing to render.");
        return Ok(());
    };

    let config = ExportConfig {
        channels: if options.mono { 1 } else { 2 },
        ..ExportConfig::with_sample_rate(options.sample_rate)
    }
    .max_duration(options.seconds);

    println!("\nRendering to {}...", out.display());
    let summary = render_to_wav(module, &out, &config)
        .with_context(|| format!("failed to write '{}'", out.display()))?;
    println!(
        "Wrote {} frames ({:.1}s){}",
        summary.frames,
        summary.seconds,
        if summary.song_ended {
            ""
        } else {
            ", stopped at the duration limit"
        }
    );
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_defaults() {
        let options = parse_args(args(&["song.mod"])).unwrap().unwrap();
        assert_eq!(options.file, PathBuf::from("song.mod"));
        assert_eq!(options.sample_rate, 44_100);
        assert!(!options.mono);
        assert!(!options.info_only);
        assert!(options.out.is_none());
    }

    #[test]
    fn test_parse_args_flags() {
        let options = parse_args(args(&[
            "--out", "x.wav", "--rate", "22050", "--mono", "--seconds", "30", "a.mod",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(options.out, Some(PathBuf::from("x.wav")));
        assert_eq!(options.sample_rate, 22_050);
        assert!(options.mono);
        assert_eq!(options.seconds, 30.0);
    }

    #[test]
    fn test_parse_args_errors_and_help() {
        assert!(parse_args(args(&["--rate"])).is_err());
        assert!(parse_args(args(&["--rate", "fast", "a.mod"])).is_err());
        assert!(parse_args(args(&["--bogus", "a.mod"])).is_err());
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
        assert!(parse_args(args(&[])).unwrap().is_none());
    }
}
