use std::path::PathBuf;

use clap::Parser;
use renderer::{Antialiasing, BackendPreference, GpuPowerPreference};

#[derive(Parser, Debug)]
#[command(
    name = "shadersketch",
    author,
    version,
    about = "Runs a WebGL-style vertex/fragment shader sketch in a native window"
)]
pub struct Cli {
    /// Directory holding the sketch shaders and an optional `sketch.toml`.
    #[arg(value_name = "SKETCH_DIR", default_value = ".")]
    pub sketch_dir: PathBuf,

    /// Vertex shader path, relative to the sketch directory.
    #[arg(long, value_name = "PATH")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader path, relative to the sketch directory.
    #[arg(long, value_name = "PATH")]
    pub fragment: Option<PathBuf>,

    /// Sketch configuration file (defaults to `SKETCH_DIR/sketch.toml` when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logical window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Graphics context tiers to try: `auto`, `modern`, or `legacy`.
    #[arg(long, value_name = "TIER", value_parser = parse_backend)]
    pub backend: Option<BackendPreference>,

    /// GPU adapter power preference: `high` or `low`.
    #[arg(long, value_name = "POWER", value_parser = parse_power)]
    pub power: Option<GpuPowerPreference>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Window title.
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Compile and validate the shaders, print the uniform layout, then exit.
    #[arg(long)]
    pub check: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_backend(value: &str) -> Result<BackendPreference, String> {
    value.parse()
}

pub fn parse_power(value: &str) -> Result<GpuPowerPreference, String> {
    value.parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_accepts_common_separators() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 800 X 600 "), Ok((800, 600)));
        assert_eq!(parse_size("640×480"), Ok((640, 480)));
    }

    #[test]
    fn size_rejects_zero_and_garbage() {
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("1280").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn flags_parse_into_overrides() {
        let cli = Cli::try_parse_from([
            "shadersketch",
            "demos/plasma",
            "--size",
            "800x600",
            "--backend",
            "legacy",
            "--antialias",
            "4",
            "--check",
        ])
        .expect("valid arguments");
        assert_eq!(cli.sketch_dir, PathBuf::from("demos/plasma"));
        assert_eq!(cli.size, Some((800, 600)));
        assert_eq!(cli.backend, Some(BackendPreference::Legacy));
        assert_eq!(cli.antialias, Some(Antialiasing::Samples(4)));
        assert_eq!(cli.power, None);
        assert!(cli.check);
    }

    #[test]
    fn sketch_dir_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["shadersketch"]).expect("no arguments");
        assert_eq!(cli.sketch_dir, PathBuf::from("."));
        assert!(!cli.check);
    }

    #[test]
    fn invalid_backend_is_rejected() {
        assert!(Cli::try_parse_from(["shadersketch", "--backend", "metal2"]).is_err());
    }
}
