use std::io::{self, Write};

use anyhow::{Context, Result};
use renderer::{AssetLoader, ShaderProgram, ShaderSketch, Sketch, SketchConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config;

pub fn run(cli: Cli) -> Result<()> {
    let file = config::load_sketch_file(&cli).context("failed to load sketch configuration")?;
    if let Some((path, _)) = &file {
        tracing::debug!(path = %path.display(), "using sketch configuration file");
    }
    let config = config::resolve(&cli, file.as_ref().map(|(_, file)| file));
    tracing::debug!(?config, "resolved sketch configuration");

    let mut sketch = ShaderSketch::new(&config.vertex_shader, &config.fragment_shader);
    if cli.check {
        return check(&config, &mut sketch);
    }

    tracing::info!(
        sketch_dir = %config.sketch_dir.display(),
        width = config.window_size.0,
        height = config.window_size.1,
        backend = ?config.backend,
        "starting shadersketch"
    );
    renderer::run(&config, &mut sketch)
}

/// Preloads the sketch without opening a window and prints the uniform block
/// the shaders were merged into.
fn check(config: &SketchConfig, sketch: &mut ShaderSketch) -> Result<()> {
    let assets = AssetLoader::new(&config.sketch_dir);
    sketch
        .on_preload(&assets)
        .context("shader check failed")?;
    let program = sketch
        .program()
        .context("preload finished without a shader program")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, program).context("failed to write check report")?;
    Ok(())
}

fn write_report(out: &mut impl Write, program: &ShaderProgram) -> io::Result<()> {
    writeln!(out, "vertex   {}", program.vertex().path.display())?;
    writeln!(out, "fragment {}", program.fragment().path.display())?;
    let layout = program.uniform_layout();
    writeln!(out, "uniform block ({} bytes)", layout.size())?;
    for field in layout.fields() {
        writeln!(
            out,
            "  {:>4}  {:<5}  {}",
            field.offset,
            field.kind.glsl_name(),
            field.name
        )?;
    }
    if !program.varyings().is_empty() {
        writeln!(out, "varyings {}", program.varyings().join(", "))?;
    }
    writeln!(out, "ok")
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const VERTEX: &str = "attribute vec3 aPosition;\nvarying vec2 vUv;\nvoid main() {\n  vUv = aPosition.xy;\n  gl_Position = vec4(aPosition.xy * 2.0 - 1.0, 0.0, 1.0);\n}\n";
    const FRAGMENT: &str = "precision mediump float;\nuniform vec2 resolution;\nuniform float time;\nvarying vec2 vUv;\nvoid main() {\n  gl_FragColor = vec4(vUv, sin(time), 1.0);\n}\n";

    #[test]
    fn report_lists_uniform_offsets() {
        let program = ShaderProgram::from_sources(
            Path::new("vert.glsl"),
            VERTEX,
            Path::new("frag.glsl"),
            FRAGMENT,
        )
        .expect("valid shaders");

        let mut out = Vec::new();
        write_report(&mut out, &program).unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(report.contains("uniform block (48 bytes)"));
        assert!(report.contains("  32  vec2   resolution"));
        assert!(report.contains("  40  float  time"));
        assert!(report.contains("varyings vUv"));
        assert!(report.trim_end().ends_with("ok"));
    }
}
