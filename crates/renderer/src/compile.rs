//! Translation of WebGL-style sketch shaders into Vulkan GLSL.
//!
//! Sketch shaders are written against the WebGL conventions: loose
//! `uniform` declarations, `attribute`/`varying` (GLSL ES 1.00) or `in`/`out`
//! (GLSL ES 3.00), `gl_FragColor`, and a bottom-left `gl_FragCoord`. wgpu's
//! GLSL frontend wants `#version 450` with explicit locations and uniform
//! blocks, so each stage is rewritten line by line:
//!
//! 1. `#version` and `precision` statements are blanked.
//! 2. Loose uniforms from both stages are merged into one std140 block (see
//!    [`UniformLayout`]) and the bare names are aliased with `#define`.
//! 3. Attributes and varyings receive explicit locations; fragment varyings
//!    reuse the vertex stage's locations by name.
//! 4. The fragment stage is wrapped so `gl_FragCoord` keeps its bottom-left
//!    origin and `gl_FragColor` lands in colour attachment 0.
//!
//! Rewritten lines keep their position and a `#line 1` marker precedes the
//! body, so diagnostics point at the user's own line numbers. Both stages are
//! validated with naga before any GPU work happens.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use wgpu::naga;

use crate::error::{ShaderStage, SketchError};
use crate::gpu::uniforms::UniformKind;
use crate::gpu::UniformLayout;

/// Vertex attributes the rectangle geometry provides.
const ATTRIBUTES: [(&str, &str, u32); 2] =
    [("aPosition", "vec3", 0), ("aTexCoord", "vec2", 1)];

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a loaded [`ShaderProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u64);

/// One translated stage ready for `wgpu::ShaderSource::Glsl`.
#[derive(Debug, Clone)]
pub struct StageSource {
    pub path: PathBuf,
    pub glsl: String,
}

/// A vertex/fragment pair that has been translated and validated.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    id: ProgramId,
    vertex: StageSource,
    fragment: StageSource,
    layout: UniformLayout,
    varyings: Vec<String>,
}

impl ShaderProgram {
    /// Reads both stages from disk and compiles them.
    pub fn load(vertex_path: &Path, fragment_path: &Path) -> Result<Self, SketchError> {
        let vertex = read_stage(ShaderStage::Vertex, vertex_path)?;
        let fragment = read_stage(ShaderStage::Fragment, fragment_path)?;
        Self::from_sources(vertex_path, &vertex, fragment_path, &fragment)
    }

    /// Translates and validates in-memory sources. Paths are only used for
    /// diagnostics.
    pub fn from_sources(
        vertex_path: &Path,
        vertex_source: &str,
        fragment_path: &Path,
        fragment_source: &str,
    ) -> Result<Self, SketchError> {
        let vertex = scan_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = scan_stage(ShaderStage::Fragment, fragment_source)?;

        let mut layout = UniformLayout::default();
        for (name, kind) in vertex.uniforms.iter().chain(&fragment.uniforms) {
            layout.declare(name, *kind)?;
        }
        check_member_collisions(ShaderStage::Vertex, &vertex, &layout)?;
        check_member_collisions(ShaderStage::Fragment, &fragment, &layout)?;

        let varyings: Vec<String> = vertex.varyings.iter().map(|v| v.name.clone()).collect();
        for varying in &fragment.varyings {
            if !varyings.contains(&varying.name) {
                return Err(SketchError::UnsupportedDeclaration {
                    stage: ShaderStage::Fragment,
                    line: varying.line,
                    detail: format!(
                        "varying `{}` is not written by the vertex shader",
                        varying.name
                    ),
                });
            }
        }

        let vertex_glsl = emit_vertex(&vertex, &layout);
        let fragment_glsl = emit_fragment(&fragment, &layout, &varyings);
        validate(ShaderStage::Vertex, vertex_path, &vertex_glsl)?;
        validate(ShaderStage::Fragment, fragment_path, &fragment_glsl)?;

        let id = ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            ?id,
            vertex = %vertex_path.display(),
            fragment = %fragment_path.display(),
            uniforms = layout.fields().len(),
            varyings = varyings.len(),
            "shader program compiled"
        );

        Ok(Self {
            id,
            vertex: StageSource {
                path: vertex_path.to_path_buf(),
                glsl: vertex_glsl,
            },
            fragment: StageSource {
                path: fragment_path.to_path_buf(),
                glsl: fragment_glsl,
            },
            layout,
            varyings,
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn vertex(&self) -> &StageSource {
        &self.vertex
    }

    pub fn fragment(&self) -> &StageSource {
        &self.fragment
    }

    pub fn uniform_layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn varyings(&self) -> &[String] {
        &self.varyings
    }
}

fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, SketchError> {
    std::fs::read_to_string(path).map_err(|source| SketchError::ShaderRead {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

/// Interpolation and sampling qualifiers accepted in front of a varying.
const INTERPOLATION_QUALIFIERS: [&str; 4] = ["flat", "smooth", "noperspective", "centroid"];

const STORAGE_KEYWORDS: [&str; 5] = ["uniform", "attribute", "varying", "in", "out"];

#[derive(Debug)]
struct Varying {
    name: String,
    ty: String,
    /// Qualifiers to repeat in front of the emitted declaration, each
    /// followed by a space.
    qualifiers: String,
    line: usize,
}

/// Result of the line scan: the body with declarations rewritten in place
/// plus everything the header needs to know.
#[derive(Debug)]
struct ScannedStage {
    /// One entry per source line; varyings are resolved to a location at
    /// emit time.
    lines: Vec<Vec<Part>>,
    /// Source lines with comments removed.
    code: Vec<String>,
    uniforms: Vec<(String, UniformKind)>,
    varyings: Vec<Varying>,
    uses_frag_color: bool,
}

#[derive(Debug)]
enum Part {
    Text(String),
    Varying(usize),
}

/// A source line with its comments removed.
#[derive(Debug)]
struct CodeLine {
    code: String,
    /// The line begins inside a `/* */` comment.
    starts_in_comment: bool,
    /// A `/* */` comment is still open at the end of the line.
    ends_in_comment: bool,
}

fn strip_comments(source: &str) -> Vec<CodeLine> {
    let mut in_block = false;
    source
        .lines()
        .map(|line| {
            let starts_in_comment = in_block;
            let mut code = String::with_capacity(line.len());
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                let next = chars.peek().copied();
                if in_block {
                    if c == '*' && next == Some('/') {
                        chars.next();
                        in_block = false;
                    }
                    continue;
                }
                match (c, next) {
                    ('/', Some('/')) => break,
                    ('/', Some('*')) => {
                        chars.next();
                        in_block = true;
                        code.push(' ');
                    }
                    _ => code.push(c),
                }
            }
            CodeLine {
                code,
                starts_in_comment,
                ends_in_comment: in_block,
            }
        })
        .collect()
}

/// Net change in `{`/`(` nesting across a comment-free line.
fn nesting(code: &str) -> i32 {
    code.chars()
        .map(|c| match c {
            '{' | '(' => 1,
            '}' | ')' => -1,
            _ => 0,
        })
        .sum()
}

fn scan_stage(stage: ShaderStage, source: &str) -> Result<ScannedStage, SketchError> {
    let raw: Vec<&str> = source.lines().collect();
    let code = strip_comments(source);
    let mut scanned = ScannedStage {
        lines: Vec::with_capacity(raw.len()),
        code: code.iter().map(|line| line.code.clone()).collect(),
        uniforms: Vec::new(),
        varyings: Vec::new(),
        uses_frag_color: false,
    };
    let mut has_user_output = false;
    let mut depth = 0;
    let mut index = 0;

    while index < raw.len() {
        let line_number = index + 1;
        let trimmed = code[index].code.trim();

        // Only global-scope lines can declare storage; anything nested is a
        // function parameter list or body.
        if depth == 0 && (trimmed.starts_with("#version") || is_statement(trimmed, "precision")) {
            scanned
                .lines
                .push(reopen_comments(&code, index, index, Vec::new()));
            index += 1;
            continue;
        }

        if depth == 0 && split_declaration(trimmed).is_some() {
            let end = (index..raw.len())
                .find(|&candidate| code[candidate].code.contains(';'))
                .ok_or_else(|| SketchError::UnsupportedDeclaration {
                    stage,
                    line: line_number,
                    detail: "declaration is missing its terminating `;`".into(),
                })?;
            let statement = code[index..=end]
                .iter()
                .map(|line| line.code.trim())
                .collect::<Vec<_>>()
                .join(" ");
            let parts = scan_declarations(
                stage,
                &statement,
                line_number,
                &mut scanned,
                &mut has_user_output,
            )?;
            scanned.lines.push(reopen_comments(&code, index, end, parts));
            // Continuation lines stay in place so line numbers still match.
            for _ in index + 1..=end {
                scanned.lines.push(Vec::new());
            }
            index = end + 1;
            continue;
        }

        depth += nesting(trimmed);
        let mut line = raw[index].to_string();
        if stage == ShaderStage::Fragment {
            if contains_identifier(&line, "gl_FragColor") {
                scanned.uses_frag_color = true;
                line = replace_identifier(&line, "gl_FragColor", "sketch_FragColor");
            }
            line = replace_identifier(&line, "gl_FragCoord", "sketch_FragCoord");
            line = replace_identifier(&line, "main", "sketch_user_main");
        }
        scanned.lines.push(vec![Part::Text(line)]);
        index += 1;
    }

    if stage == ShaderStage::Fragment && has_user_output && scanned.uses_frag_color {
        return Err(SketchError::UnsupportedDeclaration {
            stage,
            line: 0,
            detail: "shader mixes gl_FragColor with a declared `out` colour".into(),
        });
    }

    Ok(scanned)
}

/// Rewritten lines drop their comments, so a block comment that crosses
/// into or out of the replaced range has to be closed and reopened.
fn reopen_comments(code: &[CodeLine], first: usize, last: usize, mut parts: Vec<Part>) -> Vec<Part> {
    if code[first].starts_in_comment {
        parts.insert(0, Part::Text("*/".into()));
    }
    if code[last].ends_in_comment {
        parts.push(Part::Text("/*".into()));
    }
    parts
}

/// Handles every `;`-terminated declaration of one global statement.
fn scan_declarations(
    stage: ShaderStage,
    statement: &str,
    line: usize,
    scanned: &mut ScannedStage,
    has_user_output: &mut bool,
) -> Result<Vec<Part>, SketchError> {
    let unsupported = |detail: String| SketchError::UnsupportedDeclaration {
        stage,
        line,
        detail,
    };

    let mut pieces: Vec<&str> = statement.split(';').map(str::trim).collect();
    let trailing = pieces.pop().unwrap_or_default();
    if !trailing.is_empty() {
        return Err(unsupported(format!(
            "unexpected `{trailing}` after a declaration; declarations need a line of their own"
        )));
    }

    let mut parts = Vec::new();
    for piece in pieces.into_iter().filter(|piece| !piece.is_empty()) {
        let Some(declaration) = split_declaration(piece) else {
            return Err(unsupported(format!(
                "`{piece}` shares a line with a declaration; declarations need a line of their own"
            )));
        };
        if piece.contains(['{', '(']) {
            return Err(unsupported(format!(
                "`{piece}`: interface blocks and initializers are not supported"
            )));
        }
        let (ty, names) = parse_declaration(declaration.rest).map_err(unsupported)?;
        let keyword = declaration.keyword;
        let qualified = !declaration.qualifiers.is_empty();

        match (keyword, stage) {
            ("varying" | "out", ShaderStage::Vertex) | ("varying" | "in", ShaderStage::Fragment) => {
                let qualifiers: String = declaration
                    .qualifiers
                    .iter()
                    .map(|qualifier| format!("{qualifier} "))
                    .collect();
                for name in names {
                    scanned.varyings.push(Varying {
                        name,
                        ty: ty.clone(),
                        qualifiers: qualifiers.clone(),
                        line,
                    });
                    parts.push(Part::Varying(scanned.varyings.len() - 1));
                }
            }
            _ if qualified => {
                return Err(unsupported(format!(
                    "`{}` only applies to varyings, not `{keyword}` declarations",
                    declaration.qualifiers.join(" ")
                )));
            }
            ("uniform", _) => {
                let kind = UniformKind::from_glsl(&ty).ok_or_else(|| {
                    unsupported(format!(
                        "uniform type `{ty}` is not supported (use float, int, vec2, vec3 or vec4)"
                    ))
                })?;
                for name in names {
                    scanned.uniforms.push((name, kind));
                }
            }
            ("attribute" | "in", ShaderStage::Vertex) => {
                for name in names {
                    let (_, expected, location) = ATTRIBUTES
                        .iter()
                        .find(|(attribute, _, _)| *attribute == name)
                        .ok_or_else(|| {
                            unsupported(format!(
                                "attribute `{name}` is not provided (available: aPosition, aTexCoord)"
                            ))
                        })?;
                    if *expected != ty {
                        return Err(unsupported(format!(
                            "attribute `{name}` must be declared as {expected}, found {ty}"
                        )));
                    }
                    parts.push(Part::Text(format!(
                        "layout(location = {location}) in {ty} {name};"
                    )));
                }
            }
            ("out", ShaderStage::Fragment) => {
                if *has_user_output || names.len() != 1 || ty != "vec4" {
                    return Err(unsupported(
                        "fragment shaders may declare a single `out vec4` colour output".into(),
                    ));
                }
                *has_user_output = true;
                parts.push(Part::Text(format!(
                    "layout(location = 0) out vec4 {};",
                    names[0]
                )));
            }
            _ => {
                return Err(unsupported(format!(
                    "`{keyword}` declarations are not valid in a {stage} shader"
                )))
            }
        }
    }
    Ok(parts)
}

/// A storage declaration split into qualifiers, keyword and the rest.
#[derive(Debug, PartialEq)]
struct Declaration<'a> {
    qualifiers: Vec<&'static str>,
    keyword: &'static str,
    rest: &'a str,
}

/// Recognises `[flat|smooth|...] keyword rest` for the storage keywords the
/// translator rewrites.
fn split_declaration(statement: &str) -> Option<Declaration<'_>> {
    let mut rest = statement.trim();
    let mut qualifiers = Vec::new();
    while let Some(qualifier) = INTERPOLATION_QUALIFIERS
        .into_iter()
        .find(|qualifier| is_statement(rest, qualifier))
    {
        qualifiers.push(qualifier);
        rest = rest[qualifier.len()..].trim_start();
    }
    let keyword = STORAGE_KEYWORDS
        .into_iter()
        .find(|keyword| is_statement(rest, keyword))?;
    Some(Declaration {
        qualifiers,
        keyword,
        rest: rest[keyword.len()..].trim(),
    })
}

fn is_statement(trimmed: &str, keyword: &str) -> bool {
    trimmed
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// The uniform aliases are plain `#define`s, so a uniform that shares its
/// name with a member or swizzle (`p.time`, `v.x`) would be rewritten there
/// too.
fn check_member_collisions(
    stage: ShaderStage,
    scanned: &ScannedStage,
    layout: &UniformLayout,
) -> Result<(), SketchError> {
    for (index, code) in scanned.code.iter().enumerate() {
        for field in layout.fields() {
            let collides = identifier_positions(code, &field.name)
                .any(|position| code[..position].trim_end().ends_with('.'));
            if collides {
                return Err(SketchError::UnsupportedDeclaration {
                    stage,
                    line: index + 1,
                    detail: format!(
                        "uniform `{name}` is also used as a member or swizzle (`.{name}`); rename the uniform",
                        name = field.name
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Parses `[precision] type name[, name]` into the type and names.
fn parse_declaration(rest: &str) -> Result<(String, Vec<String>), String> {
    let body = rest.trim_end_matches(';').trim();
    let mut tokens = body.splitn(2, char::is_whitespace);
    let mut ty = tokens.next().unwrap_or_default();
    let mut names = tokens.next().unwrap_or_default().trim();
    if PRECISION_QUALIFIERS.contains(&ty) {
        let mut inner = names.splitn(2, char::is_whitespace);
        ty = inner.next().unwrap_or_default();
        names = inner.next().unwrap_or_default().trim();
    }
    if ty.is_empty() || names.is_empty() {
        return Err(format!("could not parse declaration `{body}`"));
    }

    let names: Vec<String> = names.split(',').map(|name| name.trim().to_string()).collect();
    for name in &names {
        if name.contains('[') {
            return Err(format!("array declaration `{name}` is not supported"));
        }
        if !is_identifier(name) {
            return Err(format!("`{name}` is not a valid identifier"));
        }
    }
    Ok((ty.to_string(), names))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte offsets of whole-identifier occurrences of `ident` in `line`.
fn identifier_positions<'a>(line: &'a str, ident: &'a str) -> impl Iterator<Item = usize> + 'a {
    line.match_indices(ident).filter_map(move |(position, _)| {
        let before = line[..position].chars().next_back();
        let after = line[position + ident.len()..].chars().next();
        let bounded =
            !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char);
        bounded.then_some(position)
    })
}

fn contains_identifier(line: &str, ident: &str) -> bool {
    identifier_positions(line, ident).next().is_some()
}

fn replace_identifier(line: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for position in identifier_positions(line, from) {
        out.push_str(&line[last..position]);
        out.push_str(to);
        last = position + from.len();
    }
    out.push_str(&line[last..]);
    out
}

fn emit_vertex(scanned: &ScannedStage, layout: &UniformLayout) -> String {
    let mut glsl = String::from("#version 450\n");
    glsl.push_str(&layout.glsl_block());
    glsl.push_str("#line 1\n");
    push_body(&mut glsl, scanned, |varying, index| {
        format!(
            "layout(location = {index}) {}out {} {};",
            varying.qualifiers, varying.ty, varying.name
        )
    });
    glsl
}

fn emit_fragment(scanned: &ScannedStage, layout: &UniformLayout, varyings: &[String]) -> String {
    let mut glsl = String::from("#version 450\n");
    glsl.push_str(&layout.glsl_block());
    if scanned.uses_frag_color {
        glsl.push_str("layout(location = 0) out vec4 sketch_FragColor;\n");
    }
    glsl.push_str("vec4 sketch_FragCoord;\n");
    glsl.push_str("#line 1\n");
    push_body(&mut glsl, scanned, |varying, _| {
        let location = varyings
            .iter()
            .position(|name| *name == varying.name)
            .unwrap_or_default();
        format!(
            "layout(location = {location}) {}in {} {};",
            varying.qualifiers, varying.ty, varying.name
        )
    });
    glsl.push_str(FRAGMENT_FOOTER);
    glsl
}

fn push_body(glsl: &mut String, scanned: &ScannedStage, varying: impl Fn(&Varying, usize) -> String) {
    for parts in &scanned.lines {
        let line: Vec<String> = parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => text.clone(),
                Part::Varying(index) => varying(&scanned.varyings[*index], *index),
            })
            .collect();
        glsl.push_str(&line.join(" "));
        glsl.push('\n');
    }
}

/// Restores WebGL's bottom-left `gl_FragCoord` inside the presented canvas
/// and then runs the sketch's own `main`.
const FRAGMENT_FOOTER: &str = r"
void main() {
    vec2 sketch_scale = sketch_ubo.sketch_canvas.xy / max(sketch_ubo.sketch_viewport.zw, vec2(1.0));
    vec2 sketch_local = (gl_FragCoord.xy - sketch_ubo.sketch_viewport.xy) * sketch_scale;
    sketch_FragCoord = vec4(sketch_local.x, sketch_ubo.sketch_canvas.y - sketch_local.y, gl_FragCoord.z, gl_FragCoord.w);
    sketch_user_main();
}
";

fn validate(stage: ShaderStage, path: &Path, glsl: &str) -> Result<(), SketchError> {
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let compile_error = |message: String| SketchError::ShaderCompile {
        stage,
        path: path.to_path_buf(),
        message,
    };

    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(naga_stage), glsl)
        .map_err(|errors| compile_error(errors.emit_to_string(glsl)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|error| compile_error(error.emit_to_string(glsl)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT_100: &str = r"
attribute vec3 aPosition;
attribute vec2 aTexCoord;
varying vec2 vTexCoord;

void main() {
    vTexCoord = aTexCoord;
    vec4 positionVec4 = vec4(aPosition, 1.0);
    positionVec4.xy = positionVec4.xy * 2.0 - 1.0;
    gl_Position = positionVec4;
}
";

    const FRAG_100: &str = r"
#ifdef GL_ES
precision mediump float;
#endif

varying vec2 vTexCoord;
uniform vec2 resolution;
uniform float time;

void main() {
    vec2 st = gl_FragCoord.xy / resolution.xy;
    float wave = 0.5 + 0.5 * sin(time + st.x * 6.2831);
    gl_FragColor = vec4(st.x, wave, vTexCoord.y, 1.0);
}
";

    const VERT_300: &str = r"#version 300 es
in vec3 aPosition;
in vec2 aTexCoord;
out vec2 vUv;
uniform highp float time;

void main() {
    vUv = aTexCoord;
    gl_Position = vec4(aPosition.xy * 2.0 - 1.0, 0.0, 1.0);
}
";

    const FRAG_300: &str = r"#version 300 es
precision highp float;
in vec2 vUv;
out vec4 fragColor;
uniform vec2 resolution;
uniform float time;

void main() {
    fragColor = vec4(vUv, fract(time), 1.0);
}
";

    fn compile(vertex: &str, fragment: &str) -> Result<ShaderProgram, SketchError> {
        ShaderProgram::from_sources(
            Path::new("vert.glsl"),
            vertex,
            Path::new("frag.glsl"),
            fragment,
        )
    }

    #[test]
    fn webgl1_pair_compiles_with_resolution_and_time() {
        let program = compile(VERT_100, FRAG_100).expect("compile");
        let names: Vec<_> = program
            .uniform_layout()
            .fields()
            .iter()
            .map(|field| field.name.as_str())
            .collect();
        assert_eq!(names, vec!["resolution", "time"]);
        assert_eq!(program.varyings(), &["vTexCoord".to_string()]);
        assert!(program
            .vertex()
            .glsl
            .contains("layout(location = 0) in vec3 aPosition;"));
        assert!(program.fragment().glsl.contains("sketch_FragColor = vec4"));
        assert!(!program.fragment().glsl.contains("precision mediump"));
    }

    #[test]
    fn webgl2_pair_merges_uniforms_across_stages() {
        let program = compile(VERT_300, FRAG_300).expect("compile");
        let layout = program.uniform_layout();
        assert_eq!(layout.fields().len(), 2);
        assert_eq!(layout.field("time").map(|f| f.kind), Some(UniformKind::Float));
        assert_eq!(layout.field("resolution").map(|f| f.kind), Some(UniformKind::Vec2));
        assert!(program
            .fragment()
            .glsl
            .contains("layout(location = 0) out vec4 fragColor;"));
        assert!(!program.vertex().glsl.contains("300 es"));
    }

    #[test]
    fn programs_get_distinct_ids() {
        let first = compile(VERT_100, FRAG_100).expect("first");
        let second = compile(VERT_100, FRAG_100).expect("second");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn body_line_numbers_are_preserved() {
        let program = compile(VERT_100, FRAG_100).expect("compile");
        let glsl = &program.fragment().glsl;
        let body = glsl.split("#line 1\n").nth(1).expect("body marker");
        let source_lines: Vec<_> = FRAG_100.lines().collect();
        let body_lines: Vec<_> = body.lines().collect();
        let main_index = source_lines
            .iter()
            .position(|line| line.starts_with("void main"))
            .expect("main in source");
        assert!(body_lines[main_index].starts_with("void sketch_user_main"));
    }

    #[test]
    fn syntax_errors_report_stage_and_path() {
        let broken = "void main() { gl_FragColor = vec4(1.0) }";
        let err = compile(VERT_100, broken).unwrap_err();
        match err {
            SketchError::ShaderCompile { stage, path, .. } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, PathBuf::from("frag.glsl"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn conflicting_uniform_types_are_rejected() {
        let vertex = VERT_100.replace(
            "varying vec2 vTexCoord;",
            "varying vec2 vTexCoord;\nuniform vec3 resolution;",
        );
        let err = compile(&vertex, FRAG_100).unwrap_err();
        assert!(matches!(err, SketchError::UniformConflict { .. }));
    }

    #[test]
    fn sampler_uniforms_are_unsupported() {
        let fragment = FRAG_100.replace("uniform float time;", "uniform sampler2D tex;");
        let err = compile(VERT_100, &fragment).unwrap_err();
        assert!(matches!(
            err,
            SketchError::UnsupportedDeclaration {
                stage: ShaderStage::Fragment,
                line: 8,
                ..
            }
        ));
    }

    #[test]
    fn unknown_attributes_are_unsupported() {
        let vertex = VERT_100.replace("attribute vec2 aTexCoord;", "attribute vec3 aNormal;");
        let err = compile(&vertex, FRAG_100).unwrap_err();
        assert!(matches!(err, SketchError::UnsupportedDeclaration { .. }));
    }

    #[test]
    fn fragment_varying_must_come_from_vertex() {
        let fragment = FRAG_100.replace("varying vec2 vTexCoord;", "varying vec2 vOther;")
            .replace("vTexCoord.y", "vOther.y");
        let err = compile(VERT_100, &fragment).unwrap_err();
        assert!(matches!(err, SketchError::UnsupportedDeclaration { .. }));
    }

    #[test]
    fn missing_files_surface_read_errors() {
        let err = ShaderProgram::load(Path::new("/nonexistent/vert.glsl"), Path::new("/nonexistent/frag.glsl"))
            .unwrap_err();
        assert!(matches!(
            err,
            SketchError::ShaderRead {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn identifier_replacement_respects_boundaries() {
        assert_eq!(
            replace_identifier("main(); domain; main_x; main", "main", "m"),
            "m(); domain; main_x; m"
        );
        assert!(contains_identifier("gl_FragColor = c;", "gl_FragColor"));
        assert!(!contains_identifier("my_gl_FragColor = c;", "gl_FragColor"));
    }

    #[test]
    fn declarations_with_precision_and_lists_parse() {
        assert_eq!(
            parse_declaration("highp vec2 a, b;"),
            Ok(("vec2".to_string(), vec!["a".to_string(), "b".to_string()]))
        );
        assert!(parse_declaration("float values[4];").is_err());
        assert!(split_declaration("float f(in vec2 p);").is_none());
        assert!(split_declaration("inner = 1.0;").is_none());
        assert_eq!(
            split_declaration("flat out float vSeed"),
            Some(Declaration {
                qualifiers: vec!["flat"],
                keyword: "out",
                rest: "float vSeed",
            })
        );
    }

    #[test]
    fn comments_are_stripped_across_lines() {
        let lines = strip_comments("uniform float t; // seconds\nfloat a; /* open\n still */ float b;");
        assert_eq!(lines[0].code, "uniform float t; ");
        assert!(!lines[0].ends_in_comment);
        assert_eq!(lines[1].code, "float a;  ");
        assert!(lines[1].ends_in_comment);
        assert!(lines[2].starts_in_comment);
        assert_eq!(lines[2].code, " float b;");
        assert!(!lines[2].ends_in_comment);
    }

    #[test]
    fn trailing_comments_do_not_hide_declarations() {
        let vertex = VERT_100
            .replace("attribute vec2 aTexCoord;", "attribute vec2 aTexCoord; // uv")
            .replace("varying vec2 vTexCoord;", "varying vec2 vTexCoord; /* uv */");
        let fragment = FRAG_100
            .replace("uniform float time;", "uniform float time; // seconds")
            .replace("varying vec2 vTexCoord;", "varying vec2 vTexCoord; // uv");

        let program = compile(&vertex, &fragment).expect("compile");
        assert_eq!(
            program.uniform_layout().field("time").map(|f| f.kind),
            Some(UniformKind::Float)
        );
        assert_eq!(program.varyings(), &["vTexCoord".to_string()]);
        assert!(program
            .vertex()
            .glsl
            .contains("layout(location = 1) in vec2 aTexCoord;"));
        assert!(!program.fragment().glsl.contains("uniform float time"));
    }

    enum Expect {
        Compiles,
        Unsupported(usize),
    }

    /// Declaration styles that show up in hand-written sketches. Each one
    /// compiles or is rejected with a declaration error on the right line,
    /// never with a raw GLSL error.
    #[test]
    fn declaration_forms_compile_or_fail_on_their_line() {
        let cases = vec![
            (
                "line comment after a uniform",
                VERT_100.to_string(),
                FRAG_100.replace("uniform float time;", "uniform float time; // seconds"),
                Expect::Compiles,
            ),
            (
                "block comment after an attribute",
                VERT_100.replace("attribute vec2 aTexCoord;", "attribute vec2 aTexCoord; /* uv */"),
                FRAG_100.to_string(),
                Expect::Compiles,
            ),
            (
                "block comment left open after a uniform",
                VERT_100.to_string(),
                FRAG_100.replace(
                    "uniform float time;",
                    "uniform float time; /* seconds\n   since the first frame */",
                ),
                Expect::Compiles,
            ),
            (
                "comments after varyings",
                VERT_100.replace("varying vec2 vTexCoord;", "varying vec2 vTexCoord; // uv"),
                FRAG_100.replace("varying vec2 vTexCoord;", "varying vec2 vTexCoord; /* uv */"),
                Expect::Compiles,
            ),
            (
                "declaration split across lines",
                VERT_100.to_string(),
                FRAG_100.replace("uniform vec2 resolution;", "uniform vec2\n    resolution;"),
                Expect::Compiles,
            ),
            (
                "name list split across lines",
                VERT_100.to_string(),
                FRAG_100.replace("uniform float time;", "uniform float time,\n    speed;"),
                Expect::Compiles,
            ),
            (
                "two declarations on one line",
                VERT_100.to_string(),
                FRAG_100.replace(
                    "uniform vec2 resolution;\nuniform float time;",
                    "uniform vec2 resolution; uniform float time;",
                ),
                Expect::Compiles,
            ),
            (
                "commented-out declarations",
                VERT_100.to_string(),
                FRAG_100.replace(
                    "uniform float time;",
                    "uniform float time;\n// uniform sampler2D tex;\n/* uniform mat4 m; */",
                ),
                Expect::Compiles,
            ),
            (
                "interpolation qualifiers",
                VERT_300
                    .replace("out vec2 vUv;", "smooth out vec2 vUv;\nflat out float vSeed;")
                    .replace("vUv = aTexCoord;", "vUv = aTexCoord;\n    vSeed = 0.5;"),
                FRAG_300
                    .replace("in vec2 vUv;", "smooth in vec2 vUv;\nflat in float vSeed;")
                    .replace("fract(time)", "fract(time + vSeed)"),
                Expect::Compiles,
            ),
            (
                "function parameters spread over lines",
                VERT_100.to_string(),
                FRAG_100.replace(
                    "void main() {",
                    "float ripple(\n    in float t,\n    in float x) {\n    return sin(t + x);\n}\n\nvoid main() {",
                ),
                Expect::Compiles,
            ),
            (
                "sampler with a trailing comment",
                VERT_100.to_string(),
                FRAG_100.replace("uniform float time;", "uniform sampler2D tex; // texture"),
                Expect::Unsupported(8),
            ),
            (
                "declaration sharing a line with code",
                VERT_100.to_string(),
                FRAG_100.replace("uniform float time;", "uniform float time; float speed = 2.0;"),
                Expect::Unsupported(8),
            ),
            (
                "qualifier on a uniform",
                VERT_100.to_string(),
                FRAG_100.replace("uniform float time;", "flat uniform float time;"),
                Expect::Unsupported(8),
            ),
            (
                "declaration never terminated",
                VERT_100.to_string(),
                "precision mediump float;\nuniform float time\n".to_string(),
                Expect::Unsupported(2),
            ),
            (
                "uniform block",
                VERT_300.to_string(),
                FRAG_300.replace("uniform float time;", "uniform Params {\n    float time;\n};"),
                Expect::Unsupported(6),
            ),
            (
                "uniform named like a swizzle",
                VERT_100.to_string(),
                FRAG_100.replace("uniform float time;", "uniform float time;\nuniform float x;"),
                Expect::Unsupported(13),
            ),
        ];

        for (name, vertex, fragment, expect) in cases {
            match (expect, compile(&vertex, &fragment)) {
                (Expect::Compiles, Ok(_)) => {}
                (Expect::Unsupported(line), Err(SketchError::UnsupportedDeclaration { line: actual, .. })) => {
                    assert_eq!(actual, line, "{name}");
                }
                (_, other) => panic!("{name}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn multi_line_declarations_keep_line_numbers() {
        let fragment = FRAG_100
            .replace("uniform vec2 resolution;", "uniform vec2 /* canvas\n pixels */\n    resolution;")
            .replace("uniform float time;", "uniform float time, // seconds\n    speed;");
        let program = compile(VERT_100, &fragment).expect("compile");
        let body = program
            .fragment()
            .glsl
            .split("#line 1\n")
            .nth(1)
            .expect("body marker")
            .to_string();
        let main_index = fragment
            .lines()
            .position(|line| line.starts_with("void main"))
            .expect("main in source");
        assert!(body.lines().nth(main_index).is_some_and(|line| line.starts_with("void sketch_user_main")));
        assert!(program.uniform_layout().field("speed").is_some());
    }

    #[test]
    fn uniforms_shadowing_member_names_are_rejected() {
        let fragment = FRAG_100.replace(
            "void main() {",
            "struct Pulse {\n    float time;\n};\n\nvoid main() {\n    Pulse p;\n    p.time = 1.0;",
        );
        let err = compile(VERT_100, &fragment).unwrap_err();
        match err {
            SketchError::UnsupportedDeclaration { stage, line, detail } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(line, 17);
                assert!(detail.contains("`.time`"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
