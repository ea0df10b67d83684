//! # Generation
//!
//! Producing interpreter data for a grammar, either by running the ANTLR tool or
//! with the built-in ATN construction, and loading it back from `.interp` files.
//!
//! ```text
//! GrammarContext ──tool / builder──▶ <output_dir>/<Name>.interp
//!                                    <output_dir>/<Name>Lexer.interp (combined)
//!                ◀──────load──────── InterpreterData
//! ```
//!
//! The workspace drives the order (dependencies first) and stores the loaded data
//! on each context. Random sentence generation over loaded data lives in
//! [`sentence`].

pub mod sentence;

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::atn::{BuiltGrammar, InterpreterData};
use crate::context::GrammarContext;
use crate::error::{GrammarError, Result};
use crate::parser::GrammarType;
use crate::semantic::{Diagnostic, codes, mutually_left_recursive};

pub use sentence::{SentenceGenerationOptions, SentenceGenerator};

/// Name of the output directory used when the caller gives none, relative to
/// the grammar's own directory.
pub const DEFAULT_OUTPUT_DIR: &str = ".antlr";

// ============================================================================
// OPTIONS
// ============================================================================

/// Options for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    /// Where generated files go. Defaults to `.antlr` next to the grammar.
    pub output_dir: Option<PathBuf>,
    /// Target language for code generation (`Java`, `Cpp`, ...)
    pub language: Option<String>,
    /// Package or namespace for generated code
    pub package: Option<String>,
    pub listeners: bool,
    pub visitors: bool,
    /// Only load existing interpreter data, never run the tool
    pub load_only: bool,
    /// Tool jar to use instead of the configured one
    pub alternate_jar: Option<PathBuf>,
    /// Raw arguments passed through to the tool
    pub additional_parameters: Vec<String>,
}

impl GenerationOptions {
    /// The output directory for a grammar at `grammar`.
    pub fn output_dir_for(&self, grammar: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => grammar
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// How to run the external ANTLR tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolConfig {
    /// The Java executable
    pub java: PathBuf,
    /// The ANTLR complete jar. Without one the built-in ATN construction is used.
    pub jar: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            jar: None,
        }
    }
}

impl ToolConfig {
    /// The jar to run for `options`, if any.
    pub fn jar_for<'a>(&'a self, options: &'a GenerationOptions) -> Option<&'a Path> {
        options.alternate_jar.as_deref().or(self.jar.as_deref())
    }
}

// ============================================================================
// EXTERNAL TOOL
// ============================================================================

/// Command line arguments for running the tool on `files`.
pub fn tool_arguments(
    jar: &Path,
    options: &GenerationOptions,
    output_dir: &Path,
    files: &[PathBuf],
) -> Vec<OsString> {
    let mut arguments: Vec<OsString> = vec![
        "-jar".into(),
        jar.into(),
        "-o".into(),
        output_dir.into(),
    ];
    if let Some(language) = &options.language {
        arguments.push(format!("-Dlanguage={language}").into());
    }
    if let Some(package) = &options.package {
        arguments.push("-package".into());
        arguments.push(package.into());
    }
    arguments.push((if options.listeners { "-listener" } else { "-no-listener" }).into());
    arguments.push((if options.visitors { "-visitor" } else { "-no-visitor" }).into());
    arguments.push("-Xexact-output-dir".into());
    arguments.extend(options.additional_parameters.iter().map(OsString::from));
    arguments.extend(files.iter().map(OsString::from));
    arguments
}

/// Runs the tool and waits for it. A non-zero exit or any `error(...)` line on
/// stderr fails with the tool's own text.
pub async fn run_tool(
    tool: &ToolConfig,
    jar: &Path,
    options: &GenerationOptions,
    output_dir: &Path,
    files: &[PathBuf],
) -> Result<()> {
    tokio::fs::create_dir_all(output_dir).await?;
    let arguments = tool_arguments(jar, options, output_dir, files);
    debug!(java = %tool.java.display(), ?arguments, "running ANTLR tool");

    let output = Command::new(&tool.java).args(&arguments).output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() && !stderr.contains("error(") {
        return Ok(());
    }

    let message = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    warn!(status = ?output.status.code(), %message, "ANTLR tool failed");
    Err(GrammarError::tool(message))
}

// ============================================================================
// INTERPRETER DATA FILES
// ============================================================================

/// Locations of the `.interp` files of one grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpPaths {
    pub parser: Option<PathBuf>,
    pub lexer: Option<PathBuf>,
}

impl InterpPaths {
    /// Lexer grammars write `<Name>.interp` as lexer data, parser grammars write it
    /// as parser data, combined grammars write both with a `Lexer` suffix for the
    /// implicit lexer.
    pub fn new(name: &str, grammar_type: GrammarType, output_dir: &Path) -> Self {
        let own = output_dir.join(format!("{name}.interp"));
        match grammar_type {
            GrammarType::Lexer => Self {
                parser: None,
                lexer: Some(own),
            },
            GrammarType::Parser => Self {
                parser: Some(own),
                lexer: None,
            },
            GrammarType::Combined => Self {
                parser: Some(own),
                lexer: Some(output_dir.join(format!("{name}Lexer.interp"))),
            },
        }
    }

    pub fn of(context: &GrammarContext, output_dir: &Path) -> Self {
        Self::new(context.grammar_name(), context.grammar_type(), output_dir)
    }
}

/// Writes built interpreter data as `.interp` files. Returns the written paths.
pub async fn write_interpreter_data(
    built: &BuiltGrammar,
    paths: &InterpPaths,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (path, data) in [
        (&paths.parser, built.parser.as_ref()),
        (&paths.lexer, built.lexer.as_ref()),
    ] {
        let (Some(path), Some(data)) = (path, data) else {
            continue;
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, data.to_interp_string()).await?;
        debug!(path = %path.display(), rules = data.rule_names.len(), "wrote interpreter data");
        written.push(path.clone());
    }
    Ok(written)
}

/// Reads the `.interp` files that exist. Missing files yield `None`; malformed
/// ones fail.
pub async fn load_interpreter_data(
    paths: &InterpPaths,
) -> Result<(Option<InterpreterData>, Option<InterpreterData>)> {
    Ok((read_interp(paths.parser.as_deref()).await?, read_interp(paths.lexer.as_deref()).await?))
}

async fn read_interp(path: Option<&Path>) -> Result<Option<InterpreterData>> {
    let Some(path) = path else {
        return Ok(None);
    };
    match tokio::fs::read_to_string(path).await {
        Ok(text) => InterpreterData::parse(&text, path).map(Some),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no interpreter data");
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Errors for rule sets the tool rejects as mutually left-recursive, one per set,
/// placed on the first rule name of the set.
pub fn left_recursion_diagnostics(context: &GrammarContext) -> Vec<Diagnostic> {
    let index = context.line_index();
    mutually_left_recursive(&context.tree())
        .into_iter()
        .filter_map(|group| {
            let first = group.first()?;
            let names = group
                .iter()
                .map(|token| token.text().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Some(
                Diagnostic::error_at(
                    &index,
                    first.text_range(),
                    format!("The following sets of rules are mutually left-recursive [{names}]"),
                )
                .with_code(codes::LEFT_RECURSION),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::build_interpreter_data;

    fn strings(arguments: Vec<OsString>) -> Vec<String> {
        arguments
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_tool_arguments() {
        let options = GenerationOptions {
            language: Some("Cpp".into()),
            package: Some("demo".into()),
            visitors: true,
            additional_parameters: vec!["-Xlog".into()],
            ..Default::default()
        };
        let arguments = tool_arguments(
            Path::new("antlr.jar"),
            &options,
            Path::new("out"),
            &[PathBuf::from("T.g4")],
        );
        assert_eq!(
            strings(arguments),
            vec![
                "-jar",
                "antlr.jar",
                "-o",
                "out",
                "-Dlanguage=Cpp",
                "-package",
                "demo",
                "-no-listener",
                "-visitor",
                "-Xexact-output-dir",
                "-Xlog",
                "T.g4",
            ]
        );
    }

    #[test]
    fn test_alternate_jar_wins() {
        let tool = ToolConfig {
            jar: Some("configured.jar".into()),
            ..Default::default()
        };
        let mut options = GenerationOptions::default();
        assert_eq!(tool.jar_for(&options), Some(Path::new("configured.jar")));
        options.alternate_jar = Some("other.jar".into());
        assert_eq!(tool.jar_for(&options), Some(Path::new("other.jar")));
        assert_eq!(ToolConfig::default().jar_for(&GenerationOptions::default()), None);
    }

    #[test]
    fn test_default_output_dir_is_next_to_grammar() {
        let options = GenerationOptions::default();
        assert_eq!(
            options.output_dir_for(Path::new("/g/T.g4")),
            PathBuf::from("/g/.antlr")
        );
    }

    #[test]
    fn test_interp_paths_per_grammar_type() {
        let dir = Path::new("out");
        let combined = InterpPaths::new("T", GrammarType::Combined, dir);
        assert_eq!(combined.parser, Some(dir.join("T.interp")));
        assert_eq!(combined.lexer, Some(dir.join("TLexer.interp")));
        let lexer = InterpPaths::new("L", GrammarType::Lexer, dir);
        assert_eq!((lexer.parser, lexer.lexer), (None, Some(dir.join("L.interp"))));
    }

    #[test]
    fn test_generation_options_from_json() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"outputDir": "gen", "loadOnly": true}"#).unwrap();
        assert_eq!(options.output_dir, Some(PathBuf::from("gen")));
        assert!(options.load_only);
        assert!(!options.visitors);
    }

    #[tokio::test]
    async fn test_write_then_load_interpreter_data() {
        let dir = tempfile::tempdir().unwrap();
        let context = GrammarContext::new(
            dir.path().join("T.g4"),
            "grammar T;\ns: ID+;\nID: [a-z]+;\nWS: ' ' -> skip;\n",
        );
        let built = build_interpreter_data(&context.tree(), &[], None);
        let paths = InterpPaths::of(&context, dir.path());

        let written = write_interpreter_data(&built, &paths).await.unwrap();
        assert_eq!(written.len(), 2);

        let (parser, lexer) = load_interpreter_data(&paths).await.unwrap();
        assert_eq!(parser, built.parser);
        assert_eq!(lexer, built.lexer);
    }

    #[tokio::test]
    async fn test_missing_interp_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InterpPaths::new("T", GrammarType::Combined, dir.path());
        let (parser, lexer) = load_interpreter_data(&paths).await.unwrap();
        assert!(parser.is_none() && lexer.is_none());
    }

    #[test]
    fn test_mutual_left_recursion_reported_once() {
        let context = GrammarContext::new("T.g4", "grammar T;\na: b 'x' | 'y';\nb: a 'z';\n");
        let diagnostics = left_recursion_diagnostics(&context);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            &*diagnostics[0].message,
            "The following sets of rules are mutually left-recursive [a, b]"
        );
        assert_eq!(diagnostics[0].range.start.row, 2);
    }
}
