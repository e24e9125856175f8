//! Compiler invocation.
//!
//! Sources are compiled with `javac -g` so the class files carry the
//! line tables the debugger needs. Compiler diagnostics come back
//! verbatim, with a best-effort friendlier explanation for the
//! mistakes beginners actually make.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tokio::process::Command;

use crate::error::CompileFailure;
use crate::error::RuntimeError;

/// Known javac diagnostic fragments and what they usually mean.
const FRIENDLY_DIAGNOSTICS: &[(&str, &str)] = &[
    ("';' expected", "A semicolon is missing at the end of a statement."),
    ("')' expected", "A closing parenthesis is missing."),
    ("'{' expected", "An opening curly brace is missing."),
    (
        "reached end of file while parsing",
        "A closing curly brace is missing somewhere in the program.",
    ),
    (
        "cannot find symbol",
        "The program uses a name that was never declared. Check the spelling of your variables and methods.",
    ),
    (
        "incompatible types",
        "A value is being stored in a variable of a different type.",
    ),
    (
        "variable might not have been initialized",
        "A variable is read before it was given a value.",
    ),
    (
        "missing return statement",
        "A method that promises to return a value has a path that returns nothing.",
    ),
    (
        "unreachable statement",
        "A statement can never run because the program always leaves the method before it.",
    ),
    (
        "should be declared in a file named",
        "The public class name must match the file name.",
    ),
];

/// Friendlier wording for a raw javac diagnostic, when recognized.
#[must_use]
pub fn friendly_diagnostic(raw: &str) -> Option<String> {
    FRIENDLY_DIAGNOSTICS
        .iter()
        .find(|(fragment, _)| raw.contains(fragment))
        .map(|&(_, friendly)| friendly.to_owned())
}

#[derive(Debug, Clone)]
pub struct Compiler {
    javac: Utf8PathBuf,
    out_dir: Utf8PathBuf,
}

impl Compiler {
    #[must_use]
    pub fn new(javac: Utf8PathBuf, out_dir: Utf8PathBuf) -> Self {
        Self { javac, out_dir }
    }

    /// Directory the class files land in; doubles as the classpath for
    /// launching the compiled program.
    #[must_use]
    pub fn classpath(&self) -> &Utf8Path {
        &self.out_dir
    }

    /// Write `source` out as `{class_name}.java` and compile it with
    /// debug line tables. Returns the path of the written source file.
    pub async fn compile(
        &self,
        source: &str,
        class_name: &str,
    ) -> Result<Utf8PathBuf, RuntimeError> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let source_path = self.out_dir.join(format!("{class_name}.java"));
        tokio::fs::write(&source_path, source).await?;

        tracing::debug!(%source_path, "compiling");
        let output = Command::new(self.javac.as_std_path())
            .arg("-g")
            .arg("-d")
            .arg(self.out_dir.as_std_path())
            .arg(source_path.as_std_path())
            .output()
            .await?;

        if output.status.success() {
            return Ok(source_path);
        }

        let raw = String::from_utf8_lossy(&output.stderr).into_owned();
        let friendly = friendly_diagnostic(&raw);
        tracing::debug!(%raw, "compilation failed");
        Err(RuntimeError::Compile(CompileFailure { raw, friendly }))
    }
}
