//! Console output with secret masking.
//!
//! Every line goes through [`Console::redact`], so a registered secret is
//! printed as `***` no matter which message carries it. Under GitHub Actions
//! the masks are also announced to the runner with `::add-mask::`, and fatal
//! errors are emitted as `::error::` workflow commands.
//!
//! The secrets live in a [`Masks`] handle that the logger shares, so log
//! records are redacted the same way.

use colored::Colorize;
use std::io::{self, Stderr, Stdout, Write};
use std::sync::{Arc, PoisonError, RwLock};

/// Replacement text for masked values.
pub const MASK: &str = "***";

/// Shared set of secrets. Clones see the same set.
#[derive(Clone, Default)]
pub struct Masks {
    values: Arc<RwLock<Vec<String>>>,
}

impl Masks {
    /// Register a secret, returning the entries that were not known yet.
    ///
    /// Multi-line secrets are also registered line by line, since the runner
    /// matches masks within a single log line. Lines without any
    /// alphanumeric character (JSON braces and the like) are left alone.
    pub fn add(&self, value: &str) -> Vec<String> {
        let mut candidates = vec![value.trim_end_matches(['\r', '\n'])];
        if value.contains('\n') {
            candidates.extend(value.lines().map(str::trim));
        }

        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = Vec::new();
        for candidate in candidates {
            if candidate.is_empty()
                || !candidate.chars().any(char::is_alphanumeric)
                || values.iter().any(|m| m == candidate)
            {
                continue;
            }
            values.push(candidate.to_string());
            added.push(candidate.to_string());
        }

        // Longest first, so a secret is never half-replaced by one of its lines.
        values.sort_by(|a, b| b.len().cmp(&a.len()));
        added
    }

    /// Replace every registered secret in `text`.
    pub fn redact(&self, text: &str) -> String {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .fold(text.to_string(), |acc, mask| acc.replace(mask.as_str(), MASK))
    }
}

/// Line-oriented stdout/stderr pair that redacts registered secrets.
pub struct Console<O: Write, E: Write> {
    out: O,
    err: E,
    masks: Masks,
    workflow_commands: bool,
}

impl Console<Stdout, Stderr> {
    /// Console over the process's stdout and stderr.
    ///
    /// Workflow commands are enabled when `GITHUB_ACTIONS=true`.
    pub fn stdio() -> Self {
        let in_actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        Self::new(io::stdout(), io::stderr()).with_workflow_commands(in_actions)
    }
}

impl<O: Write, E: Write> Console<O, E> {
    /// Console over arbitrary writers, with workflow commands off.
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            masks: Masks::default(),
            workflow_commands: false,
        }
    }

    /// Enable or disable GitHub Actions workflow commands.
    pub fn with_workflow_commands(mut self, enabled: bool) -> Self {
        self.workflow_commands = enabled;
        self
    }

    /// Handle on this console's secrets, for the logger.
    pub fn masks(&self) -> Masks {
        self.masks.clone()
    }

    /// Register a secret. Empty values are ignored.
    pub fn add_mask(&mut self, value: &str) -> io::Result<()> {
        let added = self.masks.add(value);
        if self.workflow_commands {
            for mask in added.iter().filter(|m| !m.contains('\n')) {
                writeln!(self.out, "::add-mask::{}", escape_data(mask))?;
            }
        }
        Ok(())
    }

    /// Replace every registered secret in `text`.
    pub fn redact(&self, text: &str) -> String {
        self.masks.redact(text)
    }

    /// Print text to stdout without a trailing newline.
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        let text = self.redact(text);
        write!(self.out, "{}", text)?;
        self.out.flush()
    }

    /// Print a line to stdout.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        let text = self.redact(text);
        writeln!(self.out, "{}", text)
    }

    /// Print a diagnostic line to stderr.
    pub fn error(&mut self, text: &str) -> io::Result<()> {
        let text = self.redact(text);
        writeln!(self.err, "{}", text)
    }

    /// Report a fatal condition. The caller is expected to exit afterwards.
    pub fn fatal(&mut self, message: &str) -> io::Result<()> {
        let message = self.redact(message);
        if self.workflow_commands {
            writeln!(self.out, "::error::{}", escape_data(&message))?;
            self.out.flush()
        } else {
            self.out.flush()?;
            writeln!(self.err, "{} {}", "✗".red(), message)
        }
    }

    /// Consume the console, returning its writers.
    #[cfg(test)]
    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

/// Escape a workflow command's data segment.
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers() -> Console<Vec<u8>, Vec<u8>> {
        Console::new(Vec::new(), Vec::new())
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_line_and_print() {
        let mut console = buffers();
        console.print("[drive-1]  ").unwrap();
        console.line("Copying:").unwrap();
        console.error("File error a  [1 / 2]").unwrap();

        let (out, err) = console.into_parts();
        assert_eq!(text(out), "[drive-1]  Copying:\n");
        assert_eq!(text(err), "File error a  [1 / 2]\n");
    }

    #[test]
    fn test_masks_are_redacted() {
        let mut console = buffers();
        console.add_mask("s3cr3t").unwrap();
        console.line("token=s3cr3t;").unwrap();
        console.error("s3cr3t s3cr3t").unwrap();

        let (out, err) = console.into_parts();
        assert_eq!(text(out), "token=***;\n");
        assert_eq!(text(err), "*** ***\n");
    }

    #[test]
    fn test_empty_mask_ignored() {
        let mut console = buffers();
        console.add_mask("").unwrap();
        console.add_mask("\n").unwrap();
        console.line("nothing hidden").unwrap();
        let (out, _) = console.into_parts();
        assert_eq!(text(out), "nothing hidden\n");
    }

    #[test]
    fn test_multiline_mask_registers_lines() {
        let mut console = buffers();
        console
            .add_mask("{\n  \"private_key\": \"abc123\"\n}\n")
            .unwrap();
        console.line("leaked \"private_key\": \"abc123\" here").unwrap();
        console.line("{ braces stay }").unwrap();

        let (out, _) = console.into_parts();
        let out = text(out);
        assert!(!out.contains("abc123"));
        assert!(out.contains("{ braces stay }"));
    }

    #[test]
    fn test_workflow_add_mask_command() {
        let mut console = buffers().with_workflow_commands(true);
        console.add_mask("100%secret").unwrap();
        let (out, _) = console.into_parts();
        assert_eq!(text(out), "::add-mask::100%25secret\n");
    }

    #[test]
    fn test_fatal_without_workflow_goes_to_stderr() {
        let mut console = buffers();
        console.add_mask("hunter2").unwrap();
        console.fatal("bad hunter2").unwrap();

        let (out, err) = console.into_parts();
        assert!(text(out).is_empty());
        let err = text(err);
        assert!(err.contains("bad ***"));
        assert!(!err.contains("hunter2"));
    }

    #[test]
    fn test_fatal_with_workflow_emits_error_command() {
        let mut console = buffers().with_workflow_commands(true);
        console.fatal("line one\nline two").unwrap();
        let (out, err) = console.into_parts();
        assert_eq!(text(out), "::error::line one%0Aline two\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_masks_handle_is_shared() {
        let mut console = buffers();
        let masks = console.masks();
        console.add_mask("s3cr3t").unwrap();
        assert_eq!(masks.redact("id s3cr3t"), "id ***");

        masks.add("other");
        console.line("other s3cr3t").unwrap();
        let (out, _) = console.into_parts();
        assert_eq!(text(out), "*** ***\n");
    }

    #[test]
    fn test_add_reports_only_new_entries() {
        let masks = Masks::default();
        assert_eq!(masks.add("a1\nb2"), vec!["a1\nb2", "a1", "b2"]);
        assert_eq!(masks.add("b2"), Vec::<String>::new());
        assert!(masks.add("{}").is_empty());
    }

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("a%b\r\nc"), "a%25b%0D%0Ac");
    }
}
