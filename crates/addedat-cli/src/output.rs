use clap::ValueEnum;
use comfy_table::{presets, modifiers, Table};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Success,
    Info,
    Warning,
    Error,
    /// The command's own result lines, such as a dry-run plan
    Result,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Success => "success",
            Kind::Info => "info",
            Kind::Warning => "warning",
            Kind::Error => "error",
            Kind::Result => "result",
        }
    }
}

/// Human or JSON rendering of everything the commands print.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Success, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Warning, msg.as_ref());
    }

    /// Shown even in quiet mode.
    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Error, msg.as_ref());
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Info, msg.as_ref());
    }

    /// A line that is the command's result. Printed even with `--quiet`.
    pub fn result(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Result, msg.as_ref());
    }

    fn suppressed(&self, kind: Kind) -> bool {
        self.quiet && !matches!(kind, Kind::Error | Kind::Result)
    }

    fn emit(&self, kind: Kind, msg: &str) {
        if self.suppressed(kind) {
            return;
        }
        match self.format {
            OutputFormat::Human => match kind {
                Kind::Success => println!("{} {}", "✓".green(), msg),
                Kind::Info | Kind::Result => println!("{}", msg),
                Kind::Warning => println!("{} {}", "⚠".yellow(), msg),
                Kind::Error => eprintln!("{} {}", "✗".red(), msg),
            },
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": kind.as_str(), "message": msg }));
            }
        }
    }

    /// Structured result of a command; ignored in human mode.
    pub fn json(&self, data: &serde_json::Value) {
        if self.is_human() || self.quiet {
            return;
        }
        self.print_json(data);
    }

    pub fn table(&self, table: &Table) {
        if self.quiet || !self.is_human() {
            return;
        }
        println!("{}", table);
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(data).unwrap_or_default()),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            OutputFormat::Human => println!("{}", data),
        }
    }
}

/// A table in the house style.
pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(header);
    table
}

/// Show only the ends of a secret.
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
