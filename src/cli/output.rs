//! Terminal output for the memchat CLI and the terminal chat.
//!
//! Every line is rendered to a `String` first, colored or plain, and then
//! printed. Rendering is what the tests look at.

use owo_colors::OwoColorize;
use std::fmt::Display;
use std::io::{self, Write};

const COLUMN_WIDTH: usize = 15;

const BANNER: [&str; 5] = [
    r"                               _           _   ",
    r" _ __ ___   ___ _ __ ___   ___| |__   __ _| |_ ",
    r"| '_ ` _ \ / _ \ '_ ` _ \ / __| '_ \ / _` | __|",
    r"| | | | | |  __/ | | | | | (__| | | | (_| | |_ ",
    r"|_| |_| |_|\___|_| |_| |_|\___|_| |_|\__,_|\__|",
];

/// Status badge shown in front of one-line messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Badge {
    Ok,
    Info,
    Warn,
    Error,
    Created,
    Skipped,
}

impl Badge {
    fn plain(self) -> &'static str {
        match self {
            Badge::Ok => "[OK]",
            Badge::Info => "[INFO]",
            Badge::Warn => "[WARN]",
            Badge::Error => "[ERROR]",
            Badge::Created => "[CREATED]",
            Badge::Skipped => "[SKIPPED]",
        }
    }

    fn colored(self) -> String {
        match self {
            Badge::Ok | Badge::Created => "✓".green().bold().to_string(),
            Badge::Info => "•".blue().to_string(),
            Badge::Warn => "⚠".yellow().bold().to_string(),
            Badge::Error => "✗".red().bold().to_string(),
            Badge::Skipped => "○".yellow().to_string(),
        }
    }
}

/// Terminal writer. Colors can be switched off for pipes and `--no-color`.
pub struct Output {
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    fn badge(&self, badge: Badge) -> String {
        if self.colored {
            badge.colored()
        } else {
            badge.plain().to_string()
        }
    }

    /// Apply `style` only when colors are on.
    fn paint<S: Display>(&self, text: &str, style: impl FnOnce(&str) -> S) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn status_line(&self, badge: Badge, message: &str) -> String {
        let message = match badge {
            Badge::Ok => self.paint(message, |m| m.green().to_string()),
            Badge::Warn => self.paint(message, |m| m.yellow().to_string()),
            Badge::Error => self.paint(message, |m| m.red().to_string()),
            _ => message.to_string(),
        };
        format!("  {} {}", self.badge(badge), message)
    }

    fn columns(values: &[&str]) -> String {
        values
            .iter()
            .map(|v| format!("{:<width$}", v, width = COLUMN_WIDTH))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn banner(&self) {
        println!();
        for (i, line) in BANNER.iter().enumerate() {
            let line = if i < 3 {
                self.paint(line, |l| l.bright_magenta().bold().to_string())
            } else {
                self.paint(line, |l| l.magenta().bold().to_string())
            };
            println!("   {}", line);
        }
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "\n   {} {}\n",
            self.paint("Memory-augmented chat", |t| t.bright_white().bold().to_string()),
            self.paint(&version, |t| t.dimmed().to_string())
        );
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.status_line(Badge::Ok, message));
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.status_line(Badge::Info, message));
    }

    pub fn warning(&self, message: &str) {
        println!("{}", self.status_line(Badge::Warn, message));
    }

    /// Errors go to stderr.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.status_line(Badge::Error, message));
    }

    /// `init` wrote a file.
    pub fn created(&self, file_type: &str, path: &str) {
        println!("{}", self.created_line(file_type, path));
    }

    fn created_line(&self, file_type: &str, path: &str) -> String {
        format!(
            "  {} {} {}",
            self.badge(Badge::Created),
            self.paint(file_type, |t| t.dimmed().to_string()),
            self.paint(path, |p| p.bright_white().to_string())
        )
    }

    pub fn created_dir(&self, path: &str) {
        self.created("directory", path);
    }

    /// `init` left an existing file alone.
    pub fn skipped(&self, path: &str, reason: &str) {
        println!(
            "  {} {} {}",
            self.badge(Badge::Skipped),
            self.paint(path, |p| p.dimmed().to_string()),
            self.paint(&format!("({})", reason), |r| r.yellow().to_string())
        );
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        println!("{}", self.kv_line(key, value));
    }

    fn kv_line(&self, key: &str, value: &str) -> String {
        format!(
            "    {}: {}",
            self.paint(key, |k| k.dimmed().to_string()),
            self.paint(value, |v| v.bright_white().to_string())
        )
    }

    pub fn list_item(&self, item: &str) {
        let bullet = if self.colored {
            "•".blue().to_string()
        } else {
            "-".to_string()
        };
        println!("    {} {}", bullet, item);
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// A shell command the user may want to run next.
    pub fn command(&self, cmd: &str) {
        let cmd = format!("$ {}", cmd);
        println!("     {}", self.paint(&cmd, |c| c.bright_cyan().to_string()));
    }

    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    pub fn table_header(&self, columns: &[&str]) {
        let header = Self::columns(columns);
        let rule_width = columns.len() * (COLUMN_WIDTH + 1);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(rule_width).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(rule_width));
        }
    }

    pub fn table_row(&self, values: &[&str]) {
        println!("    {}", Self::columns(values));
    }

    /// Input prompt of the terminal chat. Stays on the same line.
    pub fn prompt(&self, user: &str) {
        let label = format!("{} >", user);
        print!("{} ", self.paint(&label, |l| l.bright_green().bold().to_string()));
        io::stdout().flush().ok();
    }

    /// Name printed before an assistant reply.
    pub fn assistant_label(&self, name: &str) {
        let label = format!("{}:", name);
        print!("{} ", self.paint(&label, |l| l.bright_cyan().bold().to_string()));
        io::stdout().flush().ok();
    }

    /// One streamed piece of a reply, no line break.
    pub fn delta(&self, text: &str) {
        print!("{}", text);
        io::stdout().flush().ok();
    }

    /// Side note after a turn (memory status, warnings).
    pub fn note(&self, message: &str) {
        if self.colored {
            println!("  {}", message.dimmed());
        } else {
            println!("  ({})", message);
        }
    }

    pub fn newline(&self) {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_colored() {
        assert!(Output::default().colored);
        assert!(!Output::no_color().colored);
    }

    #[test]
    fn test_plain_status_lines_use_tags() {
        let output = Output::no_color();
        assert_eq!(output.status_line(Badge::Ok, "saved"), "  [OK] saved");
        assert_eq!(
            output.status_line(Badge::Warn, "no API key"),
            "  [WARN] no API key"
        );
        assert_eq!(
            output.created_line("config", "memchat.toml"),
            "  [CREATED] config memchat.toml"
        );
        assert_eq!(output.kv_line("Gate", "keyword"), "    Gate: keyword");
    }

    #[test]
    fn test_colored_lines_keep_the_text() {
        let output = Output::new();
        let line = output.status_line(Badge::Error, "Mem0 unreachable");
        assert!(line.contains("Mem0 unreachable"));
        assert!(line.contains('\u{1b}'));
    }

    #[test]
    fn test_columns_are_padded() {
        assert_eq!(Output::columns(&["Key", "Name"]), format!("{:<15} {:<15}", "Key", "Name"));
        assert_eq!(Output::columns(&[]), "");
        // Long values are not truncated
        let long = "a-very-long-persona-key";
        assert!(Output::columns(&[long]).starts_with(long));
    }

    #[test]
    fn test_printing_does_not_panic() {
        for output in [Output::new(), Output::no_color()] {
            output.banner();
            output.info("info");
            output.created_dir("data");
            output.skipped(".env", "exists");
            output.table_header(&["Key", "Name"]);
            output.table_row(&["chef", "Chef"]);
            output.hint("hint");
            output.command("memchat-server chat");
            output.note("memory: not saved");
        }
    }
}
