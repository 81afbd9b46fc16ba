// pakt-core/src/output.rs

//! User-facing output: human-readable colored text or machine-readable XML.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use colored::*;
use tracing::debug;

use crate::prompt::{PromptId, PromptOptions};

const CLEAR_LINE: &str = "\r\x1b[2K";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Normal,
    /// One XML element per message, for tools parsing the output.
    Machine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    High,
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Cloneable handle to the output stream. Clones share the same writer.
#[derive(Clone)]
pub struct Out {
    mode: OutputMode,
    verbosity: Verbosity,
    color: bool,
    sink: Sink,
}

impl fmt::Debug for Out {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Out")
            .field("mode", &self.mode)
            .field("verbosity", &self.verbosity)
            .field("color", &self.color)
            .finish()
    }
}

impl Out {
    pub fn new(
        mode: OutputMode,
        verbosity: Verbosity,
        color: bool,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            mode,
            verbosity,
            color: color && mode == OutputMode::Normal,
            sink: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn stdout(mode: OutputMode, verbosity: Verbosity, color: bool) -> Self {
        Self::new(mode, verbosity, color, Box::new(io::stdout()))
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn is_machine(&self) -> bool {
        self.mode == OutputMode::Machine
    }

    fn emit(&self, text: &str) {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = sink.write_all(text.as_bytes()).and_then(|_| sink.flush()) {
            debug!(error = %e, "Failed to write output.");
        }
    }

    fn paint_option(&self, label: &str) -> String {
        if self.color {
            label.bold().to_string()
        } else {
            label.to_string()
        }
    }

    fn message(&self, kind: &str, text: &str) {
        self.emit(&format!(
            "<message type=\"{}\">{}</message>\n",
            kind,
            xml_escape(text)
        ));
    }

    pub fn info(&self, msg: &str) {
        self.info_at(msg, Verbosity::Normal);
    }

    /// Prints `msg` if the configured verbosity is at least `level`.
    pub fn info_at(&self, msg: &str, level: Verbosity) {
        if self.verbosity < level {
            return;
        }
        match self.mode {
            OutputMode::Normal => self.emit(&format!("{}\n", msg)),
            OutputMode::Machine => self.message("info", msg),
        }
    }

    pub fn warning(&self, msg: &str) {
        match self.mode {
            OutputMode::Normal => {
                let label = if self.color {
                    "Warning:".yellow().bold().to_string()
                } else {
                    "Warning:".to_string()
                };
                self.emit(&format!("{} {}\n", label, msg));
            }
            OutputMode::Machine => self.message("warning", msg),
        }
    }

    /// An error message block with an optional hint on how to fix it.
    pub fn error(&self, msg: &str, hint: Option<&str>) {
        match self.mode {
            OutputMode::Normal => {
                let mut text = if self.color {
                    msg.red().bold().to_string()
                } else {
                    msg.to_string()
                };
                text.push('\n');
                if let Some(hint) = hint {
                    text.push_str(hint);
                    text.push('\n');
                }
                self.emit(&text);
            }
            OutputMode::Machine => {
                let text = match hint {
                    Some(hint) => format!("{}\n{}", msg, hint),
                    None => msg.to_string(),
                };
                self.message("error", &text);
            }
        }
    }

    /// Colors an inline diagnostic the way errors are colored.
    pub fn diagnostic(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    /// Writes `"<question> [a/b] (a): "` without a trailing newline.
    ///
    /// A question ending in a newline is not followed by a separating space.
    pub fn prompt(&self, id: PromptId, question: &str, options: &PromptOptions) {
        match self.mode {
            OutputMode::Normal => {
                let sep = if question.is_empty() || question.ends_with('\n') {
                    ""
                } else {
                    " "
                };
                let summary = options.render_summary(|s| self.paint_option(s));
                self.emit(&format!("{}{}{}: ", question, sep, summary));
            }
            OutputMode::Machine => {
                let mut xml = format!("<prompt id=\"{}\">\n", id.value());
                for (idx, opt) in options.enabled() {
                    let default = if idx == options.default_index() {
                        " default=\"1\""
                    } else {
                        ""
                    };
                    match options.option_help(idx) {
                        Some(help) => xml.push_str(&format!(
                            "<option value=\"{}\"{} desc=\"{}\"/>\n",
                            xml_escape(opt),
                            default,
                            xml_escape(help)
                        )),
                        None => xml.push_str(&format!(
                            "<option value=\"{}\"{}/>\n",
                            xml_escape(opt),
                            default
                        )),
                    }
                }
                xml.push_str(&format!("<text>{}</text>\n</prompt>\n", xml_escape(question.trim_end())));
                self.emit(&xml);
            }
        }
    }

    /// Lists every enabled option with its help text, then re-displays the options.
    pub fn prompt_help(&self, options: &PromptOptions) {
        let mut lines = Vec::new();
        for (idx, opt) in options.enabled() {
            match options.option_help(idx) {
                Some(help) => lines.push(format!("  {} - {}", self.paint_option(opt), help)),
                None => lines.push(format!("  {}", self.paint_option(opt))),
            }
        }
        if !options.has_help() {
            lines.push("No help available for these options.".to_string());
        }
        match self.mode {
            OutputMode::Normal => {
                let summary = options.render_summary(|s| self.paint_option(s));
                self.emit(&format!("\n{}\n\n{}: ", lines.join("\n"), summary));
            }
            OutputMode::Machine => self.message("info", &lines.join("\n")),
        }
    }

    /// Replaces the current terminal line with `msg`.
    pub fn status_line(&self, msg: &str) {
        match self.mode {
            OutputMode::Normal => self.emit(&format!("{}{} ", CLEAR_LINE, msg)),
            OutputMode::Machine => self.message("info", msg),
        }
    }

    /// Clears the status line and prints `msg` on it.
    pub fn finish_status_line(&self, msg: &str) {
        match self.mode {
            OutputMode::Normal => self.emit(&format!("{}{}\n", CLEAR_LINE, msg)),
            OutputMode::Machine => self.message("info", msg),
        }
    }

    pub fn newline(&self) {
        if self.mode == OutputMode::Normal {
            self.emit("\n");
        }
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::testing::capture;
    use super::*;

    #[test]
    fn test_prompt_line_format() {
        let (out, buf) = capture(OutputMode::Normal);
        let options = PromptOptions::parse("y/n", 0);
        out.prompt(PromptId::YN_INST_REMOVE_CONTINUE, "Continue?", &options);
        assert_eq!(buf.text(), "Continue? [y/n] (y): ");
    }

    #[test]
    fn test_prompt_after_newline_has_no_space() {
        let (out, buf) = capture(OutputMode::Normal);
        let options = PromptOptions::parse("y/n", 1);
        out.prompt(PromptId::NONE, "Invalid answer 'x'.\n", &options);
        assert_eq!(buf.text(), "Invalid answer 'x'.\n[y/n] (n): ");
    }

    #[test]
    fn test_machine_prompt_is_escaped_xml() {
        let (out, buf) = capture(OutputMode::Machine);
        let mut options = PromptOptions::parse("y/n", 0);
        options.set_option_help(1, "say <no>");
        out.prompt(PromptId::YN_INST_REMOVE_CONTINUE, "Install a & b?", &options);
        let text = buf.text();
        assert!(text.starts_with("<prompt id=\"1\">"));
        assert!(text.contains("<option value=\"y\" default=\"1\"/>"));
        assert!(text.contains("desc=\"say &lt;no&gt;\""));
        assert!(text.contains("<text>Install a &amp; b?</text>"));
    }

    #[test]
    fn test_quiet_suppresses_normal_info_only() {
        let buf = testing::Captured::default();
        let out = Out::new(OutputMode::Normal, Verbosity::Quiet, false, Box::new(buf.clone()));
        out.info("chatty");
        out.info_at("essential", Verbosity::Quiet);
        out.error("broken", Some("fix it"));
        assert_eq!(buf.text(), "essential\nbroken\nfix it\n");
    }

    #[test]
    fn test_prompt_help_lists_enabled_options() {
        let (out, buf) = capture(OutputMode::Normal);
        let mut options = PromptOptions::parse("a/r/i", 1);
        options.set_option_help(0, "abort");
        options.set_option_help(1, "retry");
        options.disable(2);
        out.prompt_help(&options);
        let text = buf.text();
        assert!(text.contains("  a - abort\n  r - retry"));
        assert!(!text.contains("  i"));
        assert!(text.ends_with("[a/r/?] (r): "));
    }
}
