// pakt-core/src/prompt/options.rs

//! The option set offered by a prompt and the matching of replies against it.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, warn};

use super::yesno::YesNoLocale;

/// An ordered list of answers a prompt accepts.
///
/// The index of an option is its identity: callers map the index returned by
/// the prompter back to a meaning (e.g. 0 = "yes").
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    options: Vec<String>,
    default: usize,
    help: BTreeMap<usize, String>,
    disabled: BTreeSet<usize>,
    /// Number of enabled options rendered before eliding the rest; `None` shows all.
    shown_count: Option<usize>,
}

impl PromptOptions {
    /// Creates an option set. An out-of-range `default` is logged and replaced by 0.
    pub fn new<I, S>(options: I, default: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        let default = if default >= options.len() {
            error!(
                default,
                count = options.len(),
                "Invalid default option index, using 0."
            );
            0
        } else {
            default
        };
        Self {
            options,
            default,
            ..Default::default()
        }
    }

    /// Creates an option set from a `/`-delimited string such as `"y/n/p"`.
    pub fn parse(option_str: &str, default: usize) -> Self {
        Self::new(option_str.split('/').filter(|s| !s.is_empty()), default)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn default_index(&self) -> usize {
        self.default
    }

    /// Label of the default option; empty for an empty set.
    pub fn default_label(&self) -> &str {
        self.options.get(self.default).map(String::as_str).unwrap_or("")
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    pub fn set_shown_count(&mut self, count: Option<usize>) {
        self.shown_count = count;
    }

    /// Attaches help text to an option. Empty text is ignored; an unknown
    /// index is logged and ignored.
    pub fn set_option_help(&mut self, index: usize, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if index >= self.options.len() {
            warn!(index, text = %text, "Attempt to set option help for non-existing option.");
            return;
        }
        self.help.insert(index, text);
    }

    pub fn option_help(&self, index: usize) -> Option<&str> {
        self.help.get(&index).map(String::as_str)
    }

    pub fn has_help(&self) -> bool {
        !self.help.is_empty()
    }

    /// Hides an option from rendering and matching. The default option
    /// cannot be disabled.
    pub fn disable(&mut self, index: usize) {
        if index == self.default {
            warn!(index, "Refusing to disable the default option.");
            return;
        }
        if index < self.options.len() {
            self.disabled.insert(index);
        }
    }

    pub fn enable(&mut self, index: usize) {
        self.disabled.remove(&index);
    }

    pub fn is_disabled(&self, index: usize) -> bool {
        self.disabled.contains(&index)
    }

    /// Enabled options in display order, with their indices.
    pub fn enabled(&self) -> impl Iterator<Item = (usize, &str)> {
        self.options
            .iter()
            .enumerate()
            .filter(move |(idx, _)| !self.is_disabled(*idx))
            .map(|(idx, opt)| (idx, opt.as_str()))
    }

    /// True for exactly the two options "yes" and "no" of `locale`, in that order.
    pub fn is_yes_no_prompt(&self, locale: &YesNoLocale) -> bool {
        self.options.len() == 2 && self.options[0] == locale.yes && self.options[1] == locale.no
    }

    /// The `[a/b/...?] (a)` part of a prompt line, uncolored.
    pub fn summary(&self) -> String {
        self.render_summary(|s| s.to_string())
    }

    /// Renders the option summary, passing every option label (and the `?`
    /// marker) through `paint`.
    pub fn render_summary<F>(&self, paint: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let show_max = self.shown_count.unwrap_or(self.options.len());
        let mut hidden = false;
        let mut shown = Vec::new();
        for (_, opt) in self.enabled() {
            if shown.len() < show_max {
                shown.push(paint(opt));
            } else {
                hidden = true;
                break;
            }
        }

        let mut out = String::from("[");
        out.push_str(&shown.join("/"));
        if hidden || self.has_help() {
            if !shown.is_empty() {
                out.push('/');
            }
            if hidden {
                out.push_str("...");
            }
            out.push_str(&paint("?"));
        }
        out.push(']');

        if !self.options.is_empty() {
            out.push_str(&format!(" ({})", paint(self.default_label())));
        }
        out
    }

    /// Indices of the enabled options `reply` selects.
    ///
    /// `#N` picks the N-th enabled option (1-based). Any other reply is
    /// compared case-insensitively: an exact match wins outright, otherwise
    /// every option the reply is a prefix of is returned. More than one
    /// index means the reply is ambiguous.
    pub fn reply_matches(&self, reply: &str) -> Vec<usize> {
        if let Some(ordinal) = reply.strip_prefix('#').filter(|rest| !rest.is_empty()) {
            // A malformed ordinal is eaten, it never falls back to text matching.
            return match ordinal.parse::<usize>() {
                Ok(n) if n > 0 && ordinal.bytes().all(|b| b.is_ascii_digit()) => self
                    .enabled()
                    .nth(n - 1)
                    .map(|(idx, _)| vec![idx])
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
        }

        let lreply = reply.to_lowercase();
        let mut matches = Vec::new();
        for (idx, opt) in self.enabled() {
            let lopt = opt.to_lowercase();
            if lopt == lreply {
                // prefer an exact match ("1/11")
                return vec![idx];
            }
            if lopt.starts_with(&lreply) {
                matches.push(idx);
            }
        }
        matches
    }

    /// `(a,b)` listing of the given option indices.
    pub fn reply_matches_str(&self, matches: &[usize]) -> String {
        let labels: Vec<&str> = matches
            .iter()
            .filter_map(|idx| self.label(*idx))
            .collect();
        format!("({})", labels.join(","))
    }
}
