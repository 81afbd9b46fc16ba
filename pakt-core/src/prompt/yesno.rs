// pakt-core/src/prompt/yesno.rs

//! Locale-aware interpretation of yes/no replies.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENGLISH: YesNoLocale = YesNoLocale {
        yes: "yes".to_string(),
        no: "no".to_string(),
        yes_expr: Regex::new("^[yY]").expect("static yes expression"),
        no_expr: Regex::new("^[nN]").expect("static no expression"),
    };
}

/// The words and reply patterns that mean "yes" and "no".
#[derive(Debug, Clone)]
pub struct YesNoLocale {
    pub yes: String,
    pub no: String,
    yes_expr: Regex,
    no_expr: Regex,
}

impl YesNoLocale {
    pub fn new(
        yes: impl Into<String>,
        no: impl Into<String>,
        yes_expr: &str,
        no_expr: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            yes: yes.into(),
            no: no.into(),
            yes_expr: Regex::new(yes_expr)?,
            no_expr: Regex::new(no_expr)?,
        })
    }

    /// `Some(true)` for an affirmative reply, `Some(false)` for a negative
    /// one, `None` if the reply is neither.
    pub fn rpmatch(&self, reply: &str) -> Option<bool> {
        if self.yes_expr.is_match(reply) {
            Some(true)
        } else if self.no_expr.is_match(reply) {
            Some(false)
        } else {
            None
        }
    }

    /// Short tokens shown in the "Enter 'y' for 'yes'" hint.
    pub fn short_tokens(&self) -> (String, String) {
        let first = |s: &str| s.chars().next().map(String::from).unwrap_or_default();
        (first(&self.yes), first(&self.no))
    }
}

impl Default for YesNoLocale {
    fn default() -> Self {
        ENGLISH.clone()
    }
}
