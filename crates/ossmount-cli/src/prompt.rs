#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use atty::Stream;
use color_eyre::Result;

/// Asks the operator for values that were not passed as flags.
pub struct Prompter {
    source: Source,
}

enum Source {
    Disabled,
    Terminal,
    #[cfg(test)]
    Scripted(RefCell<VecDeque<String>>),
}

impl Prompter {
    /// Interactive only when a person is at the terminal and output is not
    /// meant for a machine.
    pub fn detect(json: bool) -> Self {
        let interactive = !json && atty::is(Stream::Stdin) && atty::is(Stream::Stderr);
        Self {
            source: if interactive {
                Source::Terminal
            } else {
                Source::Disabled
            },
        }
    }

    /// Answers prompts from `answers` in order, then behaves like EOF.
    #[cfg(test)]
    pub fn scripted(answers: &[&str]) -> Self {
        Self {
            source: Source::Scripted(RefCell::new(
                answers.iter().map(ToString::to_string).collect(),
            )),
        }
    }

    pub fn is_interactive(&self) -> bool {
        !matches!(self.source, Source::Disabled)
    }

    /// Prompts for one line. Returns `None` when not interactive or on EOF.
    pub fn ask(&self, label: &str) -> Result<Option<String>> {
        match &self.source {
            Source::Disabled => Ok(None),
            Source::Terminal => {
                eprint!("{label}: ");
                io::stderr().flush()?;
                let mut answer = String::new();
                if io::stdin().lock().read_line(&mut answer)? == 0 {
                    return Ok(None);
                }
                Ok(Some(answer.trim().to_string()))
            }
            #[cfg(test)]
            Source::Scripted(answers) => Ok(answers.borrow_mut().pop_front()),
        }
    }

    /// Prompts until the answer parses as a positive number.
    pub fn ask_index(&self, label: &str) -> Result<Option<usize>> {
        while let Some(answer) = self.ask(label)? {
            match answer.parse::<usize>() {
                Ok(index) => return Ok(Some(index)),
                Err(_) => self.note(&format!("'{answer}' is not a number")),
            }
        }
        Ok(None)
    }

    /// A yes/no question defaulting to no.
    pub fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} [y/N]"))?;
        Ok(answer.is_some_and(|text| matches!(text.to_ascii_lowercase().as_str(), "y" | "yes")))
    }

    pub fn note(&self, text: &str) {
        if matches!(self.source, Source::Terminal) {
            eprintln!("{text}");
        }
    }

    /// Fills `slot` from a prompt when it is empty.
    pub fn fill(&self, slot: &mut Option<String>, label: &str) -> Result<()> {
        if slot.as_deref().map_or(true, |value| value.trim().is_empty()) {
            if let Some(answer) = self.ask(label)? {
                *slot = Some(answer);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_run_out_like_eof() {
        let prompter = Prompter::scripted(&["x", "7", "Y"]);
        assert!(prompter.is_interactive());
        assert_eq!(prompter.ask_index("index").expect("index"), Some(7));
        assert!(prompter.confirm("again?").expect("confirm"));
        assert_eq!(prompter.ask("more").expect("ask"), None);
        assert!(!prompter.confirm("again?").expect("confirm"));
    }

    #[test]
    fn fill_keeps_values_from_flags() {
        let prompter = Prompter::scripted(&["prompted"]);
        let mut given = Some("flag".to_string());
        prompter.fill(&mut given, "bucket").expect("fill");
        assert_eq!(given.as_deref(), Some("flag"));
        let mut missing = None;
        prompter.fill(&mut missing, "bucket").expect("fill");
        assert_eq!(missing.as_deref(), Some("prompted"));
    }
}
