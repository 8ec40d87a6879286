use rustyline::completion::Completer;
use rustyline::completion::Pair;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::Result;

use crate::cli::commands::all_commands_info;

pub struct CliHelper {}

// The accompanying helper for RemoteCatalogCli.
// For now only completes command names.
impl CliHelper {
    fn command_candidates(&self, prefix: &str) -> Vec<Pair> {
        all_commands_info()
            .into_iter()
            .filter_map(|(usage, _)| usage.split_whitespace().next())
            .filter(|command| command.starts_with(prefix))
            .map(|command| Pair {
                display: command.to_string(),
                replacement: command.to_string(),
            })
            .collect()
    }
}

impl Highlighter for CliHelper {}

impl Hinter for CliHelper {
    type Hint = String;
}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        if !prefix.starts_with('\\') || prefix.contains(char::is_whitespace) {
            return Ok((pos, vec![]));
        }
        Ok((0, self.command_candidates(prefix)))
    }
}

impl Validator for CliHelper {}

impl Helper for CliHelper {}
