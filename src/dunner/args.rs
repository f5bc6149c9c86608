//! Positional argument substitution.
//!
//! Command tokens may reference caller-supplied arguments as `$1`, `$2`,
//! and so on. The whole step is validated upfront, before any command
//! executes, so a step never runs partially when a later command
//! references a missing argument.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DunnerError, Result};

static ARG_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[1-9][0-9]*").expect("Invalid regex pattern"));

/// Replace `$N` tokens in every command with `args[N-1]`, in place.
/// Fails with [`DunnerError::InsufficientArgs`] when any referenced index
/// exceeds the supplied argument count; in that case no command is
/// modified.
pub fn pass_args(commands: &mut [Vec<String>], args: &[String]) -> Result<()> {
    for command in commands.iter() {
        for token in command {
            for token_match in ARG_TOKEN.find_iter(token) {
                let index: usize = token_match.as_str()[1..]
                    .parse()
                    .expect("argument token is numeric");
                if index > args.len() {
                    return Err(DunnerError::InsufficientArgs);
                }
            }
        }
    }

    for command in commands.iter_mut() {
        for token in command.iter_mut() {
            if ARG_TOKEN.is_match(token) {
                *token = ARG_TOKEN
                    .replace_all(token, |caps: &regex::Captures| {
                        let index: usize = caps[0][1..]
                            .parse()
                            .expect("argument token is numeric");
                        args[index - 1].clone()
                    })
                    .into_owned();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitutes_positional_arguments() {
        let mut commands = vec![command(&["cp", "$1", "$2"])];
        let args = vec!["/src".to_string(), "/dst".to_string()];

        pass_args(&mut commands, &args).unwrap();
        assert_eq!(commands, vec![command(&["cp", "/src", "/dst"])]);
    }

    #[test]
    fn insufficient_arguments_fail() {
        let mut commands = vec![command(&["cp", "$1", "$2"])];
        let args = vec!["/src".to_string()];

        let err = pass_args(&mut commands, &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dunner: insufficient number of arguments passed"
        );
    }

    #[test]
    fn no_command_is_modified_when_a_later_one_fails() {
        let mut commands = vec![command(&["echo", "$1"]), command(&["echo", "$2"])];
        let args = vec!["one".to_string()];

        assert!(pass_args(&mut commands, &args).is_err());
        assert_eq!(commands[0], command(&["echo", "$1"]));
    }

    #[test]
    fn tokens_without_placeholders_pass_through() {
        let mut commands = vec![command(&["echo", "$HOME", "literal"])];
        pass_args(&mut commands, &[]).unwrap();
        assert_eq!(commands, vec![command(&["echo", "$HOME", "literal"])]);
    }

    #[test]
    fn repeated_and_multidigit_indices() {
        let mut commands = vec![command(&["sh", "-c", "$1 $1 $10"])];
        let args: Vec<String> = (1..=10).map(|i| format!("a{i}")).collect();

        pass_args(&mut commands, &args).unwrap();
        assert_eq!(commands[0][2], "a1 a1 a10");
    }

    #[test]
    fn zero_is_not_a_valid_placeholder() {
        let mut commands = vec![command(&["echo", "$0"])];
        pass_args(&mut commands, &[]).unwrap();
        assert_eq!(commands[0][1], "$0");
    }
}
