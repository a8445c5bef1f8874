//! Turns step text into the expression and name of the function that would
//! match it.
//!
//! Quoted strings become `"([^"]*)"`, digit runs become `(\d+)`, and
//! everything else is matched literally. The function name keeps only the
//! literal words of the step.

use super::{NUMBER_ARGUMENT, STEP_ARGUMENT, STRING_ARGUMENT};

const NUMBER_GROUP: &str = r"(\d+)";
const STRING_GROUP: &str = r#""([^"]*)""#;

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Number,
    Quoted,
}

const fn is_word(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_'
}

fn is_boundary(chars: &[char], index: Option<usize>) -> bool {
    index
        .and_then(|position| chars.get(position))
        .is_none_or(|character| !is_word(*character))
}

/// Finds the quote closing the one at `open`, provided the quoted string is
/// delimited by non-word characters on both sides.
fn closing_quote(chars: &[char], open: usize) -> Option<usize> {
    if !is_boundary(chars, open.checked_sub(1)) {
        return None;
    }
    let close = chars
        .iter()
        .enumerate()
        .skip(open + 1)
        .find_map(|(position, character)| (*character == '"').then_some(position))?;
    is_boundary(chars, Some(close + 1)).then_some(close)
}

fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut index = 0;

    while let Some(&current) = chars.get(index) {
        let special = if current.is_ascii_digit() {
            let run = chars
                .iter()
                .skip(index)
                .take_while(|character| character.is_ascii_digit())
                .count();
            Some((Token::Number, index + run))
        } else if current == '"' {
            closing_quote(&chars, index).map(|close| (Token::Quoted, close + 1))
        } else {
            None
        };

        if let Some((token, next)) = special {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(token);
            index = next;
        } else {
            literal.push(current);
            index += 1;
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Returns `(name, expression)` for `text`.
///
/// The name is empty when the step has no literal words; callers number
/// such steps themselves.
#[must_use]
pub fn translate_step(text: &str) -> (String, String) {
    let tokens = tokenize(text);

    let body: String = tokens
        .iter()
        .map(|token| match token {
            Token::Literal(literal) => regex::escape(literal),
            Token::Number => NUMBER_GROUP.to_owned(),
            Token::Quoted => STRING_GROUP.to_owned(),
        })
        .collect();
    let expression = format!("^{}$", body.trim());

    let words: String = tokens
        .iter()
        .map(|token| match token {
            Token::Literal(literal) => literal
                .chars()
                .filter(|character| {
                    character.is_ascii_alphabetic() || matches!(*character, '_' | ' ')
                })
                .collect(),
            Token::Number | Token::Quoted => " ".to_owned(),
        })
        .collect();
    let name = words
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");

    (name, expression)
}

/// Infers argument types from the capture groups in `expression`, adding the
/// step itself when it carries a table or doc string.
#[must_use]
pub fn step_arguments(expression: &str, has_step_argument: bool) -> Vec<String> {
    let mut groups: Vec<(usize, &str)> = expression
        .match_indices(NUMBER_GROUP)
        .map(|(position, _)| (position, NUMBER_ARGUMENT))
        .chain(
            expression
                .match_indices(STRING_GROUP)
                .map(|(position, _)| (position, STRING_ARGUMENT)),
        )
        .collect();
    groups.sort_by_key(|(position, _)| *position);

    let mut arguments: Vec<String> = groups
        .into_iter()
        .map(|(_, argument)| argument.to_owned())
        .collect();
    if has_step_argument {
        arguments.push(STEP_ARGUMENT.to_owned());
    }
    arguments
}
