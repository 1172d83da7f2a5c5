use crate::error::{CwError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Dot,
    Dash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Symbols(Vec<Symbol>),
    WordGap,
}

fn pattern(c: char) -> Option<&'static str> {
    let pattern = match c.to_ascii_lowercase() {
        'a' => ".-",
        'b' => "-...",
        'c' => "-.-.",
        'd' => "-..",
        'e' => ".",
        'f' => "..-.",
        'g' => "--.",
        'h' => "....",
        'i' => "..",
        'j' => ".---",
        'k' => "-.-",
        'l' => ".-..",
        'm' => "--",
        'n' => "-.",
        'o' => "---",
        'p' => ".--.",
        'q' => "--.-",
        'r' => ".-.",
        's' => "...",
        't' => "-",
        'u' => "..-",
        'v' => "...-",
        'w' => ".--",
        'x' => "-..-",
        'y' => "-.--",
        'z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '.' => ".-.-.-",
        ',' => "--..--",
        '?' => "..--..",
        '/' => "-..-.",
        '=' => "-...-",
        '-' => "-....-",
        '(' => "-.--.",
        ')' => "-.--.-",
        '\'' => ".----.",
        ':' => "---...",
        '+' => ".-.-.",
        '"' => ".-..-.",
        '@' => ".--.-.",
        // Not in the ITU recommendation but in common amateur use.
        '!' => "-.-.--",
        '&' => ".-...",
        ';' => "-.-.-.",
        '_' => "..--.-",
        '$' => "...-..-",
        _ => return None,
    };
    Some(pattern)
}

pub fn lookup(c: char) -> Result<Vec<Symbol>> {
    let pattern = pattern(c).ok_or(CwError::NotFound(c))?;
    Ok(pattern
        .chars()
        .map(|p| if p == '.' { Symbol::Dot } else { Symbol::Dash })
        .collect())
}

/// Like [`lookup`], but whitespace and unmapped characters become a word gap
/// so arbitrary text degrades to pauses.
pub fn encode(c: char) -> Code {
    if c.is_whitespace() {
        return Code::WordGap;
    }
    match lookup(c) {
        Ok(symbols) => Code::Symbols(symbols),
        Err(e) => {
            log::debug!("{}, sending a word gap", e);
            Code::WordGap
        }
    }
}
