use serde::{Deserialize, Serialize};
use std::fmt;

/// A recipe header flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// `H`: condition lines examine the headers of the message.
    Headers,
    /// `B`: condition lines examine the body of the message.
    Body,
    /// `h`: the action line gets fed the headers of the message.
    PipeHeaders,
    /// `b`: the action line gets fed the body of the message.
    PipeBody,
    /// `c`: clone the message and run the action in a subprocess.
    Copy,
    /// `A`: run if the previous recipe's conditions were met.
    And,
    /// `a`: run if the previous recipe matched and its action succeeded.
    AndSucceeded,
    /// `E`: run if the previous recipe's conditions were not met.
    Else,
    /// `e`: run if the previous recipe matched but its action failed.
    ErrorHandler,
    /// `f`: filter the message through the action pipeline.
    Filter,
    /// `i`: ignore write errors on the pipeline.
    IgnoreErrors,
    /// `r`: raw mode, no fixing of the message when writing it out.
    Raw,
    /// `w`: wait for the action program to finish.
    Wait,
    /// `W`: like `w`, and suppress program failure messages.
    WaitQuiet,
    /// `D`: distinguish case when matching.
    CaseSensitive,
}

impl Flag {
    pub const ALL: [Flag; 15] = [
        Self::And,
        Self::AndSucceeded,
        Self::Body,
        Self::PipeBody,
        Self::Copy,
        Self::CaseSensitive,
        Self::Else,
        Self::ErrorHandler,
        Self::Filter,
        Self::Headers,
        Self::PipeHeaders,
        Self::IgnoreErrors,
        Self::Raw,
        Self::WaitQuiet,
        Self::Wait,
    ];

    pub fn as_procmail(&self) -> char {
        match self {
            Self::Headers => 'H',
            Self::Body => 'B',
            Self::PipeHeaders => 'h',
            Self::PipeBody => 'b',
            Self::Copy => 'c',
            Self::And => 'A',
            Self::AndSucceeded => 'a',
            Self::Else => 'E',
            Self::ErrorHandler => 'e',
            Self::Filter => 'f',
            Self::IgnoreErrors => 'i',
            Self::Raw => 'r',
            Self::Wait => 'w',
            Self::WaitQuiet => 'W',
            Self::CaseSensitive => 'D',
        }
    }

    pub fn from_procmail(c: char) -> Option<Self> {
        match c {
            'H' => Some(Self::Headers),
            'B' => Some(Self::Body),
            'h' => Some(Self::PipeHeaders),
            'b' => Some(Self::PipeBody),
            'c' => Some(Self::Copy),
            'A' => Some(Self::And),
            'a' => Some(Self::AndSucceeded),
            'E' => Some(Self::Else),
            'e' => Some(Self::ErrorHandler),
            'f' => Some(Self::Filter),
            'i' => Some(Self::IgnoreErrors),
            'r' => Some(Self::Raw),
            'w' => Some(Self::Wait),
            'W' => Some(Self::WaitQuiet),
            'D' => Some(Self::CaseSensitive),
            _ => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_procmail())
    }
}

/// How an assignment value was quoted in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteKind {
    #[default]
    None,
    Double,
    Single,
    /// Backticks: the value is a shell command whose output is assigned.
    Backtick,
}

impl QuoteKind {
    pub fn delimiter(&self) -> Option<char> {
        match self {
            Self::None => None,
            Self::Double => Some('"'),
            Self::Single => Some('\''),
            Self::Backtick => Some('`'),
        }
    }

    pub fn from_delimiter(c: char) -> Option<Self> {
        match c {
            '"' => Some(Self::Double),
            '\'' => Some(Self::Single),
            '`' => Some(Self::Backtick),
            _ => None,
        }
    }
}

/// Direction of a size condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeSign {
    Greater,
    Less,
}

impl SizeSign {
    pub fn as_procmail(&self) -> char {
        match self {
            Self::Greater => '>',
            Self::Less => '<',
        }
    }

    pub fn from_procmail(c: char) -> Option<Self> {
        match c {
            '>' => Some(Self::Greater),
            '<' => Some(Self::Less),
            _ => None,
        }
    }
}

impl fmt::Display for SizeSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_procmail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_flag_letter_maps_back() {
        for flag in Flag::ALL {
            assert_eq!(Flag::from_procmail(flag.as_procmail()), Some(flag));
        }
        assert_eq!(Flag::from_procmail('x'), None);
    }

    #[test]
    fn test_quote_delimiters() {
        assert_eq!(QuoteKind::None.delimiter(), None);
        assert_eq!(QuoteKind::from_delimiter('`'), Some(QuoteKind::Backtick));
        assert_eq!(QuoteKind::from_delimiter('x'), None);
    }
}
