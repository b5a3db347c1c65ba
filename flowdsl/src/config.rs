//! Runtime configuration of the lexer.
//!
//! Every punctuation character the language relies on (executor, separator,
//! quote, the four bracket pairs, number formatting) is data, not a literal
//! in the scanner. [`LexerConfig::default`] gives the stock notation:
//!
//! | role        | default |
//! |-------------|---------|
//! | executor    | `;`     |
//! | separator   | `,`     |
//! | quote       | `"`     |
//! | list        | `( )`   |
//! | vector      | `[ ]`   |
//! | set         | `{ }`   |
//! | scalar      | `⟨ ⟩`   |
//! | decimal     | `.`     |
//! | negative    | `-`     |
//! | exponent    | `e`/`E` |

use crate::Container;
use flowscan::BufferLimits;

/// Opening and closing character of one bracket pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPair {
    /// Character that opens a group.
    pub open: char,
    /// Character that closes it.
    pub close: char,
}

impl BracketPair {
    pub const fn new(open: char, close: char) -> Self {
        Self { open, close }
    }
}

/// How numbers are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    /// Separates the integer and fractional digits of a real.
    pub decimal_separator: char,
    /// Sign accepted in front of an exponent.
    pub negative_sign: char,
    /// Exponent marker; matched case-insensitively.
    pub exponent_marker: char,
}

impl NumberFormat {
    pub(crate) fn is_exponent_marker(&self, c: char) -> bool {
        c.to_lowercase().eq(self.exponent_marker.to_lowercase())
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            negative_sign: '-',
            exponent_marker: 'e',
        }
    }
}

/// Characters and limits used by [`Lexer`](crate::Lexer) and
/// [`Parser`](crate::Parser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerConfig {
    /// Statement terminator.
    pub executor: char,
    /// List delimiter.
    pub separator: char,
    /// Delimits literals; doubled inside a literal to stand for itself.
    pub quote: char,
    /// Indexed by [`Container`].
    pub brackets: [BracketPair; Container::COUNT],
    pub number: NumberFormat,
    /// Shared by the character and the token cursor.
    pub limits: BufferLimits,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            executor: ';',
            separator: ',',
            quote: '"',
            brackets: [
                BracketPair::new('(', ')'),
                BracketPair::new('[', ']'),
                BracketPair::new('{', '}'),
                BracketPair::new('⟨', '⟩'),
            ],
            number: NumberFormat::default(),
            limits: BufferLimits::default(),
        }
    }
}

impl LexerConfig {
    /// Sets the statement terminator.
    pub fn with_executor(mut self, c: char) -> Self {
        self.executor = c;
        self
    }

    /// Sets the list delimiter.
    pub fn with_separator(mut self, c: char) -> Self {
        self.separator = c;
        self
    }

    /// Sets the literal quote.
    pub fn with_quote(mut self, c: char) -> Self {
        self.quote = c;
        self
    }

    /// Replaces the bracket pair of `container`.
    pub fn with_brackets(mut self, container: Container, open: char, close: char) -> Self {
        self.brackets[usize::from(container)] = BracketPair::new(open, close);
        self
    }

    /// Sets how numbers are written.
    pub fn with_number_format(mut self, number: NumberFormat) -> Self {
        self.number = number;
        self
    }

    /// Sets the buffer limits of both cursors.
    pub fn with_limits(mut self, limits: BufferLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The bracket pair of `container`.
    pub fn bracket(&self, container: Container) -> BracketPair {
        self.brackets[usize::from(container)]
    }

    /// The container whose opening character is `c`.
    pub fn opening(&self, c: char) -> Option<Container> {
        Container::ALL
            .into_iter()
            .find(|&k| self.bracket(k).open == c)
    }

    /// The container whose closing character is `c`.
    pub fn closing(&self, c: char) -> Option<Container> {
        Container::ALL
            .into_iter()
            .find(|&k| self.bracket(k).close == c)
    }
}
