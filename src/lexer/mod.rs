use logos::Logos;

/// Tokens for the cutter-location (CL) format
/// One statement per line; keywords are lowercase words, coordinates are
/// single-letter words followed by a number.

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")] // Skip whitespace
#[logos(error = LexerError)]
pub enum Token {
    // Literals
    #[regex(r"-?\d+\.?\d*", |lex| lex.slice().parse::<f64>().ok())]
    Number(Option<f64>),

    #[regex(r#""[^"]*""#, |lex| lex.slice()[1..lex.slice().len()-1].to_string())]
    String(String),

    // Keywords - Program structure
    #[token("program")]
    Program,

    #[token("units")]
    Units,

    #[token("metric")]
    Metric,

    #[token("imperial")]
    Imperial,

    #[token("operation")]
    Operation,

    #[token("offset")]
    Offset,

    #[token("plane")]
    Plane,

    #[token("top")]
    Top,

    #[token("tilted")]
    Tilted,

    // Keywords - Tool
    #[token("tool")]
    Tool,

    #[token("laser")]
    Laser,

    #[token("mill")]
    Mill,

    #[token("waterjet")]
    Waterjet,

    #[token("plasma")]
    Plasma,

    #[token("power")]
    Power,

    // Keywords - Cutting mode
    #[token("mode")]
    Mode,

    #[token("through")]
    Through,

    #[token("etch")]
    Etch,

    #[token("vaporize")]
    Vaporize,

    // Keywords - Motion
    #[token("rapid")]
    Rapid,

    #[token("line")]
    Line,

    #[token("arc")]
    Arc,

    #[token("cw")]
    CW,

    #[token("ccw")]
    CCW,

    #[token("feed")]
    #[token("feedrate")]
    Feed,

    // Keywords - Compensation
    #[token("comp")]
    Comp,

    #[token("left")]
    Left,

    #[token("right")]
    Right,

    #[token("off")]
    Off,

    // Keywords - Commands
    #[token("dwell")]
    Dwell,

    #[token("on")]
    On,

    #[token("stop")]
    Stop,

    #[token("optional")]
    Optional,

    #[token("measure")]
    Measure,

    #[token("lock")]
    Lock,

    #[token("unlock")]
    Unlock,

    #[token("end")]
    End,

    #[token("note")]
    Note,

    // Axis and arc-center words
    #[token("x")]
    X,

    #[token("y")]
    Y,

    #[token("z")]
    Z,

    #[token("i")]
    I,

    #[token("j")]
    J,

    #[token("k")]
    K,

    #[token("a")]
    A,

    #[token("xy")]
    PlaneXY,

    #[token("zx")]
    PlaneZX,

    #[token("yz")]
    PlaneYZ,

    // Newlines for statement separation
    #[regex(r"\n\s*\n", logos::skip)] // Skip blank lines
    #[token("\n")]
    Newline,

    // Comments
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    Comment,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerError;

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lexer error")
    }
}

impl std::error::Error for LexerError {}

/// Lex the input string into tokens
pub fn lex(input: &str) -> Vec<(Token, logos::Span)> {
    Token::lexer(input)
        .spanned()
        .filter_map(|(result, span)| match result {
            Ok(token) => Some((token, span)),
            Err(_) => None,
        })
        .collect()
}
