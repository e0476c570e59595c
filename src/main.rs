mod ast;
mod config;
mod emitter;
mod lexer;
mod parser;
mod post;

use std::fs;

#[derive(Debug)]
enum Error {
    Io(std::io::Error),
    Parse(parser::ParseError),
    Post(post::PostError),
    Config(Box<dyn std::error::Error>),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<parser::ParseError> for Error {
    fn from(e: parser::ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<post::PostError> for Error {
    fn from(e: post::PostError) -> Self {
        Error::Post(e)
    }
}

fn main() -> Result<(), Error> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: kerf <input.cl> [output.nc] [post.json]");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  kerf sheet.cl sheet.nc");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = args.get(2).map(|s| s.as_str()).unwrap_or("output.nc");

    // Post properties are fixed once here; nothing mutates them later
    let properties = match args.get(3) {
        Some(path) => config::PostProperties::from_file(path).map_err(Error::Config)?,
        None => config::PostProperties::default(),
    };

    // Read input
    let source = fs::read_to_string(input_path)?;

    // Lex
    let tokens = lexer::lex(&source);

    // Parse
    let mut parser = parser::Parser::new(tokens);
    let program = parser.parse()?;

    // Post-process to Fanuc G-code
    let output = post::LaserPost::new(properties).process(&program)?;

    for advisory in &output.advisories {
        eprintln!("advisory: {}", advisory);
    }

    // Write output
    fs::write(output_path, &output.gcode)?;

    println!("Generated: {}", output_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_source(source: &str, properties: config::PostProperties) -> post::PostOutput {
        let tokens = lexer::lex(source);
        let mut parser = parser::Parser::new(tokens);
        let program = parser.parse().expect("parse failed");
        post::LaserPost::new(properties)
            .process(&program)
            .expect("post failed")
    }

    #[test]
    fn test_sheet_program() {
        let source = r#"
program "12"
units metric

operation "outer"
tool laser power 80
mode through
offset 54

rapid x 0 y 0
power on
feed 1000
line x 50
arc ccw x 60 y 10 i 0 j 10
line y 40
power off
end
"#;

        let output = post_source(source, config::PostProperties::default());

        assert!(output.gcode.starts_with("O0012\n"));
        assert!(output.gcode.contains("G21"));
        assert!(output.gcode.contains("G90 G94"));
        assert!(output.gcode.contains("(outer)"));
        assert!(output.gcode.contains("G54"));
        assert!(output.gcode.contains("S80 M60")); // Pierce, through mode
        assert!(output.gcode.contains("G03")); // CCW arc
        assert!(output.gcode.contains("M05")); // Beam off
        assert!(output.gcode.contains("M02")); // End command
        assert!(output.gcode.contains("(END OF SHEET)"));
        assert!(output.gcode.ends_with("M30\n%\n"));
        assert!(output.advisories.is_empty());
    }

    #[test]
    fn test_packed_output_format() {
        let source = r#"
program "12"
units metric

operation
rapid x 0 y 0
feed 1000
line x 50
"#;

        let properties = config::PostProperties {
            show_sequence_numbers: false,
            separate_words: false,
            ..Default::default()
        };
        let output = post_source(source, properties);

        let lines: Vec<&str> = output.gcode.lines().collect();
        assert_eq!(lines[0], "O0012");
        assert_eq!(lines[1], "G21");
        assert_eq!(lines[2], "G90G94");
        assert!(output.gcode.contains("G01X50.000F1000.0"));
    }

    #[test]
    fn test_imperial_program() {
        let source = r#"
program "7"
units imperial

operation
rapid x 0 y 0
"#;

        let output = post_source(source, config::PostProperties::default());

        assert!(output.gcode.starts_with("O0007\n"));
        assert!(output.gcode.contains("G20"));
        assert!(!output.gcode.contains("G21"));
    }
}
