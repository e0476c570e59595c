//! Recursive descent parser for the CL tool-path format
//! Converts tokens into an AST. Input words are modal: an axis word left out
//! of a motion statement keeps its current value, and `feed` binds to every
//! following cut, so AST events carry absolute positions and explicit feeds.

use crate::ast::*;
use crate::lexer::Token;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, got {got}")]
    UnexpectedToken { expected: String, got: String },

    #[error("unexpected end of input")]
    UnexpectedEOF,

    #[error("invalid number")]
    InvalidNumber,

    #[error("unknown work offset: {0}")]
    UnknownWorkOffset(String),

    #[error("'{0}' statement before the first operation")]
    OutsideOperation(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<(Token, logos::Span)>,
    position: usize,
    current: Point3,
    current_feed: f64,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, logos::Span)>) -> Self {
        Self {
            tokens,
            position: 0,
            current: Point3::default(),
            current_feed: 0.0,
        }
    }

    /// Parse the full program
    pub fn parse(&mut self) -> Result<Program> {
        let header = self.parse_header()?;
        let operations = self.parse_operations()?;

        Ok(Program { header, operations })
    }

    fn parse_header(&mut self) -> Result<Header> {
        let mut name = String::new();
        let mut comment = None;
        let mut units = Units::Metric; // Default

        self.skip_newlines();

        while matches!(
            self.peek(),
            Some(Token::Program) | Some(Token::Units) | Some(Token::Note)
        ) {
            match self.peek() {
                Some(Token::Program) => {
                    self.advance();
                    name = self.expect_string()?;
                }
                Some(Token::Units) => {
                    self.advance();
                    units = match self.peek() {
                        Some(Token::Metric) => {
                            self.advance();
                            Units::Metric
                        }
                        Some(Token::Imperial) => {
                            self.advance();
                            Units::Imperial
                        }
                        _ => return Err(self.unexpected("'metric' or 'imperial'")),
                    };
                }
                Some(Token::Note) => {
                    self.advance();
                    comment = Some(self.expect_string()?);
                }
                _ => break,
            }
            self.skip_newlines();
        }

        Ok(Header {
            name,
            comment,
            units,
        })
    }

    fn parse_operations(&mut self) -> Result<Vec<Operation>> {
        let mut ops: Vec<Operation> = Vec::new();

        loop {
            self.skip_newlines();

            let event = match self.peek() {
                None => break,
                Some(Token::Operation) => {
                    ops.push(self.parse_operation_start()?);
                    continue;
                }
                Some(Token::Tool) => {
                    let tool = self.parse_tool()?;
                    Self::last_op(&mut ops, "tool")?.tool = tool;
                    continue;
                }
                Some(Token::Mode) => {
                    let mode = self.parse_mode()?;
                    Self::last_op(&mut ops, "mode")?.mode = mode;
                    continue;
                }
                Some(Token::Offset) => {
                    let offset = self.parse_offset()?;
                    Self::last_op(&mut ops, "offset")?.work_offset = offset;
                    continue;
                }
                Some(Token::Plane) => {
                    let plane = self.parse_work_plane()?;
                    Self::last_op(&mut ops, "plane")?.work_plane = plane;
                    continue;
                }
                Some(Token::Feed) => {
                    self.advance();
                    self.current_feed = self.expect_number()?;
                    continue;
                }
                Some(Token::Rapid) => self.parse_rapid()?,
                Some(Token::Line) => self.parse_line()?,
                Some(Token::Arc) => self.parse_arc()?,
                Some(Token::Comp) => self.parse_comp()?,
                Some(Token::Dwell) => {
                    self.advance();
                    Event::Dwell(self.expect_number()?)
                }
                Some(Token::Power) => self.parse_power()?,
                Some(Token::Stop) => {
                    self.advance();
                    Event::Command(Command::Stop)
                }
                Some(Token::Optional) => {
                    self.advance();
                    self.consume(Token::Stop)?;
                    Event::Command(Command::OptionalStop)
                }
                Some(Token::End) => {
                    self.advance();
                    Event::Command(Command::End)
                }
                Some(Token::Measure) => {
                    self.advance();
                    Event::Command(Command::ToolMeasure)
                }
                Some(Token::Lock) => {
                    self.advance();
                    Event::Command(Command::LockAxis)
                }
                Some(Token::Unlock) => {
                    self.advance();
                    Event::Command(Command::UnlockAxis)
                }
                Some(Token::Note) => {
                    self.advance();
                    Event::Comment(self.expect_string()?)
                }
                Some(_) => return Err(self.unexpected("a statement keyword")),
            };

            let statement = statement_name(&event);
            Self::last_op(&mut ops, statement)?.events.push(event);
        }

        Ok(ops)
    }

    fn last_op<'a>(ops: &'a mut [Operation], statement: &str) -> Result<&'a mut Operation> {
        ops.last_mut()
            .ok_or_else(|| ParseError::OutsideOperation(statement.to_string()))
    }

    fn parse_operation_start(&mut self) -> Result<Operation> {
        self.consume(Token::Operation)?;
        let name = match self.peek() {
            Some(Token::String(_)) => Some(self.expect_string()?),
            _ => None,
        };

        Ok(Operation {
            name,
            tool: ToolSpec {
                kind: ToolKind::Laser,
                power: 100.0,
            },
            mode: CutMode::Through,
            work_offset: 54,
            work_plane: WorkPlane::Top,
            events: Vec::new(),
        })
    }

    fn parse_tool(&mut self) -> Result<ToolSpec> {
        self.consume(Token::Tool)?;
        let kind = match self.peek() {
            Some(Token::Laser) => {
                self.advance();
                ToolKind::Laser
            }
            Some(Token::Mill) => {
                self.advance();
                ToolKind::Mill
            }
            Some(Token::Waterjet) => {
                self.advance();
                ToolKind::Waterjet
            }
            Some(Token::Plasma) => {
                self.advance();
                ToolKind::Plasma
            }
            _ => return Err(self.unexpected("a tool kind")),
        };

        let power = if self.peek() == Some(&Token::Power) {
            self.advance();
            self.expect_number()?
        } else {
            100.0
        };

        Ok(ToolSpec { kind, power })
    }

    fn parse_mode(&mut self) -> Result<CutMode> {
        self.consume(Token::Mode)?;
        match self.peek() {
            Some(Token::Through) => {
                self.advance();
                Ok(CutMode::Through)
            }
            Some(Token::Etch) => {
                self.advance();
                Ok(CutMode::Etch)
            }
            Some(Token::Vaporize) => {
                self.advance();
                Ok(CutMode::Vaporize)
            }
            _ => Err(self.unexpected("'through', 'etch', or 'vaporize'")),
        }
    }

    fn parse_offset(&mut self) -> Result<u8> {
        self.consume(Token::Offset)?;
        let offset = self.expect_number()? as u8;
        match offset {
            54..=59 => Ok(offset),
            _ => Err(ParseError::UnknownWorkOffset(format!("G{}", offset))),
        }
    }

    fn parse_work_plane(&mut self) -> Result<WorkPlane> {
        self.consume(Token::Plane)?;
        match self.peek() {
            Some(Token::Top) => {
                self.advance();
                Ok(WorkPlane::Top)
            }
            Some(Token::Tilted) => {
                self.advance();
                Ok(WorkPlane::Tilted)
            }
            _ => Err(self.unexpected("'top' or 'tilted'")),
        }
    }

    fn parse_rapid(&mut self) -> Result<Event> {
        self.consume(Token::Rapid)?;
        let (target, rotary, _) = self.parse_motion_words()?;
        self.current = target;
        Ok(Event::Rapid { target, rotary })
    }

    fn parse_line(&mut self) -> Result<Event> {
        self.consume(Token::Line)?;
        let (target, rotary, feed) = self.parse_motion_words()?;
        if let Some(feed) = feed {
            self.current_feed = feed;
        }
        self.current = target;
        Ok(Event::Linear {
            target,
            feed: self.current_feed,
            rotary,
        })
    }

    fn parse_arc(&mut self) -> Result<Event> {
        self.consume(Token::Arc)?;
        let clockwise = match self.peek() {
            Some(Token::CW) => {
                self.advance();
                true
            }
            Some(Token::CCW) => {
                self.advance();
                false
            }
            _ => return Err(self.unexpected("'cw' or 'ccw'")),
        };

        let start = self.current;
        let mut target = start;
        let mut center_offset = Point3::default();
        let mut plane = ArcPlane::Xy;

        loop {
            match self.peek() {
                Some(Token::X) => {
                    self.advance();
                    target.x = self.expect_number()?;
                }
                Some(Token::Y) => {
                    self.advance();
                    target.y = self.expect_number()?;
                }
                Some(Token::Z) => {
                    self.advance();
                    target.z = self.expect_number()?;
                }
                Some(Token::I) => {
                    self.advance();
                    center_offset.x = self.expect_number()?;
                }
                Some(Token::J) => {
                    self.advance();
                    center_offset.y = self.expect_number()?;
                }
                Some(Token::K) => {
                    self.advance();
                    center_offset.z = self.expect_number()?;
                }
                Some(Token::Plane) => {
                    self.advance();
                    plane = match self.peek() {
                        Some(Token::PlaneXY) => {
                            self.advance();
                            ArcPlane::Xy
                        }
                        Some(Token::PlaneZX) => {
                            self.advance();
                            ArcPlane::Zx
                        }
                        Some(Token::PlaneYZ) => {
                            self.advance();
                            ArcPlane::Yz
                        }
                        _ => return Err(self.unexpected("'xy', 'zx', or 'yz'")),
                    };
                }
                Some(Token::Feed) => {
                    self.advance();
                    self.current_feed = self.expect_number()?;
                }
                _ => break,
            }
        }

        let center = Point3::new(
            start.x + center_offset.x,
            start.y + center_offset.y,
            start.z + center_offset.z,
        );
        self.current = target;

        Ok(Event::Circular {
            clockwise,
            center,
            target,
            plane,
            feed: self.current_feed,
        })
    }

    fn parse_comp(&mut self) -> Result<Event> {
        self.consume(Token::Comp)?;
        let side = match self.peek() {
            Some(Token::Left) => {
                self.advance();
                CompSide::Left
            }
            Some(Token::Right) => {
                self.advance();
                CompSide::Right
            }
            Some(Token::Off) => {
                self.advance();
                CompSide::Off
            }
            _ => return Err(self.unexpected("'left', 'right', or 'off'")),
        };
        Ok(Event::Compensation(side))
    }

    fn parse_power(&mut self) -> Result<Event> {
        self.consume(Token::Power)?;
        match self.peek() {
            Some(Token::On) => {
                self.advance();
                Ok(Event::Power(true))
            }
            Some(Token::Off) => {
                self.advance();
                Ok(Event::Power(false))
            }
            _ => Err(self.unexpected("'on' or 'off'")),
        }
    }

    /// Shared word loop for rapid/line statements
    fn parse_motion_words(&mut self) -> Result<(Point3, Option<f64>, Option<f64>)> {
        let mut target = self.current;
        let mut rotary = None;
        let mut feed = None;

        loop {
            match self.peek() {
                Some(Token::X) => {
                    self.advance();
                    target.x = self.expect_number()?;
                }
                Some(Token::Y) => {
                    self.advance();
                    target.y = self.expect_number()?;
                }
                Some(Token::Z) => {
                    self.advance();
                    target.z = self.expect_number()?;
                }
                Some(Token::A) => {
                    self.advance();
                    rotary = Some(self.expect_number()?);
                }
                Some(Token::Feed) => {
                    self.advance();
                    feed = Some(self.expect_number()?);
                }
                _ => break,
            }
        }

        Ok((target, rotary, feed))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.advance();
        }
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        match self.peek() {
            Some(t) if *t == expected => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: format!("{:?}", expected),
                got: format!("{:?}", other),
            }),
            None => Err(ParseError::UnexpectedEOF),
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Number(Some(n))) => {
                let val = *n;
                self.advance();
                Ok(val)
            }
            Some(Token::Number(None)) => Err(ParseError::InvalidNumber),
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "number".to_string(),
                got: format!("{:?}", other),
            }),
            None => Err(ParseError::UnexpectedEOF),
        }
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::String(s)) => {
                let val = s.clone();
                self.advance();
                Ok(val)
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "string".to_string(),
                got: format!("{:?}", other),
            }),
            None => Err(ParseError::UnexpectedEOF),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(t) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: format!("{:?}", t),
            },
            None => ParseError::UnexpectedEOF,
        }
    }
}

fn statement_name(event: &Event) -> &'static str {
    match event {
        Event::Rapid { .. } => "rapid",
        Event::Linear { .. } => "line",
        Event::Circular { .. } => "arc",
        Event::Compensation(_) => "comp",
        Event::Dwell(_) => "dwell",
        Event::Power(_) => "power",
        Event::Command(_) => "command",
        Event::Comment(_) => "note",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    #[test]
    fn test_parse_basic_program() {
        let source = r#"
program "12"
units metric

operation "outer contour"
tool laser power 80
mode through
offset 54

rapid x 0 y 0
power on
feed 1000
line x 50
power off
"#;

        let tokens = lex(source);
        let mut parser = Parser::new(tokens);
        let program = parser.parse().expect("parse failed");

        assert_eq!(program.header.name, "12");
        assert_eq!(program.header.units, Units::Metric);
        assert_eq!(program.operations.len(), 1);

        let op = &program.operations[0];
        assert_eq!(op.name.as_deref(), Some("outer contour"));
        assert_eq!(op.tool.kind, ToolKind::Laser);
        assert_eq!(op.tool.power, 80.0);
        assert_eq!(op.mode, CutMode::Through);
        assert_eq!(op.work_offset, 54);
        assert_eq!(op.events.len(), 4);
    }

    #[test]
    fn test_modal_axis_words() {
        let source = r#"
operation
rapid x 10 y 20
feed 500
line x 30
line y 5 z -1
"#;

        let tokens = lex(source);
        let mut parser = Parser::new(tokens);
        let program = parser.parse().expect("parse failed");

        let events = &program.operations[0].events;
        assert_eq!(
            events[1],
            Event::Linear {
                target: Point3::new(30.0, 20.0, 0.0),
                feed: 500.0,
                rotary: None,
            }
        );
        assert_eq!(
            events[2],
            Event::Linear {
                target: Point3::new(30.0, 5.0, -1.0),
                feed: 500.0,
                rotary: None,
            }
        );
    }

    #[test]
    fn test_arc_center_resolution() {
        let source = r#"
operation
rapid x 10 y 0
feed 800
arc ccw x 0 y 10 i -10 j 0
"#;

        let tokens = lex(source);
        let mut parser = Parser::new(tokens);
        let program = parser.parse().expect("parse failed");

        let events = &program.operations[0].events;
        assert_eq!(
            events[1],
            Event::Circular {
                clockwise: false,
                center: Point3::new(0.0, 0.0, 0.0),
                target: Point3::new(0.0, 10.0, 0.0),
                plane: ArcPlane::Xy,
                feed: 800.0,
            }
        );
    }

    #[test]
    fn test_unknown_work_offset() {
        let tokens = lex("operation\noffset 53");
        let mut parser = Parser::new(tokens);
        let err = parser.parse().unwrap_err();

        assert!(matches!(err, ParseError::UnknownWorkOffset(s) if s == "G53"));
    }

    #[test]
    fn test_event_outside_operation() {
        let tokens = lex("rapid x 1 y 1");
        let mut parser = Parser::new(tokens);
        let err = parser.parse().unwrap_err();

        assert!(matches!(err, ParseError::OutsideOperation(s) if s == "rapid"));
    }

    #[test]
    fn test_commands_and_rotary() {
        let source = r#"
operation
optional stop
measure
line x 5 a 45 feed 100
"#;

        let tokens = lex(source);
        let mut parser = Parser::new(tokens);
        let program = parser.parse().expect("parse failed");

        let events = &program.operations[0].events;
        assert_eq!(events[0], Event::Command(Command::OptionalStop));
        assert_eq!(events[1], Event::Command(Command::ToolMeasure));
        assert_eq!(
            events[2],
            Event::Linear {
                target: Point3::new(5.0, 0.0, 0.0),
                feed: 100.0,
                rotary: Some(45.0),
            }
        );
    }
}
