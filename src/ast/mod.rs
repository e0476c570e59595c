/// Tool-path event model for the laser post.
/// A program is a header plus cutting operations; each operation carries the
/// fully-resolved motion and command events the CAM side produced for it.

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub header: Header,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Program name; must be a number in 1..=9999 for Fanuc O-numbering
    pub name: String,
    pub comment: Option<String>,
    pub units: Units,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Units {
    Metric,   // G21
    Imperial, // G20
}

/// One cutting section: a contiguous run of events sharing a tool, a cutting
/// mode and a work offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: Option<String>,
    pub tool: ToolSpec,
    pub mode: CutMode,
    pub work_offset: u8, // 54..=59
    pub work_plane: WorkPlane,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSpec {
    pub kind: ToolKind,
    /// Beam power for the S word
    pub power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolKind {
    Laser,
    Mill,
    Waterjet,
    Plasma,
}

/// Cutting mode of a section; selects which pierce macro fires on power-on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutMode {
    Through,
    Etch,
    Vaporize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkPlane {
    Top,
    Tilted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Rapid {
        target: Point3,
        rotary: Option<f64>,
    },
    Linear {
        target: Point3,
        feed: f64,
        rotary: Option<f64>,
    },
    Circular {
        clockwise: bool,
        /// Absolute arc center
        center: Point3,
        target: Point3,
        plane: ArcPlane,
        feed: f64,
    },
    /// Kerf compensation request; takes effect on the next linear move
    Compensation(CompSide),
    /// Dwell in seconds
    Dwell(f64),
    /// Beam on (pierce) / beam off
    Power(bool),
    Command(Command),
    Comment(String),
}

impl Event {
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Event::Rapid { .. } | Event::Linear { .. } | Event::Circular { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcPlane {
    Xy, // G17
    Zx, // G18
    Yz, // G19
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompSide {
    Left,  // G41
    Right, // G42
    Off,   // G40
}

/// Machine control commands. A closed set: anything the CL format cannot
/// name never reaches the post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Stop,         // M00
    OptionalStop, // M01
    End,          // M02
    LockAxis,
    UnlockAxis,
    ToolMeasure,
}

/// 3D point (X, Y, Z)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
