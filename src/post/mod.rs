//! Fanuc-dialect post for 2-axis laser cutters
//!
//! Walks a tool-path program and emits one block per event through the
//! modal emitter. Anything the machine class cannot express (rotary motion,
//! tilted work planes, compensation games mid-arc) aborts the run: a partial
//! laser program is worse than none.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::ast::*;
use crate::config::PostProperties;
use crate::emitter::{FormatSpec, LineEmitter, SequenceCounter};
use thiserror::Error;

// Non-modal output channels
const G_WORD: FormatSpec = FormatSpec::integer("G", 2);
const M_WORD: FormatSpec = FormatSpec::integer("M", 2);
const O_WORD: FormatSpec = FormatSpec::integer("O", 4);
const I_WORD: FormatSpec = FormatSpec::decimal("I", 3);
const J_WORD: FormatSpec = FormatSpec::decimal("J", 3);
const P_WORD: FormatSpec = FormatSpec::decimal("P", 3);

const MCODE_STOP: u32 = 0;
const MCODE_OPTIONAL_STOP: u32 = 1;
const MCODE_END: u32 = 2;
const MCODE_BEAM_OFF: u32 = 5;
const MCODE_PROGRAM_END: u32 = 30;

// O-numbers the machine builder keeps for macros
const RESERVED_PROGRAMS: std::ops::RangeInclusive<i64> = 8000..=9999;

const DWELL_MIN: f64 = 0.001;
const DWELL_MAX: f64 = 99999.999;

/// Coordinate comparison epsilon, below the output precision
const EPS: f64 = 1e-4;

#[derive(Error, Debug)]
pub enum PostError {
    #[error("invalid program name {0:?}: expected a number in 1..=9999")]
    InvalidProgramName(String),

    #[error("program number {0} is out of range 1..=9999")]
    ProgramNumberOutOfRange(i64),

    #[error("unsupported tool type {0:?}: this machine only carries a laser head")]
    UnsupportedTool(ToolKind),

    #[error("unsupported work plane: only the flat top plane can be cut")]
    UnsupportedWorkPlane,

    #[error("{0:?} cutting requires a pierce M-code in the post properties")]
    MissingModeCode(CutMode),

    #[error("multi-axis motion is not available on a 2-axis machine")]
    MultiAxisMotion,

    #[error("rapid motion with kerf compensation pending")]
    RapidWithPendingCompensation,

    #[error("kerf compensation cannot change during circular motion")]
    CompensationChangeInArc,
}

/// Result of a posting run: the program text plus non-fatal advisories
#[derive(Debug)]
pub struct PostOutput {
    pub gcode: String,
    pub advisories: Vec<String>,
}

pub struct LaserPost {
    properties: PostProperties,
    emitter: LineEmitter,
    position: Point3,
    pending_comp: Option<CompSide>,
    comp_engaged: bool,
    section_power: f64,
    section_mode_code: u32,
    advisories: Vec<String>,
}

impl LaserPost {
    pub fn new(properties: PostProperties) -> Self {
        let sequence = if properties.show_sequence_numbers {
            Some(SequenceCounter::new(
                properties.sequence_number_start,
                properties.sequence_number_increment,
            ))
        } else {
            None
        };
        let emitter = LineEmitter::new(properties.separate_words, sequence);

        Self {
            properties,
            emitter,
            position: Point3::default(),
            pending_comp: None,
            comp_engaged: false,
            section_power: 0.0,
            section_mode_code: 0,
            advisories: Vec::new(),
        }
    }

    pub fn process(mut self, program: &Program) -> Result<PostOutput, PostError> {
        self.emit_header(&program.header)?;

        for op in &program.operations {
            self.emit_operation(op)?;
        }

        self.emit_footer();

        Ok(PostOutput {
            gcode: self.emitter.blocks.output(),
            advisories: self.advisories,
        })
    }

    fn emit_header(&mut self, header: &Header) -> Result<(), PostError> {
        let number: i64 = header
            .name
            .trim()
            .parse()
            .map_err(|_| PostError::InvalidProgramName(header.name.clone()))?;
        if !(1..=9999).contains(&number) {
            return Err(PostError::ProgramNumberOutOfRange(number));
        }
        if RESERVED_PROGRAMS.contains(&number) {
            self.advisories.push(format!(
                "program number {} is in the reserved range 8000-9999",
                number
            ));
        }

        self.emitter.blocks.line(&O_WORD.format(number as f64));
        if self.properties.write_comments {
            if let Some(comment) = &header.comment {
                self.emitter.blocks.comment(comment);
            }
        }

        let unit_code = match header.units {
            Units::Metric => 21,
            Units::Imperial => 20,
        };
        let units = self.emitter.units.format(unit_code);
        self.emitter.blocks.block([units]);

        let distance = self.emitter.distance.format(90);
        let feed_mode = self.emitter.feed_mode.format(94);
        self.emitter.blocks.block([distance, feed_mode]);

        Ok(())
    }

    fn emit_operation(&mut self, op: &Operation) -> Result<(), PostError> {
        if op.tool.kind != ToolKind::Laser {
            return Err(PostError::UnsupportedTool(op.tool.kind));
        }
        if op.work_plane != WorkPlane::Top {
            return Err(PostError::UnsupportedWorkPlane);
        }
        self.section_mode_code = self.mode_code(op.mode)?;
        self.section_power = op.tool.power;

        if self.properties.write_comments {
            if let Some(name) = &op.name {
                self.emitter.blocks.comment(name);
            }
        }

        let offset = self.emitter.offset.format(op.work_offset as u32);
        self.emitter.blocks.block([offset]);

        // Position is unknown to the control at a section boundary
        self.emitter.force_position();

        for (index, event) in op.events.iter().enumerate() {
            match event {
                Event::Rapid { target, rotary } => self.emit_rapid(*target, *rotary)?,
                Event::Linear {
                    target,
                    feed,
                    rotary,
                } => {
                    let motion_follows = op.events[index + 1..].iter().any(Event::is_motion);
                    self.emit_linear(*target, *feed, *rotary, motion_follows)?;
                }
                Event::Circular {
                    clockwise,
                    center,
                    target,
                    plane,
                    feed,
                } => self.emit_circular(*clockwise, *center, *target, *plane, *feed)?,
                Event::Compensation(side) => {
                    self.pending_comp = Some(*side);
                }
                Event::Dwell(seconds) => self.emit_dwell(*seconds),
                Event::Power(on) => self.emit_power(*on),
                Event::Command(command) => self.emit_command(*command),
                Event::Comment(text) => {
                    if self.properties.write_comments {
                        self.emitter.blocks.comment(text);
                    }
                }
            }
        }

        // Compensation must not leak into the next section
        self.pending_comp = None;
        if self.comp_engaged {
            let cancel = self.emitter.compensation.format(40);
            self.emitter.blocks.block([cancel]);
            self.comp_engaged = false;
        }

        Ok(())
    }

    fn mode_code(&self, mode: CutMode) -> Result<u32, PostError> {
        let code = match mode {
            CutMode::Through => self.properties.through_mode_code,
            CutMode::Etch => self.properties.etch_mode_code,
            CutMode::Vaporize => self.properties.vaporize_mode_code,
        };
        if code == 0 {
            return Err(PostError::MissingModeCode(mode));
        }
        Ok(code)
    }

    fn emit_rapid(&mut self, target: Point3, rotary: Option<f64>) -> Result<(), PostError> {
        if rotary.is_some() {
            return Err(PostError::MultiAxisMotion);
        }
        if self.pending_comp.is_some() {
            return Err(PostError::RapidWithPendingCompensation);
        }

        let x = self.emitter.x.format(target.x);
        let y = self.emitter.y.format(target.y);
        let z = self.emitter.z.format(target.z);
        if x.is_some() || y.is_some() || z.is_some() {
            let motion = self.emitter.motion.format(0);
            self.emitter.blocks.block([motion, x, y, z]);
        }

        // The next cut cannot assume its feed survived the rapid
        self.emitter.feed.reset();
        self.position = target;
        Ok(())
    }

    fn emit_linear(
        &mut self,
        target: Point3,
        feed: f64,
        rotary: Option<f64>,
        motion_follows: bool,
    ) -> Result<(), PostError> {
        if rotary.is_some() {
            return Err(PostError::MultiAxisMotion);
        }

        let comp = match self.pending_comp.take() {
            Some(side) => {
                // Engaging or dropping compensation needs motion words even
                // when the coordinates happen to be unchanged
                self.emitter.x.reset();
                self.emitter.y.reset();
                let code = match side {
                    CompSide::Left => 41,
                    CompSide::Right => 42,
                    CompSide::Off => 40,
                };
                self.comp_engaged = code != 40;
                self.emitter.compensation.format(code)
            }
            None => None,
        };

        let x = self.emitter.x.format(target.x);
        let y = self.emitter.y.format(target.y);
        let z = self.emitter.z.format(target.z);
        let feed_word = self.feed_word(feed);

        if comp.is_some() || x.is_some() || y.is_some() || z.is_some() {
            let motion = self.emitter.motion.format(1);
            self.emitter.blocks.block([motion, comp, x, y, z, feed_word]);
        } else if feed_word.is_some() {
            if motion_follows {
                // Hold the new feed back; the following motion block
                // carries it instead of a motion-less F block
                self.emitter.feed.reset();
            } else {
                let motion = self.emitter.motion.format(1);
                self.emitter.blocks.block([motion, feed_word]);
            }
        }

        self.position = target;
        Ok(())
    }

    fn emit_circular(
        &mut self,
        clockwise: bool,
        center: Point3,
        target: Point3,
        plane: ArcPlane,
        feed: f64,
    ) -> Result<(), PostError> {
        if self.pending_comp.is_some() {
            return Err(PostError::CompensationChangeInArc);
        }

        let start = self.position;
        let (su, sv) = project(start, plane);
        let (tu, tv) = project(target, plane);
        let full_circle = (su - tu).abs() < EPS && (sv - tv).abs() < EPS;
        let helical = (axial(start, plane) - axial(target, plane)).abs() > EPS;

        // The control only interpolates circles in the XY plane, and a
        // helical full circle has no end word to hang the Z lead on
        if plane != ArcPlane::Xy || (full_circle && helical) {
            self.linearize(clockwise, center, target, plane, feed);
            return Ok(());
        }

        let plane_word = self.emitter.select_plane(17);
        let motion = self.emitter.motion.format(if clockwise { 2 } else { 3 });
        let i = Some(I_WORD.format(center.x - start.x));
        let j = Some(J_WORD.format(center.y - start.y));
        let feed_word = self.feed_word(feed);

        if full_circle {
            self.emitter.blocks.block([plane_word, motion, i, j, feed_word]);
        } else {
            let x = self.emitter.x.format(target.x);
            let y = self.emitter.y.format(target.y);
            let z = self.emitter.z.format(target.z);
            self.emitter
                .blocks
                .block([plane_word, motion, x, y, z, i, j, feed_word]);
        }

        self.position = target;
        Ok(())
    }

    /// Replace an arc the control cannot interpolate by chordal G01 segments
    fn linearize(
        &mut self,
        clockwise: bool,
        center: Point3,
        target: Point3,
        plane: ArcPlane,
        feed: f64,
    ) {
        let start = self.position;
        let (su, sv) = project(start, plane);
        let (cu, cv) = project(center, plane);
        let (tu, tv) = project(target, plane);

        let radius = ((su - cu).powi(2) + (sv - cv).powi(2)).sqrt();
        if radius < EPS {
            self.emit_segment(target, feed);
            return;
        }

        let start_angle = (sv - cv).atan2(su - cu);
        let end_angle = (tv - cv).atan2(tu - cu);
        let mut sweep = if clockwise {
            start_angle - end_angle
        } else {
            end_angle - start_angle
        };
        if sweep <= EPS {
            sweep += 2.0 * PI;
        }

        // Chordal deviation limit; capped so a coarse tolerance still keeps
        // arcs round
        let tolerance = self.properties.linearize_tolerance.max(1e-6).min(radius);
        let step = (2.0 * (1.0 - tolerance / radius).acos()).min(FRAC_PI_2);
        let steps = ((sweep / step).ceil() as usize).max(1);

        let w_start = axial(start, plane);
        let w_end = axial(target, plane);

        for n in 1..=steps {
            let t = n as f64 / steps as f64;
            let point = if n == steps {
                target
            } else {
                let angle = if clockwise {
                    start_angle - sweep * t
                } else {
                    start_angle + sweep * t
                };
                unproject(
                    cu + radius * angle.cos(),
                    cv + radius * angle.sin(),
                    w_start + (w_end - w_start) * t,
                    plane,
                )
            };
            self.emit_segment(point, feed);
        }
    }

    fn emit_segment(&mut self, target: Point3, feed: f64) {
        let x = self.emitter.x.format(target.x);
        let y = self.emitter.y.format(target.y);
        let z = self.emitter.z.format(target.z);
        let feed_word = self.feed_word(feed);
        if x.is_some() || y.is_some() || z.is_some() {
            let motion = self.emitter.motion.format(1);
            self.emitter.blocks.block([motion, x, y, z, feed_word]);
        }
        self.position = target;
    }

    fn emit_dwell(&mut self, seconds: f64) {
        let clamped = seconds.clamp(DWELL_MIN, DWELL_MAX);
        if clamped != seconds {
            self.advisories.push(format!(
                "dwell of {}s is out of range, clamped to {}s",
                seconds, clamped
            ));
        }
        self.emitter
            .blocks
            .block([Some(G_WORD.format(4.0)), Some(P_WORD.format(clamped))]);
    }

    fn emit_power(&mut self, on: bool) {
        if on {
            let power = self.emitter.power.format(self.section_power);
            let pierce = Some(M_WORD.format(self.section_mode_code as f64));
            self.emitter.blocks.block([power, pierce]);
        } else {
            self.emitter
                .blocks
                .block([Some(M_WORD.format(MCODE_BEAM_OFF as f64))]);
        }
    }

    fn emit_command(&mut self, command: Command) {
        let code = match command {
            Command::Stop => MCODE_STOP,
            Command::OptionalStop => MCODE_OPTIONAL_STOP,
            Command::End => MCODE_END,
            // No rotary clamps and no tool setter on this machine class
            Command::LockAxis | Command::UnlockAxis | Command::ToolMeasure => return,
        };
        self.emitter.blocks.block([Some(M_WORD.format(code as f64))]);
    }

    fn emit_footer(&mut self) {
        self.emitter.blocks.comment("END OF SHEET");
        self.emitter
            .blocks
            .block([Some(M_WORD.format(MCODE_PROGRAM_END as f64))]);
        self.emitter.blocks.line("%");
    }

    fn feed_word(&mut self, feed: f64) -> Option<String> {
        if self.properties.use_feed {
            self.emitter.feed.format(feed)
        } else {
            None
        }
    }
}

fn project(p: Point3, plane: ArcPlane) -> (f64, f64) {
    match plane {
        ArcPlane::Xy => (p.x, p.y),
        ArcPlane::Zx => (p.z, p.x),
        ArcPlane::Yz => (p.y, p.z),
    }
}

fn axial(p: Point3, plane: ArcPlane) -> f64 {
    match plane {
        ArcPlane::Xy => p.z,
        ArcPlane::Zx => p.y,
        ArcPlane::Yz => p.x,
    }
}

fn unproject(u: f64, v: f64, w: f64, plane: ArcPlane) -> Point3 {
    match plane {
        ArcPlane::Xy => Point3::new(u, v, w),
        ArcPlane::Zx => Point3::new(v, w, u),
        ArcPlane::Yz => Point3::new(w, u, v),
    }
}
