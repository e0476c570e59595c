//! Modal-aware G-code emission
//!
//! Fanuc words are modal: a word whose value has not changed since it was
//! last written must be left out of the block, and a word whose value did
//! change must never be left out. The emitter owns every per-channel
//! "last emitted" cache so suppression decisions live in one place and can
//! be reset explicitly (after a rapid, at a section start, on a plane
//! change) instead of leaking across moves.

pub mod block;
pub mod format;

pub use block::{BlockWriter, SequenceCounter};
pub use format::FormatSpec;

/// One modal value channel (X, Y, Z, F, S)
#[derive(Debug)]
pub struct ModalWord {
    spec: FormatSpec,
    last: Option<String>,
    always: bool,
}

impl ModalWord {
    pub fn new(spec: FormatSpec) -> Self {
        Self {
            spec,
            last: None,
            always: false,
        }
    }

    /// Channel that re-emits on every call regardless of value
    pub fn always(spec: FormatSpec) -> Self {
        Self {
            spec,
            last: None,
            always: true,
        }
    }

    /// Format the value, suppressing the word when it matches the last
    /// emitted one. Comparison happens on the formatted text so changes
    /// below the channel precision do not re-emit.
    pub fn format(&mut self, value: f64) -> Option<String> {
        let word = self.spec.format(value);
        if !self.always && self.last.as_deref() == Some(word.as_str()) {
            return None;
        }
        self.last = Some(word.clone());
        Some(word)
    }

    /// Forget the last emitted value; the next format call emits
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// A mutually-exclusive machine mode (motion type, plane, units, ...).
/// Emits its code only when it differs from the active one.
#[derive(Debug)]
pub struct ModalGroup {
    spec: FormatSpec,
    active: Option<u32>,
    force_next: bool,
}

impl ModalGroup {
    pub fn new(spec: FormatSpec) -> Self {
        Self {
            spec,
            active: None,
            force_next: false,
        }
    }

    pub fn format(&mut self, code: u32) -> Option<String> {
        if !self.force_next && self.active == Some(code) {
            return None;
        }
        self.force_next = false;
        self.active = Some(code);
        Some(self.spec.format(code as f64))
    }

    pub fn reset(&mut self) {
        self.force_next = true;
    }
}

/// All modal output state of one posting run, plus the line buffer
#[derive(Debug)]
pub struct LineEmitter {
    pub blocks: BlockWriter,

    pub motion: ModalGroup,       // G00/G01/G02/G03
    pub plane: ModalGroup,        // G17/G18/G19
    pub distance: ModalGroup,     // G90/G91
    pub feed_mode: ModalGroup,    // G93/G94
    pub units: ModalGroup,        // G20/G21
    pub offset: ModalGroup,       // G54..G59
    pub compensation: ModalGroup, // G40/G41/G42

    pub x: ModalWord,
    pub y: ModalWord,
    pub z: ModalWord,
    pub feed: ModalWord,
    pub power: ModalWord,
}

impl LineEmitter {
    pub fn new(separate_words: bool, sequence: Option<SequenceCounter>) -> Self {
        let g = FormatSpec::integer("G", 2);

        Self {
            blocks: BlockWriter::new(separate_words, sequence),
            motion: ModalGroup::new(g),
            plane: ModalGroup::new(g),
            distance: ModalGroup::new(g),
            feed_mode: ModalGroup::new(g),
            units: ModalGroup::new(g),
            offset: ModalGroup::new(g),
            compensation: ModalGroup::new(g),
            x: ModalWord::new(FormatSpec::decimal("X", 3)),
            y: ModalWord::new(FormatSpec::decimal("Y", 3)),
            z: ModalWord::new(FormatSpec::decimal("Z", 3)),
            feed: ModalWord::new(FormatSpec::decimal("F", 1)),
            power: ModalWord::always(FormatSpec::decimal("S", 0)),
        }
    }

    /// Select a circular plane. A plane change invalidates whatever motion
    /// code was active, so the motion group re-emits on the next move.
    pub fn select_plane(&mut self, code: u32) -> Option<String> {
        let word = self.plane.format(code);
        if word.is_some() {
            self.motion.reset();
        }
        word
    }

    /// Force all position words to re-emit on the next move
    pub fn force_position(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }
}
