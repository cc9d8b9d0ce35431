//! Path commands produced by the tokenizer.

use smallvec::SmallVec;

/// The command letters of the path mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    MoveAbs,
    MoveRel,
    LineAbs,
    LineRel,
    HLineAbs,
    HLineRel,
    VLineAbs,
    VLineRel,
    CubicAbs,
    CubicRel,
    SmoothCubicAbs,
    SmoothCubicRel,
    QuadAbs,
    QuadRel,
    SmoothQuadAbs,
    SmoothQuadRel,
    ArcAbs,
    ArcRel,
    Close,
}

impl CommandKind {
    pub fn from_letter(letter: char) -> Option<Self> {
        let kind = match letter {
            'M' => Self::MoveAbs,
            'm' => Self::MoveRel,
            'L' => Self::LineAbs,
            'l' => Self::LineRel,
            'H' => Self::HLineAbs,
            'h' => Self::HLineRel,
            'V' => Self::VLineAbs,
            'v' => Self::VLineRel,
            'C' => Self::CubicAbs,
            'c' => Self::CubicRel,
            'S' => Self::SmoothCubicAbs,
            's' => Self::SmoothCubicRel,
            'Q' => Self::QuadAbs,
            'q' => Self::QuadRel,
            'T' => Self::SmoothQuadAbs,
            't' => Self::SmoothQuadRel,
            'A' => Self::ArcAbs,
            'a' => Self::ArcRel,
            'Z' | 'z' => Self::Close,
            _ => return None,
        };
        Some(kind)
    }

    pub fn letter(&self) -> char {
        match self {
            Self::MoveAbs => 'M',
            Self::MoveRel => 'm',
            Self::LineAbs => 'L',
            Self::LineRel => 'l',
            Self::HLineAbs => 'H',
            Self::HLineRel => 'h',
            Self::VLineAbs => 'V',
            Self::VLineRel => 'v',
            Self::CubicAbs => 'C',
            Self::CubicRel => 'c',
            Self::SmoothCubicAbs => 'S',
            Self::SmoothCubicRel => 's',
            Self::QuadAbs => 'Q',
            Self::QuadRel => 'q',
            Self::SmoothQuadAbs => 'T',
            Self::SmoothQuadRel => 't',
            Self::ArcAbs => 'A',
            Self::ArcRel => 'a',
            Self::Close => 'Z',
        }
    }

    /// Number of operands consumed by one instance of the command.
    pub fn arity(&self) -> usize {
        match self {
            Self::Close => 0,
            Self::HLineAbs | Self::HLineRel | Self::VLineAbs | Self::VLineRel => 1,
            Self::MoveAbs
            | Self::MoveRel
            | Self::LineAbs
            | Self::LineRel
            | Self::SmoothQuadAbs
            | Self::SmoothQuadRel => 2,
            Self::SmoothCubicAbs | Self::SmoothCubicRel | Self::QuadAbs | Self::QuadRel => 4,
            Self::CubicAbs | Self::CubicRel => 6,
            Self::ArcAbs | Self::ArcRel => 7,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(
            self,
            Self::MoveRel
                | Self::LineRel
                | Self::HLineRel
                | Self::VLineRel
                | Self::CubicRel
                | Self::SmoothCubicRel
                | Self::QuadRel
                | Self::SmoothQuadRel
                | Self::ArcRel
        )
    }

    /// The command implied by extra operand groups after this one.
    ///
    /// A moveto followed by more pairs continues as lineto.
    pub fn repeated(&self) -> Self {
        match self {
            Self::MoveAbs => Self::LineAbs,
            Self::MoveRel => Self::LineRel,
            other => *other,
        }
    }
}

/// One command with its operands, relative or absolute as written.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCommand {
    pub kind: CommandKind,
    pub operands: SmallVec<[f64; 7]>,
}

impl PathCommand {
    pub fn new(kind: CommandKind, operands: &[f64]) -> Self {
        Self {
            kind,
            operands: SmallVec::from_slice(operands),
        }
    }

    pub fn close() -> Self {
        Self {
            kind: CommandKind::Close,
            operands: SmallVec::new(),
        }
    }

    /// Operand at `index`, or 0 when missing.
    pub fn operand(&self, index: usize) -> f64 {
        self.operands.get(index).copied().unwrap_or(0.0)
    }
}
