/// In ARM state every instruction is conditionally executed according to the
/// CPSR flags and the instruction's condition field (bits 31:28). If the
/// flags do not satisfy the encoded predicate the instruction is skipped.
/// Thumb exposes the same table through its conditional-branch family.
///
/// `Display` renders the lowercase mnemonic suffix used by the trace; `AL`
/// renders as nothing, which is how assemblers write it too.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Condition {
    /// Z set (equal).
    EQ = 0x0,

    /// Z clear (not equal).
    NE = 0x1,

    /// C set (unsigned higher or same).
    CS = 0x2,

    /// C clear (unsigned lower).
    CC = 0x3,

    /// N set (negative).
    MI = 0x4,

    /// N clear (positive or zero).
    PL = 0x5,

    /// V set (overflow).
    VS = 0x6,

    /// V clear (no overflow).
    VC = 0x7,

    /// C set and Z clear (unsigned higher).
    HI = 0x8,

    /// C clear or Z set (unsigned lower or same).
    LS = 0x9,

    /// N equals V (greater or equal).
    GE = 0xA,

    /// N not equal to V (less than).
    LT = 0xB,

    /// Z clear AND (N equals V) (greater than).
    GT = 0xC,

    /// Z set OR (N not equals V) (less than or equal).
    LE = 0xD,

    /// Always.
    AL = 0xE,

    /// Reserved, never satisfied.
    NV = 0xF,
}

impl From<u8> for Condition {
    fn from(item: u8) -> Self {
        match item {
            0x0 => Self::EQ,
            0x1 => Self::NE,
            0x2 => Self::CS,
            0x3 => Self::CC,
            0x4 => Self::MI,
            0x5 => Self::PL,
            0x6 => Self::VS,
            0x7 => Self::VC,
            0x8 => Self::HI,
            0x9 => Self::LS,
            0xA => Self::GE,
            0xB => Self::LT,
            0xC => Self::GT,
            0xD => Self::LE,
            0xE => Self::AL,
            0xF => Self::NV,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EQ => f.write_str("eq"),
            Self::NE => f.write_str("ne"),
            Self::CS => f.write_str("cs"),
            Self::CC => f.write_str("cc"),
            Self::MI => f.write_str("mi"),
            Self::PL => f.write_str("pl"),
            Self::VS => f.write_str("vs"),
            Self::VC => f.write_str("vc"),
            Self::HI => f.write_str("hi"),
            Self::LS => f.write_str("ls"),
            Self::GE => f.write_str("ge"),
            Self::LT => f.write_str("lt"),
            Self::GT => f.write_str("gt"),
            Self::LE => f.write_str("le"),
            Self::AL => Ok(()),
            Self::NV => f.write_str("nv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decode_round_trip() {
        for raw in 0..=0xF_u8 {
            assert_eq!(Condition::from(raw) as u8, raw);
        }
    }

    #[test]
    fn al_renders_empty() {
        assert_eq!(Condition::AL.to_string(), "");
        assert_eq!(Condition::EQ.to_string(), "eq");
        assert_eq!(Condition::LE.to_string(), "le");
    }
}
