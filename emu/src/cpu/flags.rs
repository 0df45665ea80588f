//! Small decode-helper enums shared by both instruction sets, each a typed
//! reading of one instruction bit.

/// Transfer width of a single data transfer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReadWriteKind {
    /// Full 32-bit word.
    #[default]
    Word,

    /// Single byte, zero-extended on load.
    Byte,
}

impl From<bool> for ReadWriteKind {
    fn from(byte: bool) -> Self {
        if byte {
            Self::Byte
        } else {
            Self::Word
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStoreKind {
    Store,
    Load,
}

impl From<bool> for LoadStoreKind {
    fn from(load: bool) -> Self {
        match load {
            false => Self::Store,
            true => Self::Load,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    /// Apply the offset after the transfer.
    Post,

    /// Apply the offset before the transfer.
    Pre,
}

impl From<bool> for Indexing {
    fn from(pre: bool) -> Self {
        match pre {
            false => Self::Post,
            true => Self::Pre,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offsetting {
    /// Subtract the offset from the base.
    Down,

    /// Add the offset to the base.
    Up,
}

impl From<bool> for Offsetting {
    fn from(up: bool) -> Self {
        match up {
            false => Self::Down,
            true => Self::Up,
        }
    }
}

/// Whether operand 2 is a rotated immediate or a shifted register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Immediate,
    Register,
}

impl From<bool> for OperandKind {
    fn from(immediate: bool) -> Self {
        match immediate {
            false => Self::Register,
            true => Self::Immediate,
        }
    }
}
