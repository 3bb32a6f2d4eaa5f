// Copyright (c) 2026 rezky_nightky

//! Packed matrix cell.
//!
//! Layout of the 16 bits, high to low:
//!
//! ```text
//!  15        10 9   8 7             0
//! +------------+-----+---------------+
//! |    TAIL    | ROLE|     ASCII     |
//! +------------+-----+---------------+
//! ```
//!
//! `TAIL` is the declared tail length on a drop and the ramp index on a tail
//! cell. Out of range values are masked, never rejected.

use rand::Rng;

const ASCII_MASK: u16 = 0x00FF;
const ROLE_MASK: u16 = 0x0300;
const TAIL_MASK: u16 = 0xFC00;

const ROLE_SHIFT: u16 = 8;
const TAIL_SHIFT: u16 = 10;

pub const ASCII_MIN: u8 = 32;
pub const ASCII_MAX: u8 = 126;
pub const ASCII_SPAN: u8 = ASCII_MAX - ASCII_MIN + 1;

pub const TAIL_MIN: u8 = 8;
pub const TAIL_MAX: u8 = 63;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    #[default]
    None = 0,
    Drop = 1,
    Tail = 2,
}

impl Role {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Role::Drop,
            2 => Role::Tail,
            _ => Role::None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell(u16);

impl Cell {
    pub const fn new(ascii: u8, role: Role, tail: u8) -> Self {
        let tail = ((tail as u16) << TAIL_SHIFT) & TAIL_MASK;
        let role = ((role as u16) << ROLE_SHIFT) & ROLE_MASK;
        Self(tail | role | (ascii as u16 & ASCII_MASK))
    }

    pub fn decode(self) -> (u8, Role, u8) {
        (self.ascii(), self.role(), self.tail())
    }

    pub const fn ascii(self) -> u8 {
        (self.0 & ASCII_MASK) as u8
    }

    pub fn role(self) -> Role {
        Role::from_bits(((self.0 & ROLE_MASK) >> ROLE_SHIFT) as u8)
    }

    pub const fn tail(self) -> u8 {
        ((self.0 & TAIL_MASK) >> TAIL_SHIFT) as u8
    }

    pub fn is_drop(self) -> bool {
        self.role() == Role::Drop
    }

    /// Same character, new role. A `None` role always zeroes the tail field.
    pub fn with_role(self, role: Role, tail: u8) -> Self {
        let tail = if role == Role::None { 0 } else { tail };
        Self::new(self.ascii(), role, tail)
    }

    pub fn with_ascii(self, ascii: u8) -> Self {
        Self::new(ascii, self.role(), self.tail())
    }

    pub fn cleared(self) -> Self {
        self.with_role(Role::None, 0)
    }
}

pub fn random_ascii<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(ASCII_MIN..=ASCII_MAX)
}

/// A printable character guaranteed to differ from `old`.
pub fn random_ascii_other<R: Rng + ?Sized>(rng: &mut R, old: u8) -> u8 {
    let base = old.saturating_sub(ASCII_MIN) % ASCII_SPAN;
    let shift = rng.random_range(1..ASCII_SPAN);
    ASCII_MIN + (base + shift) % ASCII_SPAN
}
