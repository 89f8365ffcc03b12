use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or unsupported element symbol: '{0}'")]
pub struct ParseElementError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bond order string: '{0}'")]
pub struct ParseBondOrderError(String);

/// Elements that occur in organic reaction corpora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Element {
    H = 1,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    Se = 34,
    Br = 35,
    I = 53,
}

impl Element {
    #[inline]
    pub fn atomic_number(&self) -> u8 {
        *self as u8
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }

    fn valence_electrons(&self) -> i16 {
        match self {
            Element::H => 1,
            Element::B => 3,
            Element::C | Element::Si => 4,
            Element::N | Element::P => 5,
            Element::O | Element::S | Element::Se => 6,
            Element::F | Element::Cl | Element::Br | Element::I => 7,
        }
    }

    /// Default (lowest) valence for the given formal charge.
    ///
    /// Uses the isoelectronic rule: a cation behaves like the element one
    /// group to its left, an anion like the one to its right.
    pub fn default_valence(&self, charge: i8) -> u8 {
        let electrons = self.valence_electrons() - i16::from(charge);
        let valence = if *self == Element::H {
            electrons.min(2 - electrons)
        } else if electrons <= 4 {
            electrons
        } else {
            8 - electrons
        };
        valence.clamp(0, 8) as u8
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(Element::H),
            "B" => Ok(Element::B),
            "C" => Ok(Element::C),
            "N" => Ok(Element::N),
            "O" => Ok(Element::O),
            "F" => Ok(Element::F),
            "Si" => Ok(Element::Si),
            "P" => Ok(Element::P),
            "S" => Ok(Element::S),
            "Cl" => Ok(Element::Cl),
            "Se" => Ok(Element::Se),
            "Br" => Ok(Element::Br),
            "I" => Ok(Element::I),
            _ => Err(ParseElementError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Bond order doubled, so aromatic bonds stay integral.
    #[inline]
    pub fn doubled(&self) -> u16 {
        match self {
            BondOrder::Single => 2,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Aromatic => 3,
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondOrder::Single => write!(f, "Single"),
            BondOrder::Double => write!(f, "Double"),
            BondOrder::Triple => write!(f, "Triple"),
            BondOrder::Aromatic => write!(f, "Aromatic"),
        }
    }
}

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "1" => Ok(BondOrder::Single),
            "double" | "2" => Ok(BondOrder::Double),
            "triple" | "3" => Ok(BondOrder::Triple),
            "aromatic" | "ar" | "4" => Ok(BondOrder::Aromatic),
            _ => Err(ParseBondOrderError(s.to_string())),
        }
    }
}

/// Hybridization perceived from an atom's incident bond orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hybridization {
    Sp3,
    Sp2,
    Sp,
    Aromatic,
}

impl Hybridization {
    pub fn perceive(orders: impl IntoIterator<Item = BondOrder>) -> Self {
        let mut doubles = 0;
        let mut triple = false;
        let mut aromatic = false;
        for order in orders {
            match order {
                BondOrder::Single => {}
                BondOrder::Double => doubles += 1,
                BondOrder::Triple => triple = true,
                BondOrder::Aromatic => aromatic = true,
            }
        }

        if triple || doubles >= 2 {
            Hybridization::Sp
        } else if aromatic {
            Hybridization::Aromatic
        } else if doubles == 1 {
            Hybridization::Sp2
        } else {
            Hybridization::Sp3
        }
    }
}
