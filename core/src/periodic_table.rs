use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Closed shell cores usable as shorthand in configuration strings
const NOBLE_GASES: [(&str, &str); 7] = [
    ("[He]", "1s2"),
    ("[Ne]", "[He],2s2,2p6"),
    ("[Ar]", "[Ne],3s2,3p6"),
    ("[Kr]", "[Ar],3d10,4s2,4p6"),
    ("[Xe]", "[Kr],4d10,5s2,5p6"),
    ("[Rn]", "[Xe],4f14,5d10,6s2,6p6"),
    ("[Og]", "[Rn],5f14,6d10,7s2,7p6"),
];

/// A chemical element, identified by its nuclear charge
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ElementRepr", into = "String")]
pub struct ElementType(u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum ElementRepr {
    Z(u32),
    Symbol(String),
}

impl ElementType {
    pub fn from_z(z: u32) -> Option<Self> {
        (1..=SYMBOLS.len() as u32).contains(&z).then_some(Self(z))
    }

    pub fn z(&self) -> u32 {
        self.0
    }

    pub fn symbol(&self) -> &'static str {
        SYMBOLS[self.0 as usize - 1]
    }

    /// An estimate of the most abundant isotope's mass number
    pub fn mass_number(&self) -> u32 {
        let z = self.0 as f64;
        if self.0 == 1 {
            1
        } else {
            (1.867 * z + 0.00707 * z * z).round() as u32
        }
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(z) = trimmed.parse::<u32>() {
            return Self::from_z(z).ok_or_else(|| Error::UnknownElement(s.to_string()));
        }
        SYMBOLS
            .iter()
            .position(|symbol| symbol.eq_ignore_ascii_case(trimmed))
            .map(|i| Self(i as u32 + 1))
            .ok_or_else(|| Error::UnknownElement(s.to_string()))
    }
}

impl TryFrom<ElementRepr> for ElementType {
    type Error = Error;

    fn try_from(value: ElementRepr) -> Result<Self, Self::Error> {
        match value {
            ElementRepr::Z(z) => Self::from_z(z).ok_or_else(|| Error::UnknownElement(z.to_string())),
            ElementRepr::Symbol(symbol) => symbol.parse(),
        }
    }
}

impl From<ElementType> for String {
    fn from(value: ElementType) -> Self {
        value.symbol().to_string()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The expansion of a noble gas shorthand such as "[Ne]", if known
pub fn noble_gas_core(shorthand: &str) -> Option<&'static str> {
    NOBLE_GASES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(shorthand))
        .map(|&(_, config)| config)
}
