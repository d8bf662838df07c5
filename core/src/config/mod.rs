pub use atom::ConfigAtom;
pub use terms::{parse_core, parse_valence, Term};

mod atom;
mod terms;
