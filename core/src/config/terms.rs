use std::sync::Arc;

use crate::{
    error::{Error, Result},
    grid::Grid,
    orbital::{l_symbol, Orbital},
    periodic_table::noble_gas_core,
};

const L_LETTERS: &str = "spdfghik";

/// A non-relativistic subshell and its number of electrons, e.g. 3p6
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Term {
    pub n: i32,
    pub l: i32,
    pub num: f64,
}

impl Term {
    fn capacity(&self) -> f64 {
        (4 * self.l + 2) as f64
    }

    /// The relativistic orbitals of the subshell: kappa = -1 for s, otherwise both
    /// kappa = l and kappa = -l-1 with the same occupation fraction.
    pub fn orbitals(&self, grid: &Arc<Grid>) -> Vec<Orbital> {
        let occ = self.num / self.capacity();
        let kappas = if self.l == 0 {
            vec![-1]
        } else {
            vec![self.l, -self.l - 1]
        };
        kappas
            .into_iter()
            .map(|kappa| Orbital::new(self.n, kappa, grid.clone()).with_occupation(occ))
            .collect()
    }
}

fn l_from_letter(c: char) -> Option<i32> {
    L_LETTERS.find(c.to_ascii_lowercase()).map(|l| l as i32)
}

fn parse_term(term: &str, config: &str) -> Result<Term> {
    let invalid = || Error::InvalidTerm {
        term: term.to_string(),
        config: config.to_string(),
    };

    let split = term.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
    let n = term[..split].parse::<i32>().map_err(|_| invalid())?;
    let mut rest = term[split..].chars();
    let l = rest.next().and_then(l_from_letter).ok_or_else(invalid)?;
    let num = rest.as_str().parse::<f64>().map_err(|_| invalid())?;

    if n <= l || !num.is_finite() {
        return Err(invalid());
    }
    Ok(Term { n, l, num })
}

fn expand(config: &str, full: &str, terms: &mut Vec<Term>) -> Result<()> {
    for token in config.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token.starts_with('[') {
            let inner = noble_gas_core(token).ok_or_else(|| Error::InvalidTerm {
                term: token.to_string(),
                config: full.to_string(),
            })?;
            expand(inner, full, terms)?;
            continue;
        }

        let term = parse_term(token, full)?;
        match terms.iter_mut().find(|t| t.n == term.n && t.l == term.l) {
            Some(existing) => existing.num += term.num,
            None => terms.push(term),
        }
    }
    Ok(())
}

/// Parses a core configuration such as "[Ne],3s2,3p6" or "1s2,2s2". Noble gas
/// shorthands are expanded, and repeated subshells are summed, so occupations
/// can be reduced with negative terms ("[Ar],3p-1"). Empty subshells are dropped.
pub fn parse_core(config: &str) -> Result<Vec<Term>> {
    let mut terms = Vec::new();
    expand(config, config, &mut terms)?;

    if let Some(bad) = terms.iter().find(|t| t.num < 0.0 || t.num > t.capacity()) {
        return Err(Error::InvalidTerm {
            term: format!("{}{}{}", bad.n, l_symbol(bad.l), bad.num),
            config: config.to_string(),
        });
    }
    terms.retain(|t| t.num != 0.0);
    Ok(terms)
}

/// Parses a valence list such as "7sp5df": every s and p state up to n = 7 and
/// every d and f state up to n = 5, as (n, kappa), skipping states in `core`.
pub fn parse_valence(config: &str, core: &[Orbital]) -> Result<Vec<(i32, i32)>> {
    let invalid = |term: &str| Error::InvalidTerm {
        term: term.to_string(),
        config: config.to_string(),
    };

    let mut states = Vec::new();
    let mut rest = config.trim();
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let letters = rest[digits..]
            .find(|c: char| c.is_ascii_digit())
            .map_or(rest.len(), |i| i + digits);
        let (group, remainder) = rest.split_at(letters);
        rest = remainder.trim_start();

        let n_max = group[..digits].parse::<i32>().map_err(|_| invalid(group))?;
        if digits == letters {
            return Err(invalid(group));
        }
        for c in group[digits..].chars() {
            let l = l_from_letter(c).ok_or_else(|| invalid(group))?;
            for n in l + 1..=n_max {
                let kappas = if l == 0 { vec![-1] } else { vec![l, -l - 1] };
                for kappa in kappas {
                    let in_core = core.iter().any(|c| c.n() == n && c.kappa() == kappa);
                    if !in_core && !states.contains(&(n, kappa)) {
                        states.push((n, kappa));
                    }
                }
            }
        }
    }
    Ok(states)
}
