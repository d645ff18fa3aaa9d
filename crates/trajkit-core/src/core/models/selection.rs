//! Atom selection expressions understood by [`MemoryMolecule`](super::molecule::MemoryMolecule).
//!
//! The grammar is a small subset of the selection language of common molecular
//! viewers:
//!
//! ```text
//! expression := clause ("or" clause)*
//! clause     := literal ("and" literal)*
//! literal    := "not"* term
//! term       := "all" | "none" | "hydrogen" | "noh"
//!             | "index" INT+ | "resid" INT+ | "name" WORD+ | "resname" WORD+
//! ```
//!
//! `and` binds tighter than `or`. Parentheses are not supported.

use super::atom::Atom;
use phf::phf_map;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    All,
    None,
    Hydrogen,
    NoHydrogen,
    Index,
    Resid,
    Name,
    Resname,
    Not,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "all" => Keyword::All,
    "none" => Keyword::None,
    "hydrogen" => Keyword::Hydrogen,
    "noh" => Keyword::NoHydrogen,
    "index" => Keyword::Index,
    "resid" => Keyword::Resid,
    "name" => Keyword::Name,
    "resname" => Keyword::Resname,
    "not" => Keyword::Not,
};

const AND: &str = "and";
const OR: &str = "or";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("expression is empty")]
    Empty,
    #[error("unknown keyword '{0}'")]
    UnknownKeyword(String),
    #[error("keyword '{0}' requires at least one value")]
    MissingValue(&'static str),
    #[error("invalid value '{value}' for keyword '{keyword}'")]
    InvalidValue { keyword: &'static str, value: String },
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("expression ends with an operator")]
    TrailingOperator,
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    All,
    None,
    Hydrogen,
    NoHydrogen,
    Index(Vec<usize>),
    Resid(Vec<isize>),
    Name(Vec<String>),
    Resname(Vec<String>),
}

impl Term {
    fn matches(&self, index: usize, atom: &Atom) -> bool {
        match self {
            Term::All => true,
            Term::None => false,
            Term::Hydrogen => atom.is_hydrogen(),
            Term::NoHydrogen => !atom.is_hydrogen(),
            Term::Index(values) => values.contains(&index),
            Term::Resid(values) => values.contains(&atom.resid),
            Term::Name(values) => values.iter().any(|v| *v == atom.name),
            Term::Resname(values) => values.iter().any(|v| *v == atom.resname),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Literal {
    negated: bool,
    term: Term,
}

/// A parsed selection expression in disjunctive normal form.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    clauses: Vec<Vec<Literal>>,
}

impl Selection {
    pub fn parse(expression: &str) -> Result<Self, SelectionError> {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(SelectionError::Empty);
        }

        let mut clauses = Vec::new();
        let mut current: Vec<Literal> = Vec::new();
        let mut expect_term = true;
        let mut negated = false;
        let mut pos = 0;

        while pos < tokens.len() {
            let token = tokens[pos];
            pos += 1;

            if token == AND || token == OR {
                if expect_term {
                    return Err(SelectionError::UnexpectedToken(token.to_string()));
                }
                if token == OR {
                    clauses.push(std::mem::take(&mut current));
                }
                expect_term = true;
                continue;
            }

            if !expect_term {
                return Err(SelectionError::UnexpectedToken(token.to_string()));
            }

            let keyword = KEYWORDS
                .get(token)
                .copied()
                .ok_or_else(|| SelectionError::UnknownKeyword(token.to_string()))?;

            let term = match keyword {
                Keyword::Not => {
                    negated = !negated;
                    continue;
                }
                Keyword::All => Term::All,
                Keyword::None => Term::None,
                Keyword::Hydrogen => Term::Hydrogen,
                Keyword::NoHydrogen => Term::NoHydrogen,
                Keyword::Index => Term::Index(parse_values("index", &tokens, &mut pos)?),
                Keyword::Resid => Term::Resid(parse_values("resid", &tokens, &mut pos)?),
                Keyword::Name => Term::Name(parse_values("name", &tokens, &mut pos)?),
                Keyword::Resname => Term::Resname(parse_values("resname", &tokens, &mut pos)?),
            };

            current.push(Literal { negated, term });
            negated = false;
            expect_term = false;
        }

        if expect_term {
            return Err(SelectionError::TrailingOperator);
        }
        clauses.push(current);
        Ok(Self { clauses })
    }

    /// Returns `true` if the atom at `index` is part of the selection.
    pub fn matches(&self, index: usize, atom: &Atom) -> bool {
        self.clauses.iter().any(|clause| {
            clause
                .iter()
                .all(|literal| literal.term.matches(index, atom) != literal.negated)
        })
    }

    /// Returns the indices of all matching atoms in topology order.
    pub fn resolve(&self, atoms: &[Atom]) -> Vec<usize> {
        atoms
            .iter()
            .enumerate()
            .filter(|(index, atom)| self.matches(*index, atom))
            .map(|(index, _)| index)
            .collect()
    }
}

fn parse_values<T: std::str::FromStr>(
    keyword: &'static str,
    tokens: &[&str],
    pos: &mut usize,
) -> Result<Vec<T>, SelectionError> {
    let mut values = Vec::new();
    while let Some(&token) = tokens.get(*pos) {
        if token == AND || token == OR {
            break;
        }
        let value = token.parse().map_err(|_| SelectionError::InvalidValue {
            keyword,
            value: token.to_string(),
        })?;
        values.push(value);
        *pos += 1;
    }
    if values.is_empty() {
        return Err(SelectionError::MissingValue(keyword));
    }
    Ok(values)
}
