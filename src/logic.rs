use std::ops::Index;

use itertools::Itertools;
use varisat::Lit;

/// No two of `lits` are true; `(!A + !B) * (!A + !C) * ...`
pub(crate) fn at_most_one(lits: &[Lit]) -> Vec<Vec<Lit>> {
    lits.iter()
        .combinations(2)
        .map(|pair| vec![!**pair.index(0), !**pair.index(1)])
        .collect_vec()
}

pub(crate) fn exactly_one(lits: Vec<Lit>) -> Vec<Vec<Lit>> {
    let mut clauses = Vec::with_capacity(lits.len() * (lits.len() + 1) / 2 + 1);

    clauses.extend(at_most_one(&lits));
    // at least one is true; A + B + C + ...
    clauses.push(lits);

    clauses
}

/// No three of `lits` are true at once.
pub(crate) fn at_most_two(lits: &[Lit]) -> Vec<Vec<Lit>> {
    lits.iter()
        .combinations(3)
        .map(|selection| selection.into_iter().map(|lit| !*lit).collect_vec())
        .collect_vec()
}

/// `premise => any of conclusions`, as the single clause `!P + C_1 + C_2 + ...`
pub(crate) fn implies_any(premise: Lit, conclusions: impl IntoIterator<Item = Lit>) -> Vec<Lit> {
    let mut clause = vec![!premise];
    clause.extend(conclusions);
    clause
}
