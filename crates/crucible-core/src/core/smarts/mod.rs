//! SMARTS-subset pattern parsing and local substructure matching.
//!
//! Rule files describe the chemical environment of an atom type with a
//! SMARTS-like expression, e.g. `[C;X4](C)(H)(H)H` for a methyl carbon.
//! The subset supported here covers what forcefield definitions use in
//! practice: element symbols, `*` wildcards, bracket expressions with
//! `#n` (atomic number), `Xn` (degree), `Hn` (bonded hydrogen count),
//! logical `!`, `;`/`&` (AND) and `,` (OR), and parenthesized neighbor
//! branches. A pattern is a rooted tree: the root constrains the candidate
//! atom, each subtree constrains one distinct bonded neighbor.
//!
//! Matching is local (it never looks further than the pattern is deep),
//! deterministic, and side-effect-free. A successful match reports a
//! specificity score: the number of satisfied non-wildcard primitives over
//! the whole tree.

mod parser;

pub use parser::SmartsParseError;

use crate::core::elements;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;

/// A primitive atom constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomPrimitive {
    /// `*` — matches any atom, contributes no specificity.
    Wildcard,
    /// An element symbol, including underscore-prefixed custom elements.
    Element(String),
    /// `#n` — match by atomic number.
    AtomicNum(u8),
    /// `Xn` — match by graph degree (bonded neighbor count).
    Degree(u8),
    /// `Hn` — match by bonded hydrogen count.
    HCount(u8),
}

/// A logical expression over primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    Prim(AtomPrimitive),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

/// One node of the rooted pattern tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternNode {
    pub expr: AtomExpr,
    pub children: Vec<PatternNode>,
}

/// A compiled chemical-substructure pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartsPattern {
    raw: String,
    root: PatternNode,
}

impl SmartsPattern {
    /// Compiles a pattern from its textual form.
    pub fn parse(input: &str) -> Result<Self, SmartsParseError> {
        let root = parser::parse(input)?;
        Ok(Self {
            raw: input.to_string(),
            root,
        })
    }

    /// The original textual form of the pattern.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluates this pattern against `atom_id` and its neighborhood.
    ///
    /// # Return
    ///
    /// `None` if the atom does not match; otherwise the specificity score
    /// (count of satisfied non-wildcard primitives).
    pub fn matches(&self, system: &MolecularSystem, atom_id: AtomId) -> Option<u32> {
        match_node(system, &self.root, atom_id, None)
    }
}

fn match_node(
    system: &MolecularSystem,
    node: &PatternNode,
    atom_id: AtomId,
    parent: Option<AtomId>,
) -> Option<u32> {
    let own = eval_expr(system, &node.expr, atom_id)?;
    if node.children.is_empty() {
        return Some(own);
    }

    let neighbors: Vec<AtomId> = system
        .get_bonded_neighbors(atom_id)?
        .iter()
        .copied()
        .filter(|&n| Some(n) != parent)
        .collect();
    if node.children.len() > neighbors.len() {
        return None;
    }

    let mut used = vec![false; neighbors.len()];
    assign_children(system, node, atom_id, &neighbors, &mut used, 0).map(|sub| own + sub)
}

/// Backtracking injective assignment of child subtrees to distinct
/// neighbors, in adjacency order. Returns the summed child specificity of
/// the first complete assignment.
fn assign_children(
    system: &MolecularSystem,
    node: &PatternNode,
    atom_id: AtomId,
    neighbors: &[AtomId],
    used: &mut [bool],
    child_idx: usize,
) -> Option<u32> {
    if child_idx == node.children.len() {
        return Some(0);
    }
    for (i, &neighbor) in neighbors.iter().enumerate() {
        if used[i] {
            continue;
        }
        if let Some(score) = match_node(system, &node.children[child_idx], neighbor, Some(atom_id))
        {
            used[i] = true;
            if let Some(rest) = assign_children(system, node, atom_id, neighbors, used, child_idx + 1)
            {
                return Some(score + rest);
            }
            used[i] = false;
        }
    }
    None
}

fn eval_expr(system: &MolecularSystem, expr: &AtomExpr, atom_id: AtomId) -> Option<u32> {
    match expr {
        AtomExpr::Prim(prim) => eval_prim(system, prim, atom_id),
        AtomExpr::And(exprs) => {
            let mut total = 0;
            for e in exprs {
                total += eval_expr(system, e, atom_id)?;
            }
            Some(total)
        }
        AtomExpr::Or(exprs) => exprs.iter().find_map(|e| eval_expr(system, e, atom_id)),
        AtomExpr::Not(inner) => match eval_expr(system, inner, atom_id) {
            // A satisfied negation is itself an explicit constraint.
            None => Some(1),
            Some(_) => None,
        },
    }
}

fn eval_prim(system: &MolecularSystem, prim: &AtomPrimitive, atom_id: AtomId) -> Option<u32> {
    let atom = system.atom(atom_id)?;
    let satisfied = match prim {
        AtomPrimitive::Wildcard => return Some(0),
        AtomPrimitive::Element(symbol) => atom.element == *symbol,
        AtomPrimitive::AtomicNum(n) => elements::atomic_number(&atom.element) == Some(*n),
        AtomPrimitive::Degree(d) => system.degree(atom_id) == *d as usize,
        AtomPrimitive::HCount(h) => system.bonded_hydrogen_count(atom_id) == *h as usize,
    };
    if satisfied { Some(1) } else { None }
}
