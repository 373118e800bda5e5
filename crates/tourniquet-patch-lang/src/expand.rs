//! Lazy expansion of resolved terms into candidate source text.
//!
//! Concretization happens in two phases. Resolution walks the term tree and
//! performs every fact lookup up front, so a missing scope or anchor fails
//! the whole call before any candidate exists. What remains is a [`Node`]
//! tree of plain text alternatives; expanding it is pure string work, done
//! on demand by iterators that can be restarted any number of times.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A stream of candidate strings.
pub type Candidates = Box<dyn Iterator<Item = String> + Send>;

/// A term whose fact lookups are done; only text expansion remains.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// Fixed alternatives: literal text, resolved symbols, anchored statements.
    Leaves(Arc<[String]>),
    /// `{l} {op} {r}` for every pair, lhs-major, operators in the given order.
    Binary {
        lhs: Arc<Node>,
        rhs: Arc<Node>,
        ops: &'static [&'static str],
    },
    /// `{prefix}{x}{suffix}` for every inner alternative.
    Wrap {
        inner: Arc<Node>,
        prefix: &'static str,
        suffix: &'static str,
    },
    /// `if (c) {\nb\n}\n`, cond-major.
    If { cond: Arc<Node>, body: Arc<Node> },
    /// Newline-joined n-way product of the members, each distinct string once.
    List(Arc<[Node]>),
}

impl Node {
    pub(crate) fn leaves(items: Vec<String>) -> Self {
        Node::Leaves(items.into())
    }

    pub(crate) fn iter(&self) -> Candidates {
        match self {
            Node::Leaves(items) => {
                let items = Arc::clone(items);
                Box::new((0..items.len()).map(move |i| items[i].clone()))
            }
            Node::Binary { lhs, rhs, ops } => {
                let ops = *ops;
                Box::new(pairs(lhs, rhs).flat_map(move |(l, r)| {
                    ops.iter().map(move |op| format!("{l} {op} {r}"))
                }))
            }
            Node::Wrap {
                inner,
                prefix,
                suffix,
            } => {
                let (prefix, suffix) = (*prefix, *suffix);
                Box::new(inner.iter().map(move |x| format!("{prefix}{x}{suffix}")))
            }
            Node::If { cond, body } => {
                Box::new(pairs(cond, body).map(|(c, b)| format!("if ({c}) {{\n{b}\n}}\n")))
            }
            Node::List(members) => {
                let mut seen = HashSet::new();
                Box::new(ListProduct::new(Arc::clone(members)).filter(move |s| seen.insert(s.clone())))
            }
        }
    }

    /// Candidates before any deduplication, saturating at `u64::MAX`.
    pub(crate) fn raw_count(&self) -> u64 {
        match self {
            Node::Leaves(items) => items.len() as u64,
            Node::Binary { lhs, rhs, ops } => lhs
                .raw_count()
                .saturating_mul(rhs.raw_count())
                .saturating_mul(ops.len() as u64),
            Node::Wrap { inner, .. } => inner.raw_count(),
            Node::If { cond, body } => cond.raw_count().saturating_mul(body.raw_count()),
            Node::List(members) if members.is_empty() => 0,
            Node::List(members) => members
                .iter()
                .fold(1u64, |acc, member| acc.saturating_mul(member.raw_count())),
        }
    }
}

/// Every `(l, r)` pair, lhs-major. The rhs is re-expanded for each lhs.
fn pairs(lhs: &Node, rhs: &Arc<Node>) -> Box<dyn Iterator<Item = (String, String)> + Send> {
    let rhs = Arc::clone(rhs);
    Box::new(
        lhs.iter()
            .flat_map(move |l| rhs.iter().map(move |r| (l.clone(), r))),
    )
}

enum ProductState {
    Fresh,
    Running,
    Done,
}

/// Odometer over the members of a list: the last member turns fastest.
///
/// Holds one live cursor per member and the string each currently points at,
/// so memory stays proportional to the list length, not the product size.
struct ListProduct {
    members: Arc<[Node]>,
    cursors: Vec<Candidates>,
    current: Vec<String>,
    state: ProductState,
}

impl ListProduct {
    fn new(members: Arc<[Node]>) -> Self {
        let len = members.len();
        Self {
            members,
            cursors: Vec::with_capacity(len),
            current: Vec::with_capacity(len),
            state: ProductState::Fresh,
        }
    }

    /// Restart every member from `start` onwards at its first alternative.
    ///
    /// Returns false when some member has no alternatives at all, or when
    /// there are no members: the empty product yields nothing.
    fn reset_from(&mut self, start: usize) -> bool {
        self.cursors.truncate(start);
        self.current.truncate(start);
        for member in &self.members[start..] {
            let mut cursor = member.iter();
            let Some(first) = cursor.next() else {
                return false;
            };
            self.cursors.push(cursor);
            self.current.push(first);
        }
        !self.members.is_empty()
    }

    fn advance(&mut self) -> bool {
        for i in (0..self.cursors.len()).rev() {
            if let Some(next) = self.cursors[i].next() {
                self.current[i] = next;
                return self.reset_from(i + 1);
            }
        }
        false
    }
}

impl Iterator for ListProduct {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let more = match self.state {
            ProductState::Done => false,
            ProductState::Fresh => self.reset_from(0),
            ProductState::Running => self.advance(),
        };
        if !more {
            self.state = ProductState::Done;
            return None;
        }
        self.state = ProductState::Running;
        Some(self.current.join("\n"))
    }
}

/// The candidate patches of a term at one location.
///
/// All fact lookups already happened when this value was produced; it holds
/// no database handle. Each call to [`iter`](Self::iter) starts an
/// independent enumeration, and consumers that stop early never pay for the
/// rest of the product.
#[derive(Clone)]
pub struct Concretization {
    root: Arc<Node>,
}

impl Concretization {
    pub(crate) fn new(root: Node) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Stream the candidates in their deterministic order.
    pub fn iter(&self) -> Candidates {
        self.root.iter()
    }

    /// Number of candidates before deduplication (saturating).
    ///
    /// For a statement list this is the product of its members' counts; the
    /// number actually streamed is never larger.
    pub fn raw_count(&self) -> u64 {
        self.root.raw_count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl fmt::Debug for Concretization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concretization")
            .field("raw_count", &self.raw_count())
            .finish()
    }
}

impl IntoIterator for Concretization {
    type Item = String;
    type IntoIter = Candidates;

    fn into_iter(self) -> Candidates {
        self.root.iter()
    }
}

impl IntoIterator for &Concretization {
    type Item = String;
    type IntoIter = Candidates;

    fn into_iter(self) -> Candidates {
        self.root.iter()
    }
}
