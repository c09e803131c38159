//! The query AST data model.
//!
//! `spec.md` §3 describes the wire AST as an untyped nested sequence (`[type_tag, args?, opts?]`).
//! `spec.md` §9 flags the original dynamic-typed walk (per-slot coercions that silently
//! succeed-or-skip) for re-architecture as "a tagged variant (node vs literal) and an explicit
//! pattern match", which is what [`Term`] below is.
use serde_json::Value;

/// Operator type tags this crate gives a name to.
///
/// The AST is otherwise opaque to the gateway (`spec.md` §1): every other `type_tag` is an
/// uninterpreted integer from the document database's own closed enumeration. These two are
/// "significant" per `spec.md` §4.1 and use the RethinkDB QL2 wire protocol's `TermType` values,
/// since that is the document database this gateway fronts.
pub mod type_tag {
    /// Scope a term to a specific database (`r.db("name")`).
    pub const DB: i64 = 14;
    /// A changefeed over a table or selection (`r.table("t").changes()`).
    pub const CHANGES: i64 = 152;
}

/// One node of a query AST, or a literal value carried inside one.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// An operator call: `[type_tag, args?, opts?]`.
    Node(Node),
    /// Anything that is not itself node-shaped: strings, numbers, objects, and arrays that do
    /// not start with an integer type tag.
    Literal(Value),
}

/// An operator call node: `[type_tag, args?, opts?]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// The operator kind. Unrecognised tags are preserved and walked permissively.
    pub type_tag: i64,
    /// Child terms, in order. Missing entirely when the wire node had no `args` slot.
    pub args: Vec<Term>,
    /// The raw `opts` mapping, if present. Not itself an AST and never walked.
    pub opts: Option<Value>,
}

impl Term {
    /// Parse a raw wire value into a [`Term`].
    ///
    /// A value is a [`Node`] iff it is a JSON array of 1 to 3 elements whose first element is an
    /// integer; anything else, including arrays that don't match that shape, is a [`Term::Literal`].
    pub fn parse(value: &Value) -> Term {
        if let Value::Array(items) = value {
            if (1..=3).contains(&items.len()) {
                if let Some(type_tag) = items[0].as_i64() {
                    let args = match items.get(1) {
                        Some(Value::Array(raw_args)) => raw_args.iter().map(Term::parse).collect(),
                        // A present but non-sequence `args` slot, or a missing one, is a leaf.
                        _ => Vec::new(),
                    };
                    let opts = items.get(2).cloned();
                    return Term::Node(Node {
                        type_tag,
                        args,
                        opts,
                    });
                }
            }
        }
        Term::Literal(value.clone())
    }

    /// Borrow this term as a [`Node`], if it is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Node(node) => Some(node),
            Term::Literal(_) => None,
        }
    }

    /// Borrow this term as a string literal, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Term::Literal(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}
