//! Database access policy checker.
//!
//! Walks a query AST depth-first looking for two significant operators: a `DB` node, which must
//! name the database this gateway is configured to serve, and a `CHANGES` node, whose presence
//! anywhere in the tree marks the whole query as a changefeed. Every other operator is opaque and
//! traversed permissively so newly introduced operators don't need this checker updated.
use gateway_errors::InvalidDatabase;
use gateway_query::type_tag;
use gateway_query::Term;

/// Outcome of walking a query AST against the configured database name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Whether a `CHANGES` node was found anywhere in the tree.
    pub is_changefeed: bool,
}

/// Validate `term` against `allowed_db`, classifying it as one-shot or changefeed along the way.
///
/// Returns [`InvalidDatabase`] the first time a `DB` node names a database other than
/// `allowed_db`. The traversal does not short-circuit on unrelated nodes: every subtree is
/// visited so that a changefeed nested under several levels of calls is still found.
pub fn check(term: &Term, allowed_db: &str) -> Result<Classification, InvalidDatabase> {
    let mut is_changefeed = false;
    check_inner(term, allowed_db, &mut is_changefeed)?;
    Ok(Classification { is_changefeed })
}

fn check_inner(
    term: &Term,
    allowed_db: &str,
    is_changefeed: &mut bool,
) -> Result<(), InvalidDatabase> {
    let node = match term.as_node() {
        Some(node) => node,
        // Literals carry no operators to check.
        None => return Ok(()),
    };

    if node.type_tag == type_tag::DB {
        if let Some(requested) = node.args.first().and_then(Term::as_str) {
            if requested != allowed_db {
                return Err(InvalidDatabase::new(requested, allowed_db));
            }
        }
    }

    if node.type_tag == type_tag::CHANGES {
        *is_changefeed = true;
        // Continue traversing: a CHANGES node can itself nest further operators.
    }

    for child in &node.args {
        check_inner(child, allowed_db, is_changefeed)?;
    }

    // node.opts is never walked: it is a settings mapping, not a subtree of the query.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_query_against_allowed_database() {
        let term = Term::parse(&json!([type_tag::DB, ["persist"]]));
        let classification = check(&term, "persist").unwrap();
        assert!(!classification.is_changefeed);
    }

    #[test]
    fn rejects_query_against_other_database() {
        let term = Term::parse(&json!([type_tag::DB, ["other"]]));
        let err = check(&term, "persist").unwrap_err();
        assert_eq!(err.requested, "other");
        assert_eq!(err.allowed, "persist");
    }

    #[test]
    fn classifies_nested_changes_as_changefeed() {
        let term = Term::parse(&json!([
            1,
            [[type_tag::DB, ["persist"]], [type_tag::CHANGES, [[2, ["table"]]]]]
        ]));
        let classification = check(&term, "persist").unwrap();
        assert!(classification.is_changefeed);
    }

    #[test]
    fn plain_query_is_not_a_changefeed() {
        let term = Term::parse(&json!([2, ["table"]]));
        let classification = check(&term, "persist").unwrap();
        assert!(!classification.is_changefeed);
    }

    #[test]
    fn unrecognised_operator_still_rejects_bad_db_beneath_it() {
        let term = Term::parse(&json!([9999, [[type_tag::DB, ["other"]]]]));
        let err = check(&term, "persist").unwrap_err();
        assert_eq!(err.requested, "other");
    }

    #[test]
    fn opts_mapping_is_never_walked() {
        // A DB-tagged opts value would reject if walked; it must not be.
        let term = Term::parse(&json!([2, ["table"], [type_tag::DB, ["other"]]]));
        assert!(check(&term, "persist").is_ok());
    }
}
