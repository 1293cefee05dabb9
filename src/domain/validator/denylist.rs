//! Disallowed identifiers. Checked over the whole tree before any schema work.

use crate::domain::expr::Node;

pub const DENYLIST: &[&str] = &[
    "exec",
    "eval",
    "os",
    "sys",
    "import",
    "open",
    "__import__",
    "compile",
    "globals",
    "locals",
    "getattr",
    "setattr",
    "delattr",
    "vars",
    "input",
    "breakpoint",
    "subprocess",
    "builtins",
    "__builtins__",
    "lambda",
];

fn is_denied(identifier: &str) -> bool {
    identifier
        .split('.')
        .any(|segment| segment.starts_with("__") || DENYLIST.contains(&segment))
}

/// First disallowed identifier in the tree, depth first.
pub fn find_disallowed(root: &Node) -> Option<String> {
    let mut found: Option<String> = None;
    root.walk(&mut |node| {
        if found.is_some() {
            return;
        }
        let hit = match node {
            Node::Call { name, kwargs, .. } => {
                if is_denied(name) {
                    Some(name.clone())
                } else {
                    kwargs
                        .iter()
                        .find(|(key, _)| is_denied(key))
                        .map(|(key, _)| key.clone())
                }
            }
            Node::Name(name) => is_denied(name).then(|| name.clone()),
            Node::EnumRef { kind, member } => {
                (is_denied(kind) || is_denied(member)).then(|| format!("{}.{}", kind, member))
            }
            Node::Literal(_) => None,
        };
        found = hit;
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr_parser::parse;

    #[test]
    fn nested_import_call_is_found() {
        let node = parse("Strategy(ticker='AAPL', x=AND(__import__('os')))").unwrap();
        assert_eq!(find_disallowed(&node).as_deref(), Some("__import__"));
    }

    #[test]
    fn dotted_segments_are_checked() {
        let node = parse("Strategy(ticker=os.system('ls'))").unwrap();
        assert_eq!(find_disallowed(&node).as_deref(), Some("os.system"));
        let node = parse("Strategy(ticker=sys.ONE)").unwrap();
        assert_eq!(find_disallowed(&node).as_deref(), Some("sys.ONE"));
    }

    #[test]
    fn bare_names_and_dunder_prefixes() {
        assert!(find_disallowed(&parse("Strategy(x=eval)").unwrap()).is_some());
        assert!(find_disallowed(&parse("Strategy(x=__class__)").unwrap()).is_some());
        assert!(find_disallowed(&parse("Strategy(__dict__=1)").unwrap()).is_some());
    }

    #[test]
    fn string_literals_are_not_identifiers() {
        let node = parse("Strategy(ticker='os', note='eval')").unwrap();
        assert_eq!(find_disallowed(&node), None);
        let node = parse("Strategy(interval=Interval.ONE_DAY)").unwrap();
        assert_eq!(find_disallowed(&node), None);
    }
}
