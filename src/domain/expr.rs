//! Generic expression tree for strategy text.
//!
//! The parser produces these nodes and the validator consumes them:
//! - `Literal`: int, float, bool, string or `None`
//! - `EnumRef`: an enum member reference such as `Interval.ONE_DAY`
//! - `Name`: a bare identifier; never valid as a value, kept so the validator
//!   can report it instead of failing the parse
//! - `Call`: a constructor call with positional and keyword arguments
//!
//! `Display` renders a node back to canonical text that the parser accepts.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Literal),
    EnumRef { kind: String, member: String },
    Name(String),
    Call {
        name: String,
        args: Vec<Node>,
        kwargs: Vec<(String, Node)>,
    },
}

impl Node {
    pub fn int(value: i64) -> Node {
        Node::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Node {
        Node::Literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Node {
        Node::Literal(Literal::Str(value.into()))
    }

    pub fn enum_ref(kind: &str, member: &str) -> Node {
        Node::EnumRef {
            kind: kind.to_string(),
            member: member.to_string(),
        }
    }

    /// Keyword-only call.
    pub fn call(name: &str, kwargs: Vec<(&str, Node)>) -> Node {
        Node::Call {
            name: name.to_string(),
            args: Vec::new(),
            kwargs: kwargs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Short description used in changelog messages, e.g. `string 'abc'` or `call SMA`.
    pub fn describe(&self) -> String {
        match self {
            Node::Literal(Literal::Int(v)) => format!("int {}", v),
            Node::Literal(Literal::Float(v)) => format!("float {}", render_float(*v)),
            Node::Literal(Literal::Bool(v)) => format!("bool {}", if *v { "True" } else { "False" }),
            Node::Literal(Literal::Str(s)) => format!("string {}", quote(s)),
            Node::Literal(Literal::None) => "None".to_string(),
            Node::EnumRef { kind, member } => format!("enum {}.{}", kind, member),
            Node::Name(name) => format!("name {}", name),
            Node::Call { name, .. } => format!("call {}", name),
        }
    }

    /// Visit this node and every nested node, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        if let Node::Call { args, kwargs, .. } = self {
            for arg in args {
                arg.walk(visit);
            }
            for (_, value) in kwargs {
                value.walk(visit);
            }
        }
    }
}

/// Render a float so that it always reads back as a float.
pub fn render_float(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{}.0", text)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", render_float(*v)),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Str(s) => write!(f, "{}", quote(s)),
            Literal::None => write!(f, "None"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(lit) => write!(f, "{}", lit),
            Node::EnumRef { kind, member } => write!(f, "{}.{}", kind, member),
            Node::Name(name) => write!(f, "{}", name),
            Node::Call { name, args, kwargs } => {
                write!(f, "{}(", name)?;
                let mut first = true;
                for arg in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg)?;
                }
                for (key, value) in kwargs {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, ")")
            }
        }
    }
}
