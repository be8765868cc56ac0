//! clause-ast — arbre syntaxique des expressions clause
//!
//! L'arbre est produit par `clause-parser` et consommé par `clause-compiler`.
//! Chaque nœud porte une [`Range`] : celle du premier jeton pour les feuilles,
//! celle du jeton opérateur pour les nœuds binaires.
//!
//! # Features
//! - `serde` : (dé)sérialisation de l'arbre complet
//!
//! # Exemple
//! ```rust
//! use clause_ast::{Literal, LiteralKind, Node, NodeKind};
//! use clause_core::Range;
//!
//! let lit = Node::new(Range::START, NodeKind::Literal(Literal::new(LiteralKind::Number, "42")));
//! assert_eq!(lit.to_string(), "42");
//! ```

#![deny(missing_docs)]

use core::fmt;

pub use clause_core::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Nœuds ─────────────────────────── */

/// Nœud de l'arbre.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// Position dans la source.
    pub range: Range,
    /// Contenu.
    pub kind: NodeKind,
}

/// Variantes de nœud.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// Racine : au plus une expression de tête.
    Program(Vec<Node>),
    /// Référence nommée, `@user.role` ou `x`.
    Identifier(Identifier),
    /// Enveloppe d'un identifiant ou d'un littéral.
    Primitive(Box<Node>),
    /// Littéral brut.
    Literal(Literal),
    /// `==` / `!=`
    Equality(Comparison),
    /// `<` `>` `<=` `>=`
    Comparison(Comparison),
    /// Arithmétique.
    Expression(Expression),
    /// `and`
    Conjunction(Logical),
    /// `or`
    Disjunction(Logical),
}

/// Identifiant, éventuellement externe et pointé.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Identifier {
    /// Introduit par `@` : résolu dans la table statique de la VM.
    pub is_external: bool,
    /// Premier segment.
    pub base: String,
    /// Segments après chaque `.`.
    pub path: Vec<String>,
}

/// Genre de littéral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LiteralKind {
    /// `"texte"`
    String,
    /// `3.14`
    Number,
    /// `true` / `false`
    Boolean,
}

/// Littéral : texte brut, interprété à la compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Literal {
    /// Genre.
    pub kind: LiteralKind,
    /// Texte source (sans guillemets pour les chaînes).
    pub raw: String,
}

impl Literal {
    /// Construit un littéral.
    pub fn new(kind: LiteralKind, raw: impl Into<String>) -> Self { Self { kind, raw: raw.into() } }
}

/// Opérateur arithmétique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `**`
    Pow,
}

impl ArithOp {
    /// Symbole source.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
        }
    }
}

/// Opérateur de comparaison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl CompareOp {
    /// Opérateur depuis son texte source.
    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            _ => return None,
        })
    }

    /// Symbole source.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Vrai pour `==` / `!=`.
    pub const fn is_equality(self) -> bool { matches!(self, Self::Eq | Self::Ne) }
}

/// Opération arithmétique binaire.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Expression {
    /// Opérande gauche.
    pub left: Box<Node>,
    /// Opérande droit.
    pub right: Box<Node>,
    /// Opérateur.
    pub op: ArithOp,
}

/// Comparaison binaire (égalité ou ordre).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Comparison {
    /// Opérande gauche.
    pub left: Box<Node>,
    /// Opérande droit.
    pub right: Box<Node>,
    /// Opérateur.
    pub op: CompareOp,
}

/// `and` / `or`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Logical {
    /// Opérande gauche.
    pub left: Box<Node>,
    /// Opérande droit.
    pub right: Box<Node>,
}

/* ─────────────────────────── Constructeurs ─────────────────────────── */

impl Node {
    /// Construit un nœud.
    pub const fn new(range: Range, kind: NodeKind) -> Self { Self { range, kind } }

    /// Racine vide.
    pub const fn empty_program() -> Self { Self::new(Range::START, NodeKind::Program(Vec::new())) }

    /// Enveloppe `self` dans un `Primitive` à la même position.
    #[must_use]
    pub fn into_primitive(self) -> Self {
        let range = self.range;
        Self::new(range, NodeKind::Primitive(Box::new(self)))
    }

    /// Opération arithmétique.
    pub fn arith(range: Range, op: ArithOp, left: Self, right: Self) -> Self {
        Self::new(range, NodeKind::Expression(Expression { left: Box::new(left), right: Box::new(right), op }))
    }

    /// Comparaison ; `==`/`!=` donnent un nœud `Equality`.
    pub fn compare(range: Range, op: CompareOp, left: Self, right: Self) -> Self {
        let cmp = Comparison { left: Box::new(left), right: Box::new(right), op };
        Self::new(range, if op.is_equality() { NodeKind::Equality(cmp) } else { NodeKind::Comparison(cmp) })
    }

    /// `left and right`
    pub fn and(range: Range, left: Self, right: Self) -> Self {
        Self::new(range, NodeKind::Conjunction(Logical { left: Box::new(left), right: Box::new(right) }))
    }

    /// `left or right`
    pub fn or(range: Range, left: Self, right: Self) -> Self {
        Self::new(range, NodeKind::Disjunction(Logical { left: Box::new(left), right: Box::new(right) }))
    }

    /// Nom de la variante.
    pub const fn name(&self) -> &'static str {
        match self.kind {
            NodeKind::Program(_) => "Program",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::Primitive(_) => "Primitive",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Equality(_) => "Equality",
            NodeKind::Comparison(_) => "Comparison",
            NodeKind::Expression(_) => "Expression",
            NodeKind::Conjunction(_) => "Conjunction",
            NodeKind::Disjunction(_) => "Disjunction",
        }
    }

    /// Enfants directs, de gauche à droite.
    pub fn children(&self) -> Vec<&Self> {
        match &self.kind {
            NodeKind::Program(items) => items.iter().collect(),
            NodeKind::Primitive(inner) => vec![inner.as_ref()],
            NodeKind::Identifier(_) | NodeKind::Literal(_) => Vec::new(),
            NodeKind::Equality(c) | NodeKind::Comparison(c) => vec![c.left.as_ref(), c.right.as_ref()],
            NodeKind::Expression(e) => vec![e.left.as_ref(), e.right.as_ref()],
            NodeKind::Conjunction(l) | NodeKind::Disjunction(l) => vec![l.left.as_ref(), l.right.as_ref()],
        }
    }

    /// Nombre total de nœuds (racine comprise).
    pub fn count(&self) -> usize { 1 + self.children().into_iter().map(Self::count).sum::<usize>() }
}

/* ─────────────────────────── Affichage ─────────────────────────── */

// Forme parenthésée : `(+ 1 (* 2 3))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Program(items) => {
                for (i, n) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{n}")?;
                }
                Ok(())
            }
            NodeKind::Identifier(id) => write!(f, "{id}"),
            NodeKind::Primitive(inner) => write!(f, "{inner}"),
            NodeKind::Literal(lit) => match lit.kind {
                LiteralKind::String => write!(f, "\"{}\"", lit.raw),
                LiteralKind::Number | LiteralKind::Boolean => f.write_str(&lit.raw),
            },
            NodeKind::Equality(c) | NodeKind::Comparison(c) => write!(f, "({} {} {})", c.op.symbol(), c.left, c.right),
            NodeKind::Expression(e) => write!(f, "({} {} {})", e.op.symbol(), e.left, e.right),
            NodeKind::Conjunction(l) => write!(f, "(and {} {})", l.left, l.right),
            NodeKind::Disjunction(l) => write!(f, "(or {} {})", l.left, l.right),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_external {
            f.write_str("@")?;
        }
        f.write_str(&self.base)?;
        for seg in &self.path {
            write!(f, ".{seg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(raw: &str) -> Node { Node::new(Range::START, NodeKind::Literal(Literal::new(LiteralKind::Number, raw))).into_primitive() }

    #[test]
    fn display_is_prefix_form() {
        let user = Node::new(
            Range::new(1, 0, 0),
            NodeKind::Identifier(Identifier { is_external: true, base: "user".into(), path: vec!["role".into(), "name".into()] }),
        )
        .into_primitive();
        let s = Node::new(Range::new(1, 18, 18), NodeKind::Literal(Literal::new(LiteralKind::String, "I"))).into_primitive();
        let tree = Node::compare(
            Range::new(1, 22, 22),
            CompareOp::Eq,
            Node::arith(Range::new(1, 16, 16), ArithOp::Add, user, s),
            Node::new(Range::START, NodeKind::Literal(Literal::new(LiteralKind::String, "HII"))).into_primitive(),
        );
        assert_eq!(tree.to_string(), r#"(== (+ @user.role.name "I") "HII")"#);
        assert_eq!(tree.name(), "Equality");
    }

    #[test]
    fn compare_splits_equality_and_order() {
        let lt = Node::compare(Range::START, CompareOp::Lt, num("1"), num("2"));
        assert!(matches!(lt.kind, NodeKind::Comparison(_)));
        let ne = Node::compare(Range::START, CompareOp::Ne, num("1"), num("2"));
        assert!(matches!(ne.kind, NodeKind::Equality(_)));
        assert_eq!(CompareOp::from_symbol(">="), Some(CompareOp::Ge));
        assert_eq!(CompareOp::from_symbol("=<"), None);
    }

    #[test]
    fn children_and_count() {
        let e = Node::and(Range::START, num("1"), Node::or(Range::START, num("2"), num("3")));
        assert_eq!(e.children().len(), 2);
        // and, or, 3 primitives et 3 littéraux
        assert_eq!(e.count(), 8);
        let root = Node::new(Range::START, NodeKind::Program(vec![e]));
        assert_eq!(root.count(), 9);
        assert_eq!(Node::empty_program().to_string(), "");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let e = Node::arith(Range::new(1, 2, 2), ArithOp::Pow, num("2"), num("3"));
        let json = serde_json::to_string(&e).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
