//! Structured, schema-free form of a decoded instance
//!
//! A [`Document`] is a flat list of nodes. The root structure comes first, out of line arrays
//! follow in the order they were reached and are linked from members through
//! [`Value::Reference`].

use derive_more::derive::{Deref, IntoIterator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Render an array id the way members refer to it
pub fn reference_token(id: u64) -> String {
    format!("#{}", id)
}

/// Decoded nodes in emission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Document {
    #[into_iterator(owned, ref)]
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(nodes: Vec<Node>) -> Self {
        Document { nodes }
    }

    /// The first structure of the document
    pub fn root(&self) -> Option<&StructNode> {
        self.nodes.iter().find_map(|node| match node {
            Node::Struct(s) => Some(s),
            Node::Array(_) => None,
        })
    }

    /// The out of line array tagged with `id`
    pub fn array(&self, id: u64) -> Option<&ArrayNode> {
        self.nodes.iter().find_map(|node| match node {
            Node::Array(a) if a.id == Some(id) => Some(a),
            _ => None,
        })
    }

    /// The top level structure tagged with `id`
    pub fn struct_node(&self, id: u64) -> Option<&StructNode> {
        self.nodes.iter().find_map(|node| match node {
            Node::Struct(s) if s.id == Some(id) => Some(s),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "node", rename_all = "snake_case"))]
pub enum Node {
    Struct(StructNode),
    Array(ArrayNode),
}

/// A structure with its members in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StructNode {
    /// Name of the type definition, informational only
    pub type_name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    /// Set on queued structures, inline structures have none
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub id: Option<u64>,
    pub members: Vec<MemberNode>,
}

impl StructNode {
    /// Find a member by name
    pub fn member(&self, name: &str) -> Option<&MemberNode> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemberNode {
    pub name: String,
    pub value: Value,
}

impl MemberNode {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        MemberNode {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Value {
    /// Number, string or resolved string hash as text
    Scalar(String),
    /// Structure stored in place
    Struct(StructNode),
    /// Id of an out of line [`ArrayNode`]
    Reference(u64),
    /// Fixed length array stored in place
    Array(ArrayNode),
}

impl Value {
    pub fn scalar(text: impl Into<String>) -> Self {
        Value::Scalar(text.into())
    }

    /// Text of a scalar, or the `#<id>` token of a reference
    pub fn text(&self) -> Option<String> {
        match self {
            Value::Scalar(text) => Some(text.clone()),
            Value::Reference(id) => Some(reference_token(*id)),
            Value::Struct(_) | Value::Array(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayNode {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub id: Option<u64>,
    pub items: ArrayItems,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArrayItems {
    Scalars(Vec<String>),
    Structs(Vec<StructNode>),
}

impl ArrayItems {
    pub fn len(&self) -> usize {
        match self {
            ArrayItems::Scalars(items) => items.len(),
            ArrayItems::Structs(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalars joined by a single space, `None` for structures
    pub fn text(&self) -> Option<String> {
        match self {
            ArrayItems::Scalars(items) => Some(items.join(" ")),
            ArrayItems::Structs(_) => None,
        }
    }
}
