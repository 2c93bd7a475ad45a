//! XML canonicalization (C14N) over a parsed roxmltree document.
//!
//! Supported methods:
//!
//! - Canonical XML 1.0 and 1.1 (inclusive), with or without comments
//! - Exclusive XML Canonicalization 1.0, with or without comments, honouring
//!   an `InclusiveNamespaces` prefix list
//!
//! The input is either a whole document or an element subtree, optionally
//! with one subtree removed (the enveloped-signature transform).
//!
//! Prefixes are taken from the source text: roxmltree resolves names to
//! namespace URIs, but canonical output must keep the prefixes the author
//! wrote.

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::{Node, NodeId};

use crate::error::{Result, SignatureError};
use crate::ns::{self, alg};

/// Canonicalization flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum C14nKind {
    /// Canonical XML 1.0.
    Inclusive10,
    /// Canonical XML 1.1.
    Inclusive11,
    /// Exclusive XML Canonicalization 1.0.
    Exclusive,
}

/// A fully parameterised canonicalization method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Canonicalization {
    pub kind: C14nKind,
    pub with_comments: bool,
    /// Prefixes treated inclusively by exclusive C14N (`#default` for the
    /// default namespace).
    pub inclusive_prefixes: Vec<String>,
}

impl Canonicalization {
    /// Canonical XML 1.0 without comments.
    pub fn inclusive() -> Self {
        Self {
            kind: C14nKind::Inclusive10,
            with_comments: false,
            inclusive_prefixes: Vec::new(),
        }
    }

    /// Exclusive C14N without comments.
    pub fn exclusive() -> Self {
        Self {
            kind: C14nKind::Exclusive,
            with_comments: false,
            inclusive_prefixes: Vec::new(),
        }
    }

    /// Build from an algorithm URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let (kind, with_comments) = match uri {
            alg::C14N => (C14nKind::Inclusive10, false),
            alg::C14N_WITH_COMMENTS => (C14nKind::Inclusive10, true),
            alg::C14N11 => (C14nKind::Inclusive11, false),
            alg::C14N11_WITH_COMMENTS => (C14nKind::Inclusive11, true),
            alg::EXC_C14N => (C14nKind::Exclusive, false),
            alg::EXC_C14N_WITH_COMMENTS => (C14nKind::Exclusive, true),
            other => return Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
        };
        Ok(Self {
            kind,
            with_comments,
            inclusive_prefixes: Vec::new(),
        })
    }

    /// Build from a `CanonicalizationMethod` or `Transform` element.
    ///
    /// Reads the `Algorithm` attribute and, for exclusive C14N, the
    /// `InclusiveNamespaces/@PrefixList` child.
    pub fn from_element(element: Node<'_, '_>) -> Result<Self> {
        let uri = element.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
            SignatureError::Malformed(format!(
                "{} without Algorithm",
                element.tag_name().name()
            ))
        })?;
        let mut method = Self::from_uri(uri)?;

        if method.kind == C14nKind::Exclusive {
            let prefix_list = element
                .children()
                .find(|c| c.has_tag_name((ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)))
                .and_then(|c| c.attribute(ns::attr::PREFIX_LIST));
            if let Some(list) = prefix_list {
                method.inclusive_prefixes = list.split_whitespace().map(str::to_string).collect();
            }
        }

        Ok(method)
    }

    /// The algorithm URI of this method.
    pub fn uri(&self) -> &'static str {
        match (self.kind, self.with_comments) {
            (C14nKind::Inclusive10, false) => alg::C14N,
            (C14nKind::Inclusive10, true) => alg::C14N_WITH_COMMENTS,
            (C14nKind::Inclusive11, false) => alg::C14N11,
            (C14nKind::Inclusive11, true) => alg::C14N11_WITH_COMMENTS,
            (C14nKind::Exclusive, false) => alg::EXC_C14N,
            (C14nKind::Exclusive, true) => alg::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Whether `uri` names a canonicalization method.
    pub fn is_c14n_uri(uri: &str) -> bool {
        Self::from_uri(uri).is_ok()
    }
}

impl Default for Canonicalization {
    fn default() -> Self {
        Self::inclusive()
    }
}

/// Canonicalize `node` (the document root or an element).
///
/// `exclude` removes one subtree from the output.
pub fn canonicalize(node: Node<'_, '_>, method: &Canonicalization, exclude: Option<NodeId>) -> String {
    let mut writer = Writer {
        out: String::new(),
        method,
        exclude,
    };

    if node.is_root() {
        writer.write_document(node);
    } else {
        writer.write_apex(node);
    }

    writer.out
}

/// Prefix to URI map of namespace declarations in effect in the output.
/// The default namespace uses the empty prefix.
type NsMap = BTreeMap<String, String>;

struct Writer<'m> {
    out: String,
    method: &'m Canonicalization,
    exclude: Option<NodeId>,
}

struct Attr {
    namespace: String,
    local: String,
    qname: String,
    value: String,
}

impl Writer<'_> {
    fn write_document(&mut self, root: Node<'_, '_>) {
        let mut seen_element = false;
        for child in root.children() {
            if Some(child.id()) == self.exclude {
                continue;
            }
            if child.is_element() {
                self.write_element(child, &NsMap::new(), Vec::new());
                seen_element = true;
            } else if child.is_pi() || (child.is_comment() && self.method.with_comments) {
                if seen_element {
                    self.out.push('\n');
                }
                self.write_leaf(child);
                if !seen_element {
                    self.out.push('\n');
                }
            }
        }
    }

    fn write_apex(&mut self, element: Node<'_, '_>) {
        if Some(element.id()) == self.exclude {
            return;
        }
        let inherited = self.inherited_xml_attributes(element);
        self.write_element(element, &NsMap::new(), inherited);
    }

    fn write_node(&mut self, node: Node<'_, '_>, rendered: &NsMap) {
        if Some(node.id()) == self.exclude {
            return;
        }
        if node.is_element() {
            self.write_element(node, rendered, Vec::new());
        } else {
            self.write_leaf(node);
        }
    }

    fn write_leaf(&mut self, node: Node<'_, '_>) {
        if node.is_text() {
            escape_text(node.text().unwrap_or_default(), &mut self.out);
        } else if node.is_comment() {
            if self.method.with_comments {
                self.out.push_str("<!--");
                self.out.push_str(node.text().unwrap_or_default());
                self.out.push_str("-->");
            }
        } else if let Some(pi) = node.pi() {
            self.out.push_str("<?");
            self.out.push_str(pi.target);
            if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                self.out.push(' ');
                self.out.push_str(value);
            }
            self.out.push_str("?>");
        }
    }

    fn write_element(&mut self, element: Node<'_, '_>, rendered: &NsMap, extra_attrs: Vec<Attr>) {
        let qname = element_qname(element);
        let (declarations, next) = match self.method.kind {
            C14nKind::Exclusive => self.exclusive_namespaces(element, rendered),
            C14nKind::Inclusive10 | C14nKind::Inclusive11 => inclusive_namespaces(element, rendered),
        };

        self.out.push('<');
        self.out.push_str(qname);

        for (prefix, uri) in &declarations {
            if prefix.is_empty() {
                self.out.push_str(" xmlns=\"");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(prefix);
                self.out.push_str("=\"");
            }
            escape_attribute(uri, &mut self.out);
            self.out.push('"');
        }

        let mut attrs = element_attributes(element);
        attrs.extend(extra_attrs);
        attrs.sort_by(|a, b| (&a.namespace, &a.local).cmp(&(&b.namespace, &b.local)));
        for attr in &attrs {
            self.out.push(' ');
            self.out.push_str(&attr.qname);
            self.out.push_str("=\"");
            escape_attribute(&attr.value, &mut self.out);
            self.out.push('"');
        }
        self.out.push('>');

        for child in element.children() {
            self.write_node(child, &next);
        }

        self.out.push_str("</");
        self.out.push_str(qname);
        self.out.push('>');
    }

    fn exclusive_namespaces(&self, element: Node<'_, '_>, rendered: &NsMap) -> (Vec<(String, String)>, NsMap) {
        let mut utilized = BTreeSet::new();
        utilized.insert(prefix_of(element_qname(element)).to_string());
        for attr in element.attributes() {
            let prefix = prefix_of(attr_qname(element, &attr));
            if !prefix.is_empty() {
                utilized.insert(prefix.to_string());
            }
        }
        for prefix in &self.method.inclusive_prefixes {
            if prefix == "#default" {
                utilized.insert(String::new());
            } else {
                utilized.insert(prefix.clone());
            }
        }

        let in_scope = in_scope_namespaces(element);
        let mut declarations = Vec::new();
        let mut next = rendered.clone();

        for prefix in utilized {
            if prefix == "xml" {
                continue;
            }
            let uri = match in_scope.get(&prefix) {
                Some(uri) => uri.clone(),
                None if prefix.is_empty() => String::new(),
                None => continue,
            };
            if uri.is_empty() {
                if prefix.is_empty() && rendered.get("").is_some_and(|u| !u.is_empty()) {
                    declarations.push((String::new(), String::new()));
                    next.insert(String::new(), String::new());
                }
                continue;
            }
            if rendered.get(&prefix) != Some(&uri) {
                declarations.push((prefix.clone(), uri.clone()));
                next.insert(prefix, uri);
            }
        }

        (declarations, next)
    }

    fn inherited_xml_attributes(&self, element: Node<'_, '_>) -> Vec<Attr> {
        let inheritable: fn(&str) -> bool = match self.method.kind {
            C14nKind::Exclusive => return Vec::new(),
            C14nKind::Inclusive10 => |_| true,
            C14nKind::Inclusive11 => |local| local == "lang" || local == "space",
        };

        let mut present: BTreeSet<String> = element
            .attributes()
            .filter(|a| a.namespace() == Some(ns::XML))
            .map(|a| a.name().to_string())
            .collect();

        let mut inherited = Vec::new();
        for ancestor in element.ancestors().skip(1).filter(|n| n.is_element()) {
            for attr in ancestor.attributes() {
                if attr.namespace() != Some(ns::XML) || !inheritable(attr.name()) {
                    continue;
                }
                if present.insert(attr.name().to_string()) {
                    inherited.push(Attr {
                        namespace: ns::XML.to_string(),
                        local: attr.name().to_string(),
                        qname: attr_qname(ancestor, &attr).to_string(),
                        value: attr.value().to_string(),
                    });
                }
            }
        }
        inherited
    }
}

fn inclusive_namespaces(element: Node<'_, '_>, rendered: &NsMap) -> (Vec<(String, String)>, NsMap) {
    let mut declarations = Vec::new();
    let mut next = rendered.clone();

    for (prefix, uri) in in_scope_namespaces(element) {
        if uri.is_empty() {
            if prefix.is_empty() && rendered.get("").is_some_and(|u| !u.is_empty()) {
                declarations.push((String::new(), String::new()));
                next.insert(String::new(), String::new());
            }
            continue;
        }
        if rendered.get(&prefix) != Some(&uri) {
            declarations.push((prefix.clone(), uri.clone()));
            next.insert(prefix, uri);
        }
    }

    (declarations, next)
}

/// In-scope namespaces of an element, keyed by prefix (empty for default).
/// Sorted so the default namespace comes first, then by prefix.
fn in_scope_namespaces(element: Node<'_, '_>) -> NsMap {
    element
        .namespaces()
        .map(|ns| (ns.name().unwrap_or_default().to_string(), ns.uri().to_string()))
        .collect()
}

fn element_attributes(element: Node<'_, '_>) -> Vec<Attr> {
    element
        .attributes()
        .map(|attr| Attr {
            namespace: attr.namespace().unwrap_or_default().to_string(),
            local: attr.name().to_string(),
            qname: attr_qname(element, &attr).to_string(),
            value: attr.value().to_string(),
        })
        .collect()
}

/// Qualified element name as written in the source.
fn element_qname<'i>(element: Node<'_, 'i>) -> &'i str {
    let text = element.document().input_text();
    let start = element.range().start + 1;
    let rest = text.get(start..).unwrap_or_default();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Qualified attribute name as written in the source.
fn attr_qname<'i>(element: Node<'_, 'i>, attr: &roxmltree::Attribute<'_, 'i>) -> &'i str {
    element
        .document()
        .input_text()
        .get(attr.range_qname())
        .unwrap_or(attr.name())
}

fn prefix_of(qname: &str) -> &str {
    qname.split_once(':').map(|(p, _)| p).unwrap_or("")
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}
