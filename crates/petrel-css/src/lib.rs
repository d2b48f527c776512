//! # Petrel CSS
//!
//! Selector matching and cascade resolution for the Petrel pipeline.
//!
//! The cascade here runs *incrementally*: every element is resolved exactly
//! once, at creation time, against the rules registered so far. A rule
//! registered later never retroactively restyles an element, which is why
//! each computed value remembers the specificity that won it — a challenger
//! only has to beat that number, never re-scan the rule list.
//!
//! Selectors are space-separated descendant chains of simple atoms: a tag
//! name, `#id`, or `.class`. Anything fancier simply never matches.

use std::collections::HashMap;

use tracing::debug;

pub use petrel_cssparser::{Declaration, Rule, Stylesheet};

/// Selector specificity: `(inline, ids, classes, tags)`, compared
/// lexicographically.
///
/// The inline component is carried for shape but is always zero — inline
/// `style` attributes are not part of the cascade this engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u32, pub u32, pub u32, pub u32);

impl Specificity {
    /// Compute the specificity of a full selector string by counting its
    /// space-separated atoms.
    pub fn of_selector(selector: &str) -> Self {
        let mut specificity = Specificity::default();
        for atom in selector.split(' ') {
            if atom.is_empty() {
                continue;
            }
            match atom.as_bytes()[0] {
                b'#' => specificity.1 += 1,
                b'.' => specificity.2 += 1,
                _ => specificity.3 += 1,
            }
        }
        specificity
    }
}

/// Append-only store of the rules registered so far in a parse session.
///
/// Rules are never removed or mutated after insertion; the order of
/// registration is the order of application.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every rule of a parsed stylesheet.
    pub fn add_stylesheet(&mut self, sheet: Stylesheet) {
        debug!(added = sheet.rules.len(), total = self.rules.len() + sheet.rules.len(), "registering CSS rules");
        self.rules.extend(sheet.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

/// The slice of an element the matcher looks at.
///
/// A non-element node (the document root) is represented with every field
/// `None`, so it can sit in an ancestor chain without ever matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleTarget<'a> {
    pub tag_name: Option<&'a str>,
    pub id: Option<&'a str>,
    pub class: Option<&'a str>,
}

/// One resolved property value together with the specificity that won it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedValue {
    pub value: String,
    pub specificity: Specificity,
}

/// Cascaded style of one element: property name to winning value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    properties: HashMap<String, AppliedValue>,
}

impl ComputedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Winning value for a property, if any rule declared it.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(|v| v.value.as_str())
    }

    /// The full applied entry, including the winning specificity.
    pub fn applied(&self, property: &str) -> Option<&AppliedValue> {
        self.properties.get(property)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Offer a value for a property. The challenger wins only when the
    /// property is unset or its specificity strictly exceeds the stored
    /// winner; ties keep the incumbent.
    pub fn apply(&mut self, property: &str, value: &str, specificity: Specificity) {
        match self.properties.get(property) {
            Some(existing) if existing.specificity >= specificity => {}
            _ => {
                self.properties.insert(
                    property.to_string(),
                    AppliedValue {
                        value: value.to_string(),
                        specificity,
                    },
                );
            }
        }
    }
}

/// Resolve the cascade for one element.
///
/// `ancestors` is the open-element chain innermost-first (parent before
/// grandparent), excluding the element itself. Rules are applied in
/// registration order; see [`ComputedStyle::apply`] for the tie-break.
pub fn resolve(
    target: &StyleTarget<'_>,
    ancestors: &[StyleTarget<'_>],
    rules: &RuleStore,
    style: &mut ComputedStyle,
) {
    for rule in rules.iter() {
        let selector = match rule.selectors.first() {
            Some(s) => s,
            None => continue,
        };
        let atoms: Vec<&str> = selector.split(' ').rev().collect();

        // The rightmost atom must match the element itself.
        match atoms.first() {
            Some(atom) if atom_matches(target, atom) => {}
            _ => continue,
        }

        // Walk the remaining atoms up the ancestor chain: one ancestor per
        // step, the atom cursor advances only on a match. Loose descendant
        // semantics, not immediate-child.
        let mut cursor = 1;
        for ancestor in ancestors {
            if cursor >= atoms.len() {
                break;
            }
            if atom_matches(ancestor, atoms[cursor]) {
                cursor += 1;
            }
        }
        if cursor < atoms.len() {
            continue;
        }

        let specificity = Specificity::of_selector(selector);
        for decl in &rule.declarations {
            style.apply(&decl.property, &decl.value, specificity);
        }
    }
}

/// Match one simple selector atom against one element.
///
/// `#id` and `.class` compare the whole attribute value; a `class`
/// attribute holding several names never matches a `.class` atom.
fn atom_matches(target: &StyleTarget<'_>, atom: &str) -> bool {
    if atom.is_empty() {
        return false;
    }
    if let Some(id) = atom.strip_prefix('#') {
        return target.id == Some(id);
    }
    if let Some(class) = atom.strip_prefix('.') {
        return target.class == Some(class);
    }
    target.tag_name == Some(atom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use petrel_cssparser::parse_stylesheet;

    fn store(css: &str) -> RuleStore {
        let mut rules = RuleStore::new();
        rules.add_stylesheet(parse_stylesheet(css).unwrap());
        rules
    }

    fn element<'a>(tag: &'a str) -> StyleTarget<'a> {
        StyleTarget {
            tag_name: Some(tag),
            ..Default::default()
        }
    }

    #[test]
    fn specificity_orders_lexicographically() {
        let id = Specificity::of_selector("#x");
        let class = Specificity::of_selector(".a");
        let tag = Specificity::of_selector("p");
        assert_eq!(id, Specificity(0, 1, 0, 0));
        assert_eq!(class, Specificity(0, 0, 1, 0));
        assert_eq!(tag, Specificity(0, 0, 0, 1));
        assert!(id > class && class > tag);
        // One id outranks any pile of tags.
        assert!(id > Specificity::of_selector("body div div p"));
    }

    #[test]
    fn id_wins_regardless_of_registration_order() {
        let target = StyleTarget {
            tag_name: Some("p"),
            id: Some("x"),
            class: None,
        };

        for css in ["p { color: blue; } #x { color: red; }",
                    "#x { color: red; } p { color: blue; }"] {
            let mut style = ComputedStyle::new();
            resolve(&target, &[], &store(css), &mut style);
            assert_eq!(style.get("color"), Some("red"), "css: {css}");
        }
    }

    #[test]
    fn equal_specificity_keeps_first_applied() {
        let mut style = ComputedStyle::new();
        resolve(
            &element("p"),
            &[],
            &store("p { color: blue; } p { color: green; }"),
            &mut style,
        );
        assert_eq!(style.get("color"), Some("blue"));
    }

    #[test]
    fn descendant_chain_matches_loosely() {
        // div is a grandparent, not the parent: still a match.
        let ancestors = [element("span"), element("div"), element("body")];
        let mut style = ComputedStyle::new();
        resolve(
            &element("p"),
            &ancestors,
            &store("div p { margin: 0; }"),
            &mut style,
        );
        assert_eq!(style.get("margin"), Some("0"));
    }

    #[test]
    fn descendant_chain_respects_order() {
        // "body div" requires body to be *above* div; here it is below.
        let ancestors = [element("body"), element("div")];
        let mut style = ComputedStyle::new();
        resolve(
            &element("p"),
            &ancestors,
            &store("body div p { margin: 0; }"),
            &mut style,
        );
        assert_eq!(style.get("margin"), None);
    }

    #[test]
    fn class_atom_compares_whole_attribute() {
        let target = StyleTarget {
            tag_name: Some("p"),
            id: None,
            class: Some("a b"),
        };
        let mut style = ComputedStyle::new();
        resolve(&target, &[], &store(".a { color: red; }"), &mut style);
        assert_eq!(style.get("color"), None);

        let target = StyleTarget {
            class: Some("a"),
            ..target
        };
        let mut style = ComputedStyle::new();
        resolve(&target, &[], &store(".a { color: red; }"), &mut style);
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn only_first_selector_of_a_list_is_considered() {
        let mut style = ComputedStyle::new();
        resolve(
            &element("h2"),
            &[],
            &store("h1, h2 { font-weight: bold; }"),
            &mut style,
        );
        assert_eq!(style.get("font-weight"), None);

        let mut style = ComputedStyle::new();
        resolve(
            &element("h1"),
            &[],
            &store("h1, h2 { font-weight: bold; }"),
            &mut style,
        );
        assert_eq!(style.get("font-weight"), Some("bold"));
    }

    #[test]
    fn non_element_ancestors_never_match() {
        let root = StyleTarget::default();
        let ancestors = [element("body"), root];
        let mut style = ComputedStyle::new();
        resolve(
            &element("p"),
            &ancestors,
            &store("body p { color: red; }"),
            &mut style,
        );
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn winning_specificity_is_recorded() {
        let target = StyleTarget {
            tag_name: Some("p"),
            id: Some("x"),
            class: None,
        };
        let mut style = ComputedStyle::new();
        resolve(&target, &[], &store("#x { color: red; }"), &mut style);
        let applied = style.applied("color").unwrap();
        assert_eq!(applied.specificity, Specificity(0, 1, 0, 0));
    }
}
