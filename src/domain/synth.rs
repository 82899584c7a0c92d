//! Synthesis: construct tree to document.
//!
//! Every construct contributes a fragment: its (restyled) data merged with one
//! entry per child, in insertion order. Fragments are built bottom-up with a
//! post-order walk, so a parent always finds its children's fragments ready.
//! Key collisions are errors; nothing is ever overwritten.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, info, instrument};

use crate::domain::address::Address;
use crate::domain::arena::{App, ConstructKind, KeyStyle, Node, NodeId, Placement};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::value::{Data, Value};

/// Start of a construct's contribution inside a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    /// Pointer tokens from the document root.
    pub pointer: Vec<String>,
    pub address: Address,
}

/// Nested literal structure produced by synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
    origins: Vec<Origin>,
}

impl Document {
    fn new(entries: Data, origins: Vec<Origin>) -> Self {
        Self {
            root: Value::Mapping(entries),
            origins,
        }
    }

    /// The whole document as a mapping value.
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> Vec<&str> {
        self.root
            .as_mapping()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Contribution starts in pre-order.
    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    /// Address of the deepest construct whose contribution contains `tokens`.
    pub fn owner_of<S: AsRef<str>>(&self, tokens: &[S]) -> Address {
        self.origins
            .iter()
            .filter(|origin| {
                origin.pointer.len() <= tokens.len()
                    && origin
                        .pointer
                        .iter()
                        .zip(tokens)
                        .all(|(a, b)| a == b.as_ref())
            })
            .max_by_key(|origin| origin.pointer.len())
            .map(|origin| origin.address.clone())
            .unwrap_or_default()
    }
}

/// Synthesized body of a single workflow, destined for its own file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub address: Address,
    pub document: Document,
}

#[derive(Debug, Clone)]
struct Fragment {
    entries: Data,
    origins: Vec<Origin>,
}

struct Assembly {
    root: Fragment,
    kept: Vec<(Index, Fragment)>,
}

/// Synthesize the whole tree into one document rooted at the app.
#[instrument(level = "debug", skip(app))]
pub fn synthesize(app: &App) -> DomainResult<Document> {
    let assembly = assemble(app, |_| false)?;
    let document = Document::new(assembly.root.entries, assembly.root.origins);
    debug!("synthesized document with keys {:?}", document.keys());
    Ok(document)
}

/// Synthesize one artifact per workflow, in traversal order.
#[instrument(level = "debug", skip(app))]
pub fn artifacts(app: &App) -> DomainResult<Vec<Artifact>> {
    let assembly = assemble(app, |node| node.kind() == ConstructKind::Workflow)?;

    let mut seen: HashMap<String, Address> = HashMap::new();
    let mut artifacts = Vec::with_capacity(assembly.kept.len());
    for (idx, fragment) in assembly.kept {
        let address = app.address_of(idx);
        let name = address.name().unwrap_or_default().to_string();
        if let Some(first) = seen.get(&name) {
            return Err(DomainError::DuplicateArtifact {
                name,
                first: first.clone(),
                second: address,
            });
        }
        seen.insert(name.clone(), address.clone());
        artifacts.push(Artifact {
            name,
            address,
            document: Document::new(fragment.entries, fragment.origins),
        });
    }
    debug!("synthesized {} artifacts", artifacts.len());
    Ok(artifacts)
}

impl App {
    /// Synthesize and finalize the tree.
    ///
    /// Repeated calls return the same document. Once a call succeeds, no
    /// further constructs can be added.
    pub fn synth(&mut self) -> DomainResult<Document> {
        let document = synthesize(self)?;
        if !self.is_finalized() {
            self.finalize();
            info!("app finalized ({} constructs)", self.node_count());
        }
        Ok(document)
    }
}

fn assemble(app: &App, keep: impl Fn(&Node) -> bool) -> DomainResult<Assembly> {
    let mut built: HashMap<Index, Fragment> = HashMap::new();
    let mut kept = Vec::new();

    for (id, node) in app.iter_postorder() {
        let address = app.address_of(id.index());
        let fragment = assemble_node(app, node, &address, &mut built)?;
        if keep(node) {
            kept.push((id.index(), fragment.clone()));
        }
        built.insert(id.index(), fragment);
    }

    let root_idx = NodeId::from(app.root()).index();
    let root = built.remove(&root_idx).ok_or(DomainError::UnknownNode)?;
    Ok(Assembly { root, kept })
}

fn assemble_node(
    app: &App,
    node: &Node,
    address: &Address,
    built: &mut HashMap<Index, Fragment>,
) -> DomainResult<Fragment> {
    let layout = node.kind().layout();
    let mut entries = restyle(node.data(), layout.key_style, address)?;
    // Inline constructs own no entries of their own; their children record
    // origins instead.
    let mut origins = Vec::new();
    if layout.placement == Placement::Keyed || node.kind() == ConstructKind::App {
        origins.push(Origin {
            pointer: Vec::new(),
            address: address.clone(),
        });
    }

    let mut group = Data::new();
    let mut group_origins = Vec::new();
    {
        let (target, target_origins) = if layout.children_key.is_some() {
            (&mut group, &mut group_origins)
        } else {
            (&mut entries, &mut origins)
        };

        for &child_idx in node.child_indices() {
            let child = app.node_at(child_idx).ok_or(DomainError::UnknownNode)?;
            let fragment = built.remove(&child_idx).ok_or(DomainError::UnknownNode)?;
            match child.kind().layout().placement {
                Placement::Keyed => {
                    insert_unique(
                        target,
                        child.name().to_string(),
                        Value::Mapping(fragment.entries),
                        address,
                    )?;
                    target_origins.extend(prefixed(fragment.origins, child.name()));
                }
                Placement::Inline => {
                    for (key, value) in fragment.entries {
                        insert_unique(target, key, value, address)?;
                    }
                    target_origins.extend(fragment.origins);
                }
            }
        }
    }

    if let Some(key) = layout.children_key {
        if !group.is_empty() {
            insert_unique(&mut entries, key.to_string(), Value::Mapping(group), address)?;
            origins.extend(prefixed(group_origins, key));
        }
    }

    Ok(Fragment { entries, origins })
}

fn prefixed(origins: Vec<Origin>, token: &str) -> impl Iterator<Item = Origin> + '_ {
    origins.into_iter().map(move |mut origin| {
        origin.pointer.insert(0, token.to_string());
        origin
    })
}

fn insert_unique(target: &mut Data, key: String, value: Value, address: &Address) -> DomainResult<()> {
    if target.contains_key(&key) {
        return Err(DomainError::KeyCollision {
            address: address.clone(),
            key,
        });
    }
    target.insert(key, value);
    Ok(())
}

fn restyle(data: &Data, style: KeyStyle, address: &Address) -> DomainResult<Data> {
    let KeyStyle::Kebab { sequences } = style else {
        return Ok(data.clone());
    };

    let mut out = Data::with_capacity(data.len());
    for (key, value) in data {
        let value = match value {
            Value::Sequence(items) if sequences.contains(&key.as_str()) => Value::Sequence(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Mapping(map) => kebab_keys(map, address).map(Value::Mapping),
                        other => Ok(other.clone()),
                    })
                    .collect::<DomainResult<_>>()?,
            ),
            other => other.clone(),
        };
        insert_unique(&mut out, kebab_case(key), value, address)?;
    }
    Ok(out)
}

fn kebab_keys(map: &Data, address: &Address) -> DomainResult<Data> {
    let mut out = Data::with_capacity(map.len());
    for (key, value) in map {
        insert_unique(&mut out, kebab_case(key), value.clone(), address)?;
    }
    Ok(out)
}

/// Rewrite a camelCase key as kebab-case; other keys are returned unchanged.
pub fn kebab_case(key: &str) -> String {
    let is_camel = key.starts_with(|c: char| c.is_ascii_lowercase())
        && key.chars().all(|c| c.is_ascii_alphanumeric())
        && key.chars().any(|c| c.is_ascii_uppercase());
    if !is_camel {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_only_touches_camel_case() {
        assert_eq!(kebab_case("runsOn"), "runs-on");
        assert_eq!(kebab_case("timeoutMinutes"), "timeout-minutes");
        assert_eq!(kebab_case("continueOnError"), "continue-on-error");
        assert_eq!(kebab_case("steps"), "steps");
        assert_eq!(kebab_case("RUST_LOG"), "RUST_LOG");
        assert_eq!(kebab_case("workflow_dispatch"), "workflow_dispatch");
        assert_eq!(kebab_case("runs-on"), "runs-on");
    }

    #[test]
    fn owner_of_prefers_deepest_origin() {
        let document = Document::new(
            Data::new(),
            vec![
                Origin {
                    pointer: vec![],
                    address: Address::root(),
                },
                Origin {
                    pointer: vec!["main".into()],
                    address: Address::root().child("cdk").child("main"),
                },
                Origin {
                    pointer: vec!["main".into(), "jobs".into(), "ci".into()],
                    address: Address::root().child("cdk").child("main").child("ci"),
                },
            ],
        );

        assert_eq!(
            document.owner_of(&["main", "jobs", "ci", "steps", "0"]).to_string(),
            "cdk/main/ci"
        );
        assert_eq!(document.owner_of(&["main", "on"]).to_string(), "cdk/main");
        assert_eq!(document.owner_of(&["other"]), Address::root());
    }
}
