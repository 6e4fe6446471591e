//! Scene graph and node lookup.
//!
//! The loaded model becomes a tree of [`SceneNode`]s under a [`SceneGraph`].
//! After loading, only each node's `material` is ever changed; geometry and
//! transforms stay as the file described them.

use crate::{
    data_structures::{instance::Instance, material::Material, model::MeshData},
    error::MaterialBindingError,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Instance,
    pub mesh: Option<MeshData>,
    pub material: Option<Material>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    fn visit<'a>(&'a self, parent: &Instance, f: &mut dyn FnMut(&'a SceneNode, &Instance)) {
        let world = parent * &self.transform;
        f(self, &world);
        for child in &self.children {
            child.visit(&world, f);
        }
    }

    fn collect_names(&self, pattern: &str, names: &mut Vec<String>) {
        if self.name.contains(pattern) {
            names.push(self.name.clone());
        }
        for child in &self.children {
            child.collect_names(pattern, names);
        }
    }

    fn first_match_mut<'a>(&'a mut self, pattern: &str) -> Option<&'a mut SceneNode> {
        if self.name.contains(pattern) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.first_match_mut(pattern))
    }

    fn for_each_match_mut(&mut self, pattern: &str, f: &mut dyn FnMut(&mut SceneNode)) -> usize {
        let mut hits = 0;
        if self.name.contains(pattern) {
            f(self);
            hits += 1;
        }
        for child in &mut self.children {
            hits += child.for_each_match_mut(pattern, f);
        }
        hits
    }
}

/// The loaded scene: the top-level nodes of the model's default scene.
///
/// Name lookups are case-sensitive substring matches over every node in the
/// tree, never over the scene itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    pub name: String,
    pub nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new(name: impl Into<String>, nodes: Vec<SceneNode>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// Names of every node containing `pattern`, depth first.
    pub fn names_matching(&self, pattern: &str) -> Vec<String> {
        let mut names = Vec::new();
        for node in &self.nodes {
            node.collect_names(pattern, &mut names);
        }
        names
    }

    /// The one node whose name contains `pattern`.
    ///
    /// Zero and multiple matches are separate errors so a renamed or
    /// duplicated mesh in the model shows up as exactly what it is.
    pub fn find_unique(&mut self, pattern: &str) -> Result<&mut SceneNode, MaterialBindingError> {
        self.ensure_unique(pattern)?;
        self.nodes
            .iter_mut()
            .find_map(|node| node.first_match_mut(pattern))
            .ok_or_else(|| MaterialBindingError::NoMatch {
                pattern: pattern.to_string(),
            })
    }

    /// Checks that exactly one node matches, without borrowing it.
    pub fn ensure_unique(&self, pattern: &str) -> Result<(), MaterialBindingError> {
        let names = self.names_matching(pattern);
        match names.len() {
            0 => Err(MaterialBindingError::NoMatch {
                pattern: pattern.to_string(),
            }),
            1 => Ok(()),
            _ => Err(MaterialBindingError::MultipleMatches {
                pattern: pattern.to_string(),
                names,
            }),
        }
    }

    /// Every node whose name contains `pattern`, depth first. May be empty.
    pub fn find_all(&self, pattern: &str) -> Vec<&SceneNode> {
        let mut found = Vec::new();
        self.visit(|node, _| {
            if node.name.contains(pattern) {
                found.push(node);
            }
        });
        found
    }

    /// Runs `f` on every node whose name contains `pattern`; returns how many matched.
    pub fn for_each_matching(
        &mut self,
        pattern: &str,
        mut f: impl FnMut(&mut SceneNode),
    ) -> usize {
        self.nodes
            .iter_mut()
            .map(|node| node.for_each_match_mut(pattern, &mut f))
            .sum()
    }

    /// Exact-name lookup.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        let mut found = None;
        self.visit(|node, _| {
            if found.is_none() && node.name == name {
                found = Some(node);
            }
        });
        found
    }

    /// Walks every node depth first together with its world transform.
    pub fn visit<'a>(&'a self, mut f: impl FnMut(&'a SceneNode, &Instance)) {
        let root = Instance::new();
        for node in &self.nodes {
            node.visit(&root, &mut f);
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit(|_, _| count += 1);
        count
    }
}
