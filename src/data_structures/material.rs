//! Materials and how they get bound to the loaded model.

use crate::{
    data_structures::{colour::Colour, scene_graph::SceneGraph},
    error::MaterialBindingError,
};

/// Node names are matched against these substrings.
pub const BAKED_PATTERN: &str = "baked";
pub const POLE_PATTERN: &str = "pole";
pub const PORTAL_PATTERN: &str = "portal";

/// How a surface is shaded.
///
/// The GPU state behind each variant (the baked texture, the flat colour
/// buffer, the portal program and its uniforms) is owned by the renderer;
/// a node only records which one it uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    /// Texture-mapped with the pre-baked lightmap.
    Baked,
    /// One solid colour.
    Flat(Colour),
    /// The animated portal program.
    Shader,
}

/// Which nodes received which material.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    pub baked: String,
    pub poles: Vec<String>,
    pub portal: String,
}

/// Binds the three materials by node name.
///
/// The baked and portal meshes must each match exactly once; both lookups are
/// checked before anything is written so a failed binding leaves the graph
/// untouched. Any number of pole lights is fine.
pub fn bind_materials(
    graph: &mut SceneGraph,
    pole_colour: Colour,
) -> Result<Bindings, MaterialBindingError> {
    graph.ensure_unique(BAKED_PATTERN)?;
    graph.ensure_unique(PORTAL_PATTERN)?;

    let mut bindings = Bindings::default();

    let baked = graph.find_unique(BAKED_PATTERN)?;
    baked.material = Some(Material::Baked);
    bindings.baked = baked.name.clone();

    graph.for_each_matching(POLE_PATTERN, |node| {
        node.material = Some(Material::Flat(pole_colour));
        bindings.poles.push(node.name.clone());
    });
    if bindings.poles.is_empty() {
        log::warn!("No scene node name contains \"{POLE_PATTERN}\"; the scene has no pole lights.");
    }

    let portal = graph.find_unique(PORTAL_PATTERN)?;
    portal.material = Some(Material::Shader);
    bindings.portal = portal.name.clone();

    log::info!(
        "Bound materials: baked={}, poles={:?}, portal={}",
        bindings.baked,
        bindings.poles,
        bindings.portal
    );
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene_graph::SceneNode;

    const POLE: Colour = Colour::from_rgb_u32(0xffffe5);

    #[test]
    fn leaves_the_graph_untouched_when_the_portal_is_missing() {
        let mut graph = SceneGraph::new(
            "Scene",
            vec![SceneNode::new("baked_mesh"), SceneNode::new("poleLightA")],
        );
        let before = graph.clone();
        let err = bind_materials(&mut graph, POLE).unwrap_err();
        assert_eq!(
            err,
            MaterialBindingError::NoMatch {
                pattern: PORTAL_PATTERN.to_string()
            }
        );
        assert_eq!(graph, before);
    }

    #[test]
    fn rejects_two_baked_meshes() {
        let mut graph = SceneGraph::new(
            "Scene",
            vec![
                SceneNode::new("baked_a"),
                SceneNode::new("baked_b"),
                SceneNode::new("portal"),
            ],
        );
        assert!(matches!(
            bind_materials(&mut graph, POLE),
            Err(MaterialBindingError::MultipleMatches { .. })
        ));
    }

    #[test]
    fn reports_what_was_bound() {
        let mut graph = SceneGraph::new(
            "Scene",
            vec![
                SceneNode::new("baked"),
                SceneNode::new("poleLightA"),
                SceneNode::new("portalLight"),
            ],
        );
        let bindings = bind_materials(&mut graph, POLE).unwrap();
        assert_eq!(bindings.baked, "baked");
        assert_eq!(bindings.poles, vec!["poleLightA"]);
        assert_eq!(bindings.portal, "portalLight");
    }
}
