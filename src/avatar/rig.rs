use nalgebra::{UnitQuaternion, Vector3};
use thiserror::Error;

use super::AvatarPose;
use crate::config::RigConfig;

/// Index of a node inside a scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RigError {
    #[error("avatar has no node named {0:?}")]
    MissingNode(String),
}

/// The parts of a renderer's scene graph the avatar driver needs.
pub trait SceneGraph {
    fn find_node(&self, name: &str) -> Option<NodeId>;
    fn set_position(&mut self, node: NodeId, position: Vector3<f32>);
    fn set_orientation(&mut self, node: NodeId, orientation: UnitQuaternion<f32>);
    fn set_uniform_scale(&mut self, node: NodeId, scale: f32);
}

/// Handles to the avatar's root and head, looked up once after the model loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarRig {
    pub root: NodeId,
    pub head: NodeId,
}

impl AvatarRig {
    pub fn resolve<S: SceneGraph + ?Sized>(scene: &S, config: &RigConfig) -> Result<Self, RigError> {
        let find = |name: &str| {
            scene
                .find_node(name)
                .ok_or_else(|| RigError::MissingNode(name.to_string()))
        };

        Ok(Self {
            root: find(config.root_node.as_str())?,
            head: find(config.head_node.as_str())?,
        })
    }

    /// The head only turns; the root carries position and scale.
    pub fn apply<S: SceneGraph + ?Sized>(&self, pose: &AvatarPose, scene: &mut S) {
        scene.set_orientation(self.head, pose.orientation);
        scene.set_position(self.root, pose.position);
        scene.set_uniform_scale(self.root, pose.scale);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub scale: f32,
}

/// Flat, index-addressed scene graph. Nodes are never removed, so ids stay valid.
#[derive(Debug, Clone, Default)]
pub struct SceneArena {
    nodes: Vec<SceneNode>,
}

impl SceneArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimal avatar hierarchy: root with a head child, named after `config`.
    pub fn avatar(config: &RigConfig) -> Self {
        let mut arena = Self::new();
        let root = arena.add_node(&config.root_node, None);
        arena.add_node(&config.head_node, Some(root));
        arena
    }

    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            parent,
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            scale: 1.0,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }
}

impl SceneGraph for SceneArena {
    fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    fn set_position(&mut self, node: NodeId, position: Vector3<f32>) {
        if let Some(n) = self.node_mut(node) {
            n.position = position;
        }
    }

    fn set_orientation(&mut self, node: NodeId, orientation: UnitQuaternion<f32>) {
        if let Some(n) = self.node_mut(node) {
            n.orientation = orientation;
        }
    }

    fn set_uniform_scale(&mut self, node: NodeId, scale: f32) {
        if let Some(n) = self.node_mut(node) {
            n.scale = scale;
        }
    }
}
