//! Scene graph and block registry.
//!
//! The scene graph owns every placed [`Block`] in an indexed registry and the
//! host UI nodes whose visibility depends on the AR mode. All mutations are
//! recorded in a change journal so that the host renderer can mirror the
//! scene without traversing it.

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::data_structures::block::{Block, BlockId};

/// How a UI node reacts to entering and leaving AR mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArVisibility {
    /// Visible in the regular page, hidden while in AR (e.g. the start screen).
    HideInArMode,
    /// Hidden in the regular page, visible while in AR (e.g. the marker, buttons).
    ShowInArMode,
}

impl ArVisibility {
    fn initial(&self) -> bool {
        match self {
            ArVisibility::HideInArMode => true,
            ArVisibility::ShowInArMode => false,
        }
    }

    fn in_ar(&self) -> bool {
        !self.initial()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(usize);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneNode {
    pub name: String,
    pub tag: ArVisibility,
    pub visible: bool,
}

/// A single mutation of the scene, in the order it happened.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SceneChange {
    BlockAdded(Block),
    BlockRemoved { id: BlockId },
    Opacity { id: BlockId, opacity: f32 },
    Visibility { node: String, visible: bool },
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    blocks: HashMap<BlockId, Block>,
    nodes: Vec<SceneNode>,
    changes: Vec<SceneChange>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: Block) -> BlockId {
        let id = block.id;
        self.changes.push(SceneChange::BlockAdded(block.clone()));
        if self.blocks.insert(id, block).is_some() {
            warn!("Block {} was inserted twice, the previous one was replaced.", id);
        }
        id
    }

    /// Removes a block from the registry. Unknown ids return `None`.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let removed = self.blocks.remove(&id);
        if removed.is_some() {
            self.changes.push(SceneChange::BlockRemoved { id });
        }
        removed
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sets the opacity of a block. Returns `false` if the block no longer exists.
    pub fn set_opacity(&mut self, id: BlockId, opacity: f32) -> bool {
        match self.blocks.get_mut(&id) {
            Some(block) => {
                if block.opacity != opacity {
                    block.opacity = opacity;
                    self.changes.push(SceneChange::Opacity { id, opacity });
                }
                true
            }
            None => false,
        }
    }

    /// Registers a host UI node. Its visibility starts in the non-AR state.
    pub fn add_node(&mut self, name: impl Into<String>, tag: ArVisibility) -> NodeId {
        let node = SceneNode {
            name: name.into(),
            tag,
            visible: tag.initial(),
        };
        self.changes.push(SceneChange::Visibility {
            node: node.name.clone(),
            visible: node.visible,
        });
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Host entered an immersive session. Only AR sessions toggle the nodes.
    pub fn enter_vr(&mut self, ar_mode: bool) {
        if !ar_mode {
            return;
        }
        self.apply_visibility(ArVisibility::in_ar);
    }

    pub fn exit_vr(&mut self) {
        self.apply_visibility(ArVisibility::initial);
    }

    fn apply_visibility(&mut self, visible_for: fn(&ArVisibility) -> bool) {
        for node in self.nodes.iter_mut() {
            let visible = visible_for(&node.tag);
            if node.visible != visible {
                node.visible = visible;
                self.changes.push(SceneChange::Visibility {
                    node: node.name.clone(),
                    visible,
                });
            }
        }
    }

    /// Takes all changes recorded since the last call.
    pub fn drain_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }
}
