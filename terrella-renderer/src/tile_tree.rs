use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy::prelude::Resource;
use bevy::utils::HashMap;
use terrella_scene::{BoundingSphere, Camera, Ellipsoid, Extent, GeographicTilingScheme, TileKey};

use crate::{GpuDevice, Layer, LayerId, Layers, Material, RendererSettings, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Liveness of a segment as seen by the materials it owns.
#[derive(Debug, Clone)]
pub struct SegmentLink(Arc<AtomicBool>);

impl SegmentLink {
    pub fn is_initialized(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Geometry of one tile: its extent and the bounding sphere used for culling.
#[derive(Debug)]
pub struct Segment {
    extent: Extent,
    bounding_sphere: BoundingSphere,
    initialized: Arc<AtomicBool>,
}

impl Segment {
    pub fn new(ellipsoid: &Ellipsoid, extent: Extent) -> Self {
        Self {
            extent,
            bounding_sphere: BoundingSphere::from_extent(ellipsoid, &extent),
            initialized: Arc::new(AtomicBool::new(true)),
        }
    }
    pub fn extent(&self) -> &Extent {
        &self.extent
    }
    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }
    pub fn link(&self) -> SegmentLink {
        SegmentLink(self.initialized.clone())
    }
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
    /// Marks the segment dead; images arriving for its materials are ignored.
    pub fn destroy(&mut self) {
        self.initialized.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct TileNode {
    id: NodeId,
    key: TileKey,
    parent: Option<NodeId>,
    children: Option<[NodeId; 4]>,
    segment: Segment,
    materials: HashMap<LayerId, Material>,
}

impl TileNode {
    pub fn id(&self) -> NodeId {
        self.id
    }
    pub fn key(&self) -> TileKey {
        self.key
    }
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
    pub fn children(&self) -> Option<[NodeId; 4]> {
        self.children
    }
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
    pub fn extent(&self) -> &Extent {
        self.segment.extent()
    }
    pub fn segment(&self) -> &Segment {
        &self.segment
    }
    pub fn material(&self, layer_id: LayerId) -> Option<&Material> {
        self.materials.get(&layer_id)
    }
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTexture {
    pub layer_id: LayerId,
    pub texture: TextureHandle,
    pub offset: [f64; 4],
}

/// A visible leaf and the textures to draw it with, bottom layer first.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTile {
    pub node_id: NodeId,
    pub key: TileKey,
    pub extent: Extent,
    pub textures: Vec<LayerTexture>,
}

/// Quadtree of tiles over the tiling scheme. Owns segments and materials.
#[derive(Resource)]
pub struct TileTree {
    scheme: GeographicTilingScheme,
    nodes: HashMap<NodeId, TileNode>,
    roots: Vec<NodeId>,
    next_id: u64,
    rendered: Vec<RenderedTile>,
}

impl Default for TileTree {
    fn default() -> Self {
        Self::new(GeographicTilingScheme::default())
    }
}

impl TileTree {
    pub fn new(scheme: GeographicTilingScheme) -> Self {
        let mut tree = Self {
            scheme,
            nodes: HashMap::default(),
            roots: vec![],
            next_id: 0,
            rendered: vec![],
        };
        for key in scheme.root_keys() {
            let id = tree.insert_node(key, None);
            tree.roots.push(id);
        }
        tree
    }

    fn insert_node(&mut self, key: TileKey, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let extent = self.scheme.tile_key_to_extent(&key);
        let segment = Segment::new(&self.scheme.ellipsoid, extent);
        self.nodes.insert(
            id,
            TileNode {
                id,
                key,
                parent,
                children: None,
                segment,
                materials: HashMap::default(),
            },
        );
        id
    }

    pub fn scheme(&self) -> &GeographicTilingScheme {
        &self.scheme
    }
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
    pub fn node(&self, id: NodeId) -> Option<&TileNode> {
        self.nodes.get(&id)
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn nodes(&self) -> impl Iterator<Item = &TileNode> {
        self.nodes.values()
    }
    /// Visible leaves from the last [`TileTree::update`].
    pub fn rendered(&self) -> &[RenderedTile] {
        &self.rendered
    }

    pub fn material(&self, node: NodeId, layer_id: LayerId) -> Option<&Material> {
        self.nodes.get(&node)?.materials.get(&layer_id)
    }
    pub fn material_mut(&mut self, node: NodeId, layer_id: LayerId) -> Option<&mut Material> {
        self.nodes.get_mut(&node)?.materials.get_mut(&layer_id)
    }
    /// The node's material for `layer`, created empty on first use.
    pub fn ensure_material(&mut self, node: NodeId, layer: &dyn Layer) -> Option<&mut Material> {
        let tile = self.nodes.get_mut(&node)?;
        let link = tile.segment.link();
        Some(
            tile.materials
                .entry(layer.id())
                .or_insert_with(|| Material::new(node, layer.id(), link, layer.texture_filter())),
        )
    }

    /// Creates the four children of `node` if it has none.
    pub fn split(&mut self, node: NodeId) -> Option<[NodeId; 4]> {
        let tile = self.nodes.get(&node)?;
        if let Some(children) = tile.children {
            return Some(children);
        }
        let keys = tile.key.children();
        let children = keys.map(|key| self.insert_node(key, Some(node)));
        if let Some(tile) = self.nodes.get_mut(&node) {
            tile.children = Some(children);
        }
        Some(children)
    }

    /// Removes every descendant of `node`. Their segments are destroyed and
    /// their materials cleared through the owning layer.
    pub fn merge(&mut self, node: NodeId, layers: &mut Layers, device: &mut dyn GpuDevice) -> bool {
        let Some(children) = self.nodes.get_mut(&node).and_then(|t| t.children.take()) else {
            return false;
        };
        let mut stack = children.to_vec();
        while let Some(id) = stack.pop() {
            let Some(mut tile) = self.nodes.remove(&id) else {
                continue;
            };
            if let Some(children) = tile.children {
                stack.extend(children);
            }
            tile.segment.destroy();
            for (layer_id, material) in tile.materials.iter_mut() {
                match layers.get_mut(*layer_id) {
                    Some(layer) => material.clear(layer, device),
                    None => material.release(device),
                }
            }
        }
        true
    }

    /// Clears the materials of `layer` on every tile and forgets them.
    pub fn clear_layer(&mut self, layer: &mut dyn Layer, device: &mut dyn GpuDevice) {
        let layer_id = layer.id();
        for tile in self.nodes.values_mut() {
            if let Some(mut material) = tile.materials.remove(&layer_id) {
                material.clear(layer, device);
            }
        }
        self.rendered.clear();
    }

    /// Culls and refines the tree against `camera`, requests materials for
    /// visible leaves and rebuilds the draw list.
    pub fn update(
        &mut self,
        camera: &Camera,
        layers: &mut Layers,
        device: &mut dyn GpuDevice,
        settings: &RendererSettings,
    ) {
        let mut leaves = vec![];
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(tile) = self.nodes.get(&id) else {
                continue;
            };
            let sphere = *tile.segment.bounding_sphere();
            let level = tile.key.level;
            if !camera.is_visible(&sphere) {
                self.merge(id, layers, device);
                continue;
            }
            let refine = level < settings.max_level
                && camera.projected_size(&sphere.center, sphere.radius) > settings.split_threshold;
            if refine {
                if let Some(children) = self.split(id) {
                    stack.extend(children.iter().rev());
                }
            } else {
                self.merge(id, layers, device);
                leaves.push(id);
            }
        }

        self.rendered.clear();
        for id in leaves {
            if let Some(tile) = self.prepare_leaf(id, layers) {
                self.rendered.push(tile);
            }
        }
    }

    fn prepare_leaf(&mut self, id: NodeId, layers: &mut Layers) -> Option<RenderedTile> {
        let (key, extent) = {
            let tile = self.nodes.get(&id)?;
            (tile.key, *tile.extent())
        };
        let mut textures = vec![];
        for layer in layers.iter_mut() {
            if !layer.is_visible() {
                continue;
            }
            let layer_id = layer.id();
            if let Some(material) = self.ensure_material(id, &*layer) {
                layer.load_material(material, &key, &extent);
            }
            let ready = self.material(id, layer_id).map_or(false, |m| m.is_ready());
            if !ready {
                if let Some((from, texture, ancestor_extent)) = self.ready_ancestor(id, layer_id) {
                    let offset = extent.texture_offset_within(&ancestor_extent);
                    if let Some(material) = self.material_mut(id, layer_id) {
                        material.inherit_from(texture, offset, from);
                    }
                }
            }
            if let Some(material) = self.material(id, layer_id) {
                if let Some(texture) = material.texture_handle() {
                    textures.push(LayerTexture {
                        layer_id,
                        texture,
                        offset: material.tex_offset(),
                    });
                }
            }
        }
        Some(RenderedTile {
            node_id: id,
            key,
            extent,
            textures,
        })
    }

    /// Nearest ancestor holding its own texture for `layer_id`.
    fn ready_ancestor(&self, id: NodeId, layer_id: LayerId) -> Option<(NodeId, TextureHandle, Extent)> {
        let mut current = self.nodes.get(&id)?.parent;
        while let Some(ancestor_id) = current {
            let ancestor = self.nodes.get(&ancestor_id)?;
            if let Some(texture) = ancestor.material(layer_id).and_then(|m| m.own_texture()) {
                return Some((ancestor_id, texture, *ancestor.extent()));
            }
            current = ancestor.parent;
        }
        None
    }
}
