//! Spatial queries backed by rapier3d
//!
//! Colliders here are parentless: targets move by teleporting their
//! collider and obstacles never move, so no rigid bodies are simulated.
//! Call [`PhysicsWorld::sync`] after changing colliders and before querying.

use glam::Vec3;
use hecs::Entity;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

use crate::ai::{AiError, Candidate, Candidates, LayerMask, SpatialQuery};

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Convert a layer mask to a rapier group
fn group(mask: LayerMask) -> Group {
    Group::from_bits_truncate(mask.bits())
}

/// Collision groups for a collider living on `layers`
fn membership(layers: LayerMask) -> InteractionGroups {
    InteractionGroups::new(group(layers), Group::ALL)
}

/// Query filter accepting colliders on `layers`
fn filter(layers: LayerMask) -> QueryFilter<'static> {
    QueryFilter::default().groups(InteractionGroups::new(Group::ALL, group(layers)))
}

/// Collider storage and query acceleration for perception
pub struct PhysicsWorld {
    /// Island manager, needed for collider removal
    island_manager: IslandManager,
    /// Always empty; rapier queries take a body set
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Query pipeline for overlaps and raycasting
    query_pipeline: QueryPipeline,
    /// Collider owned by each target entity
    targets: FxHashMap<Entity, rapier3d::geometry::ColliderHandle>,
    /// Set when colliders changed since the last sync
    dirty: bool,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            island_manager: IslandManager::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            targets: FxHashMap::default(),
            dirty: false,
        }
    }

    /// Add a sphere collider for a target entity. Replaces any collider the
    /// entity already had.
    pub fn add_target(&mut self, entity: Entity, position: Vec3, radius: f32, layers: LayerMask) -> ColliderHandle {
        self.remove_target(entity);

        let collider = ColliderBuilder::ball(radius)
            .translation(vector![position.x, position.y, position.z])
            .collision_groups(membership(layers))
            .user_data(u128::from(entity.to_bits().get()))
            .build();

        let handle = self.collider_set.insert(collider);
        self.targets.insert(entity, handle);
        self.dirty = true;
        ColliderHandle(handle)
    }

    /// Teleport a target's collider. Returns `false` for unknown entities.
    pub fn set_target_position(&mut self, entity: Entity, position: Vec3) -> bool {
        let Some(collider) = self
            .targets
            .get(&entity)
            .and_then(|handle| self.collider_set.get_mut(*handle))
        else {
            return false;
        };

        collider.set_translation(vector![position.x, position.y, position.z]);
        self.dirty = true;
        true
    }

    /// Remove a target's collider. Returns `false` for unknown entities.
    pub fn remove_target(&mut self, entity: Entity) -> bool {
        let Some(handle) = self.targets.remove(&entity) else {
            return false;
        };

        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            false,
        );
        self.dirty = true;
        true
    }

    /// Add a static box obstacle
    pub fn add_obstacle_box(&mut self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![center.x, center.y, center.z])
            .collision_groups(membership(layers))
            .build();

        self.dirty = true;
        ColliderHandle(self.collider_set.insert(collider))
    }

    /// Rebuild the query acceleration structure if colliders changed
    pub fn sync(&mut self) {
        if self.dirty {
            self.query_pipeline.update(&self.collider_set);
            self.dirty = false;
        }
    }

    /// Whether colliders changed since the last [`sync`](Self::sync)
    pub fn needs_sync(&self) -> bool {
        self.dirty
    }

    /// Number of registered targets
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialQuery for PhysicsWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Result<Candidates, AiError> {
        if self.dirty {
            return Err(AiError::SensorUnavailable(
                "query pipeline out of date; call sync".to_string(),
            ));
        }

        let shape = Ball::new(radius);
        let position = Isometry::translation(center.x, center.y, center.z);
        let mut candidates = Candidates::new();

        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &position,
            &shape,
            filter(layers),
            |handle| {
                if let Some(collider) = self.collider_set.get(handle) {
                    // Colliders without an owning entity are not sensable
                    let owner = u64::try_from(collider.user_data)
                        .ok()
                        .and_then(Entity::from_bits);
                    if let Some(entity) = owner {
                        let t = collider.translation();
                        candidates.push(Candidate {
                            entity,
                            center: Vec3::new(t.x, t.y, t.z),
                        });
                    }
                }
                true
            },
        );

        Ok(candidates)
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, layers: LayerMask) -> Result<bool, AiError> {
        if self.dirty {
            return Err(AiError::SensorUnavailable(
                "query pipeline out of date; call sync".to_string(),
            ));
        }

        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        let hit = self.query_pipeline.cast_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter(layers),
        );

        Ok(hit.is_some())
    }
}
