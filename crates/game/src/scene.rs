//! Scene host: a hecs world of drawables with visibility flags.

use effects::{IslandBobber, SceneVisibility};
use engine_core::{DepthInvisible, IslandPiece, Name, Visible};
use glam::Mat4;
use hecs::{Entity, World};
use renderer::{MaterialId, MeshId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawableKind {
    Homespace,
    Island,
    Tree,
    CloudSurface,
    Fog,
}

#[derive(Debug, Clone, Copy)]
pub struct Drawable {
    pub mesh: MeshId,
    pub kind: DrawableKind,
}

/// World transform of a single-instance drawable.
#[derive(Debug, Clone, Copy)]
pub struct WorldMatrix(pub Mat4);

/// World transforms of an instanced drawable, one per copy.
#[derive(Debug, Clone, Default)]
pub struct InstanceMatrices(pub Vec<Mat4>);

#[derive(Debug, Clone, Copy)]
pub struct LitMaterial(pub MaterialId);

/// What the depth pre-pass draws: one batch per visible mesh.
#[derive(Debug, Clone)]
pub struct DepthBatch {
    pub mesh: MeshId,
    pub matrices: Vec<Mat4>,
}

/// What the main pass draws, grouped by program.
#[derive(Debug, Clone, Default)]
pub struct MainBatches {
    pub lit: Vec<(MeshId, MaterialId, Mat4)>,
    pub trees: Option<MeshId>,
    pub cloud: Option<(MeshId, Mat4)>,
    pub fog: Option<MeshId>,
}

#[derive(Default)]
pub struct Scene {
    world: World,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_lit(
        &mut self,
        name: &str,
        kind: DrawableKind,
        mesh: MeshId,
        material: MaterialId,
        matrix: Mat4,
    ) -> Entity {
        self.world.spawn((
            Name(name.to_string()),
            Drawable { mesh, kind },
            LitMaterial(material),
            WorldMatrix(matrix),
            Visible(true),
        ))
    }

    pub fn spawn_island(
        &mut self,
        name: &str,
        mesh: MeshId,
        material: MaterialId,
        piece: usize,
        matrix: Mat4,
    ) -> Entity {
        self.world.spawn((
            Name(name.to_string()),
            Drawable {
                mesh,
                kind: DrawableKind::Island,
            },
            LitMaterial(material),
            WorldMatrix(matrix),
            IslandPiece { index: piece },
            Visible(true),
        ))
    }

    pub fn spawn_cloud(&mut self, mesh: MeshId, matrix: Mat4) -> Entity {
        self.world.spawn((
            Name("cloud sea".to_string()),
            Drawable {
                mesh,
                kind: DrawableKind::CloudSurface,
            },
            WorldMatrix(matrix),
            Visible(true),
        ))
    }

    pub fn spawn_fog(&mut self, mesh: MeshId) -> Entity {
        self.world.spawn((
            Name("fog".to_string()),
            Drawable {
                mesh,
                kind: DrawableKind::Fog,
            },
            DepthInvisible,
            Visible(true),
        ))
    }

    pub fn spawn_trees(&mut self, mesh: MeshId, matrices: Vec<Mat4>) -> Entity {
        self.world.spawn((
            Name("trees".to_string()),
            Drawable {
                mesh,
                kind: DrawableKind::Tree,
            },
            InstanceMatrices(matrices),
            Visible(true),
        ))
    }

    /// Copy the bobber's current pose onto every island piece.
    pub fn update_islands(&mut self, bobber: &IslandBobber) {
        if bobber.is_empty() {
            return;
        }
        let matrices = bobber.world_matrices();
        for (_, (piece, matrix)) in self.world.query_mut::<(&IslandPiece, &mut WorldMatrix)>() {
            if let Some(m) = matrices.get(piece.index) {
                matrix.0 = *m;
            }
        }
    }

    /// Visible drawables for the depth pre-pass. Entities tagged
    /// `DepthInvisible` never appear.
    pub fn depth_batches(&self) -> Vec<DepthBatch> {
        let mut batches = Vec::new();
        let mut query = self.world.query::<(
            &Drawable,
            &Visible,
            Option<&WorldMatrix>,
            Option<&InstanceMatrices>,
        )>()
        .without::<&DepthInvisible>();
        for (_, (drawable, visible, single, many)) in query.iter() {
            if !visible.0 {
                continue;
            }
            let matrices = match (single, many) {
                (_, Some(many)) => many.0.clone(),
                (Some(single), None) => vec![single.0],
                (None, None) => continue,
            };
            batches.push(DepthBatch {
                mesh: drawable.mesh,
                matrices,
            });
        }
        batches
    }

    /// Visible drawables for the main pass. Homespace parts come before island
    /// pieces in `lit`.
    pub fn main_batches(&self) -> MainBatches {
        let mut out = MainBatches::default();
        let mut islands = Vec::new();
        let mut query = self
            .world
            .query::<(&Drawable, &Visible, Option<&WorldMatrix>, Option<&LitMaterial>)>();
        for (_, (drawable, visible, matrix, material)) in query.iter() {
            if !visible.0 {
                continue;
            }
            match drawable.kind {
                DrawableKind::Homespace | DrawableKind::Island => {
                    if let (Some(m), Some(mat)) = (matrix, material) {
                        let draw = (drawable.mesh, mat.0, m.0);
                        if drawable.kind == DrawableKind::Homespace {
                            out.lit.push(draw);
                        } else {
                            islands.push(draw);
                        }
                    }
                }
                DrawableKind::Tree => out.trees = Some(drawable.mesh),
                DrawableKind::CloudSurface => {
                    if let Some(m) = matrix {
                        out.cloud = Some((drawable.mesh, m.0));
                    }
                }
                DrawableKind::Fog => out.fog = Some(drawable.mesh),
            }
        }
        out.lit.extend(islands);
        out
    }
}

impl SceneVisibility for Scene {
    type Id = Entity;

    fn set_visible(&mut self, id: Entity, visible: bool) -> Option<bool> {
        let mut flag = self.world.get::<&mut Visible>(id).ok()?;
        let previous = flag.0;
        flag.0 = visible;
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use effects::VisibilityScope;
    use glam::Vec3;

    fn scene() -> (Scene, Entity, Entity, Entity) {
        let mut scene = Scene::new();
        let home = scene.spawn_lit(
            "glass",
            DrawableKind::Homespace,
            MeshId(0),
            MaterialId(0),
            Mat4::IDENTITY,
        );
        let cloud = scene.spawn_cloud(MeshId(1), Mat4::from_translation(Vec3::new(0.0, -65.0, 0.0)));
        let fog = scene.spawn_fog(MeshId(2));
        (scene, home, cloud, fog)
    }

    #[test]
    fn fog_never_reaches_the_depth_pass() {
        let (scene, ..) = scene();
        let meshes: Vec<MeshId> = scene.depth_batches().iter().map(|b| b.mesh).collect();
        assert!(meshes.contains(&MeshId(0)));
        assert!(meshes.contains(&MeshId(1)));
        assert!(!meshes.contains(&MeshId(2)));
    }

    #[test]
    fn hidden_entities_drop_out_and_come_back() {
        let (mut scene, home, cloud, _) = scene();
        {
            let scope = VisibilityScope::hide(&mut scene, [home, cloud]);
            assert_eq!(scope.len(), 2);
            assert!(scope.depth_batches().is_empty());
        }
        assert!(scene.world.get::<&Visible>(home).unwrap().0);
        assert_eq!(scene.depth_batches().len(), 2);
    }

    #[test]
    fn unknown_entity_has_no_flag() {
        let (mut scene, home, ..) = scene();
        scene.world.despawn(home).unwrap();
        assert_eq!(scene.set_visible(home, false), None);
    }

    #[test]
    fn main_batches_group_by_program() {
        let (mut scene, ..) = scene();
        scene.spawn_trees(MeshId(3), vec![Mat4::IDENTITY; 2]);
        let batches = scene.main_batches();
        assert_eq!(batches.lit.len(), 1);
        assert_eq!(batches.trees, Some(MeshId(3)));
        assert_eq!(batches.cloud.map(|c| c.0), Some(MeshId(1)));
        assert_eq!(batches.fog, Some(MeshId(2)));
    }

    #[test]
    fn homespace_draws_before_islands() {
        let mut scene = Scene::new();
        scene.spawn_island("rock", MeshId(7), MaterialId(1), 0, Mat4::IDENTITY);
        scene.spawn_lit("wall", DrawableKind::Homespace, MeshId(8), MaterialId(2), Mat4::IDENTITY);
        let lit = scene.main_batches().lit;
        assert_eq!(lit.iter().map(|d| d.0).collect::<Vec<_>>(), vec![MeshId(8), MeshId(7)]);
    }

    #[test]
    fn tree_depth_batch_carries_every_instance() {
        let mut scene = Scene::new();
        scene.spawn_trees(MeshId(3), vec![Mat4::IDENTITY; 2]);
        let batches = scene.depth_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].matrices.len(), 2);
    }

    #[test]
    fn islands_follow_the_bobber() {
        use effects::islands::island_group_transform;
        use engine_core::Transform;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut scene = Scene::new();
        let rest = [Transform::from_position(Vec3::new(0.0, 3.0, 0.0))];
        let mut bobber = IslandBobber::new(&rest, &mut StdRng::seed_from_u64(1));
        let island = scene.spawn_island("rock", MeshId(4), MaterialId(1), 0, Mat4::IDENTITY);
        bobber.tick(10.0);
        scene.update_islands(&bobber);
        let m = scene.world.get::<&WorldMatrix>(island).unwrap().0;
        let expected = island_group_transform().mul_transform(bobber.local_transform(0));
        assert_eq!(m, expected);
    }
}
