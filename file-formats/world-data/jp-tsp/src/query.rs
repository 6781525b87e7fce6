//! KD-tree height query over the collision mesh
//!
//! The collision tree partitions the X/Z footprint of a level with
//! axis-aligned splits. Split values are relative to the running lower bound
//! of the current cell, so the bound must be carried along the descent.
//!
//! # Algorithm
//!
//! 1. Reject points outside the collision bounds
//! 2. Start at node 0 with the header's minimum X and Z as the cell origin
//! 3. A leaf ends the descent and yields a run of the face-index list
//! 4. A negative `child1` splits on Z, otherwise on X; the far branch moves the
//!    matching cell origin up to the split
//! 5. Every face in the run whose normal does not point up and whose X/Z
//!    triangle contains the point is solved for Y
//! 6. The smallest Y wins

use log::trace;

use crate::collision::{CollisionFace, CollisionMesh};

/// Normals with a smaller absolute Y are treated as flat
pub const NEAR_FLAT_THRESHOLD: i32 = 257;

/// Scale of the fixed-point normal components
const NORMAL_SCALE: f32 = 32768.0;

/// Result of a successful height query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct CollisionHit {
    /// Floor height at the queried point
    pub y: i32,
    /// Property set of the leaf that produced the hit
    pub property_set_file_index: i16,
}

impl CollisionMesh {
    /// Walk the KD-tree down to the leaf covering `(x, z)`.
    ///
    /// Returns the leaf's node index, or `None` when the point is outside the
    /// mesh or the tree is malformed.
    pub fn find_leaf(&self, x: i32, z: i32) -> Option<usize> {
        if !self.contains(x, z) {
            return None;
        }

        let mut min_x = i32::from(self.header.min_x);
        let mut min_z = i32::from(self.header.min_z);
        let mut current = 0usize;

        // A well-formed tree never visits more nodes than it has
        for _ in 0..self.kd_nodes.len() {
            let node = self.kd_nodes.get(current)?;
            if node.is_leaf() {
                return Some(current);
            }

            let next = if node.child1 < 0 {
                let split = min_z + i32::from(node.split);
                if z < split {
                    node.child0
                } else {
                    min_z = split;
                    !node.child1
                }
            } else {
                let split = min_x + i32::from(node.split);
                if x < split {
                    node.child0
                } else {
                    min_x = split;
                    node.child1
                }
            };
            trace!("KD node {} -> {}", current, next);
            current = usize::try_from(next).ok()?;
        }
        None
    }

    /// Floor height at `(x, z)`: the lowest solved Y of every face in the
    /// covering leaf that contains the point.
    pub fn height_at(&self, x: i32, z: i32) -> Option<CollisionHit> {
        let leaf = &self.kd_nodes[self.find_leaf(x, z)?];
        let (start, len) = leaf.face_run()?;
        let start = usize::try_from(start).ok()?;

        let y = (start..start + len as usize)
            .filter_map(|slot| {
                let face_index = usize::try_from(*self.face_indices.get(slot)?).ok()?;
                let face = self.faces.get(face_index)?;
                if self.point_in_face(x, z, face) {
                    self.face_height(x, z, face)
                } else {
                    None
                }
            })
            .min()?;

        Some(CollisionHit {
            y,
            property_set_file_index: leaf.property_set_file_index,
        })
    }

    /// Sign test against the face's three X/Z edges.
    ///
    /// Faces whose normal points up are never walkable and always fail. A
    /// point on an edge counts as inside. A face naming a missing normal or
    /// vertex never contains the point.
    pub fn point_in_face(&self, x: i32, z: i32, face: &CollisionFace) -> bool {
        let Some(normal) = self.normals.get(usize::from(face.normal_index)) else {
            return false;
        };
        if normal.y > 0 {
            return false;
        }

        let corner = |i: u16| {
            self.vertices
                .get(usize::from(i))
                .map(|v| (i64::from(v.x), i64::from(v.z)))
        };
        let (Some(a), Some(b), Some(c)) = (corner(face.v0), corner(face.v1), corner(face.v2))
        else {
            return false;
        };
        let p = (i64::from(x), i64::from(z));

        let d1 = edge_sign(p, a, b);
        let d2 = edge_sign(p, b, c);
        let d3 = edge_sign(p, c, a);

        let negative = d1 < 0 || d2 < 0 || d3 < 0;
        let positive = d1 > 0 || d2 > 0 || d3 > 0;
        !(negative && positive)
    }

    /// Solve the face plane for Y at `(x, z)`.
    ///
    /// Returns `None` when the face names a missing normal or vertex.
    pub fn face_height(&self, x: i32, z: i32, face: &CollisionFace) -> Option<i32> {
        let normal = self.normals.get(usize::from(face.normal_index))?;
        if i32::from(normal.y).abs() < NEAR_FLAT_THRESHOLD {
            return self.vertices.get(usize::from(face.v0)).map(|v| i32::from(v.y));
        }

        let nx = f32::from(normal.x) / NORMAL_SCALE;
        let ny = f32::from(normal.y) / NORMAL_SCALE;
        let nz = f32::from(normal.z) / NORMAL_SCALE;
        let y = -(nx * x as f32 + nz * z as f32 + f32::from(face.plane_distance)) / ny;
        Some(y as i32)
    }
}

fn edge_sign(p: (i64, i64), a: (i64, i64), b: (i64, i64)) -> i64 {
    (p.0 - b.0) * (a.1 - b.1) - (a.0 - b.0) * (p.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionHeader, KdNode};
    use crate::types::TspVertex;
    use pretty_assertions::assert_eq;

    fn leaf(count: i16, start: i16, property: i16) -> KdNode {
        KdNode {
            child0: !count,
            child1: start,
            split: 0,
            property_set_file_index: property,
        }
    }

    fn face(v: [u16; 3], normal_index: u16, plane_distance: i16) -> CollisionFace {
        CollisionFace {
            v0: v[0],
            v1: v[1],
            v2: v[2],
            normal_index,
            plane_distance,
        }
    }

    fn header(kd: usize, faces: usize) -> CollisionHeader {
        CollisionHeader {
            min_x: -100,
            min_z: -100,
            max_x: 100,
            max_z: 100,
            num_kd_nodes: kd as u16,
            num_face_indices: faces as u16,
            num_vertices: 0,
            num_normals: 0,
            num_faces: faces as u16,
        }
    }

    /// Two triangles covering the same square at different heights
    fn overlapping_mesh() -> CollisionMesh {
        CollisionMesh {
            header: header(1, 2),
            kd_nodes: vec![leaf(2, 0, 9)],
            face_indices: vec![0, 1],
            vertices: vec![
                TspVertex::new(-50, -40, -50),
                TspVertex::new(50, -40, -50),
                TspVertex::new(0, -40, 50),
                TspVertex::new(-50, -90, -50),
                TspVertex::new(50, -90, -50),
                TspVertex::new(0, -90, 50),
            ],
            normals: vec![TspVertex::new(0, -200, 0)],
            faces: vec![face([0, 1, 2], 0, 0), face([3, 4, 5], 0, 0)],
        }
    }

    #[test]
    fn test_near_flat_face_returns_raw_vertex_y() {
        let mut mesh = overlapping_mesh();
        mesh.kd_nodes = vec![leaf(1, 0, 2)];
        let hit = mesh.height_at(0, 0).unwrap();
        assert_eq!(
            hit,
            CollisionHit {
                y: -40,
                property_set_file_index: 2
            }
        );
    }

    #[test]
    fn test_overlapping_faces_return_minimum() {
        let mesh = overlapping_mesh();
        assert_eq!(mesh.height_at(0, 0).map(|h| h.y), Some(-90));
    }

    #[test]
    fn test_point_outside_triangle_misses() {
        let mesh = overlapping_mesh();
        assert_eq!(mesh.height_at(-60, 60), None);
    }

    #[test]
    fn test_point_outside_bounds_misses() {
        let mesh = overlapping_mesh();
        assert_eq!(mesh.find_leaf(101, 0), None);
        assert_eq!(mesh.height_at(0, -101), None);
    }

    #[test]
    fn test_upward_normal_rejected() {
        let mut mesh = overlapping_mesh();
        mesh.normals = vec![TspVertex::new(0, 1, 0)];
        assert_eq!(mesh.height_at(0, 0), None);
    }

    #[test]
    fn test_point_on_edge_counts_as_inside() {
        let mesh = overlapping_mesh();
        assert!(mesh.point_in_face(0, -50, &mesh.faces[0]));
    }

    #[test]
    fn test_dangling_face_indices_miss() {
        let mut mesh = overlapping_mesh();
        mesh.kd_nodes = vec![leaf(2, 0, 0)];
        mesh.faces[0].normal_index = 7;
        mesh.faces[1].v2 = 40;

        assert!(!mesh.point_in_face(0, 0, &mesh.faces[0]));
        assert!(!mesh.point_in_face(0, 0, &mesh.faces[1]));
        assert_eq!(mesh.face_height(0, 0, &mesh.faces[0]), None);
        assert_eq!(mesh.height_at(0, 0), None);
    }

    #[test]
    fn test_sloped_face_solves_plane() {
        let mut mesh = overlapping_mesh();
        mesh.kd_nodes = vec![leaf(1, 0, 0)];
        // Level plane y = -64 with a fully downward normal
        mesh.normals = vec![TspVertex::new(0, -32767, 0)];
        mesh.faces[0].plane_distance = -64;
        let y = mesh.height_at(10, 10).unwrap().y;
        assert!((-65..=-63).contains(&y), "got {y}");
    }

    #[test]
    fn test_descent_updates_cell_origin() {
        // Root splits on X at -100 + 100 = 0; the right child splits on Z at
        // -100 + 150 = 50, then the far side of that is leaf 4.
        let mut mesh = overlapping_mesh();
        mesh.kd_nodes = vec![
            KdNode {
                child0: 1,
                child1: 2,
                split: 100,
                property_set_file_index: 0,
            },
            leaf(0, 0, 1),
            KdNode {
                child0: 3,
                child1: !4,
                split: 150,
                property_set_file_index: 0,
            },
            leaf(0, 0, 3),
            leaf(0, 0, 4),
        ];
        assert_eq!(mesh.find_leaf(-10, 0), Some(1));
        assert_eq!(mesh.find_leaf(10, 0), Some(3));
        assert_eq!(mesh.find_leaf(10, 60), Some(4));
    }

    #[test]
    fn test_cyclic_tree_terminates() {
        let mut mesh = overlapping_mesh();
        mesh.kd_nodes = vec![KdNode {
            child0: 0,
            child1: 0,
            split: 0,
            property_set_file_index: 0,
        }];
        assert_eq!(mesh.find_leaf(0, 0), None);
    }
}
