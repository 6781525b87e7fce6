use std::io::Cursor;

use jp_bsd::{
    BsdError, BsdLoader, FaceStage, PoseNoOp, PoseOutcome, Quaternion, RecordLayout,
    SectionKind, load_bsd,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const HEADER: usize = 2048;
const RECORD_SIZE: usize = 2124;
const COUNT_POSITION: usize = HEADER + 0x1D8;
const SECTION_TABLE: usize = HEADER + 0x53C;

// Section bases, relative to the header end
const ANIMATION_TABLE: i32 = 7000;
const ANIMATION_DATA: i32 = 7100;
const QUATERNION_DATA: i32 = 7300;
const HIERARCHY_DATA: i32 = 7400;
const FACE_TABLE: i32 = 7500;
const FACE_DATA: i32 = 7600;
const VERTEX_TABLE_INDEX: i32 = 7700;
const VERTEX_TABLE: i32 = 7800;
const VERTEX_DATA: i32 = 7900;

// Header-relative positions of per-object data
const STATIC_VERTICES: i32 = 8200;
const STATIC_COLORS: i32 = 8300;
const TEXTURED_FACES: i32 = 8400;
const EXTRA_TEXTURED_FACES: i32 = 8450;
const UNTEXTURED_FACES: i32 = 8500;
const TSP_BLOCK: i32 = 8600;
const CLIP_HEADER: i32 = 9000;

/// Sparse file image addressed by absolute position
#[derive(Default)]
struct Image {
    data: Vec<u8>,
}

impl Image {
    fn put(&mut self, position: usize, bytes: &[u8]) {
        if self.data.len() < position + bytes.len() {
            self.data.resize(position + bytes.len(), 0);
        }
        self.data[position..position + bytes.len()].copy_from_slice(bytes);
    }

    fn put_i32(&mut self, position: usize, v: i32) {
        self.put(position, &v.to_le_bytes());
    }

    fn put_i16(&mut self, position: usize, v: i16) {
        self.put(position, &v.to_le_bytes());
    }

    fn put_u16(&mut self, position: usize, v: u16) {
        self.put(position, &v.to_le_bytes());
    }

    /// Position of a header-relative offset
    fn abs(relative: i32) -> usize {
        relative as usize + HEADER
    }

    fn put_vertex(&mut self, position: usize, x: i16, y: i16, z: i16) {
        self.put_i16(position, x);
        self.put_i16(position + 2, y);
        self.put_i16(position + 4, z);
        self.put_i16(position + 6, 0);
    }
}

/// Knobs for a three-object descriptor: world, static, animated
struct Scene {
    object_count: i32,
    node_table: i32,
    bone_pad: i16,
    child1_of_second_bone: i32,
    clip_pad: u16,
    hierarchy_offset: i32,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            object_count: 3,
            node_table: (COUNT_POSITION + 4 + 3 * RECORD_SIZE - HEADER) as i32,
            bone_pad: -12851,
            child1_of_second_bone: -1,
            clip_pad: 0xCDCD,
            hierarchy_offset: 0,
        }
    }
}

impl Scene {
    fn record_position(index: usize) -> usize {
        COUNT_POSITION + 4 + index * RECORD_SIZE
    }

    fn build(&self) -> Vec<u8> {
        let mut image = Image::default();
        image.put_i32(HEADER + 0xD8, 0);
        image.put_i32(COUNT_POSITION, self.object_count);

        self.world_record(&mut image);
        self.static_record(&mut image);
        self.animated_record(&mut image);

        // The section table sits inside the first record's reserved bytes
        let bases = [
            self.node_table,
            ANIMATION_TABLE,
            ANIMATION_DATA,
            QUATERNION_DATA,
            HIERARCHY_DATA,
            FACE_TABLE,
            FACE_DATA,
            VERTEX_TABLE_INDEX,
            VERTEX_TABLE,
            VERTEX_DATA,
        ];
        for (i, base) in bases.into_iter().enumerate() {
            image.put_i32(SECTION_TABLE + i * 8, base);
            image.put_i32(SECTION_TABLE + i * 8 + 4, 1);
        }

        image.data
    }

    fn base_record(image: &mut Image, index: usize, id: u32, name: &str) -> usize {
        let start = Self::record_position(index);
        image.put(start, &id.to_le_bytes());
        // Every offset absent unless set below
        for field in 1..15 {
            image.put_i32(start + field * 4, -1);
        }
        image.put_i32(start + 0x7C, 0);
        for (i, scale) in [16 * 4096, 16 * 4096, 16 * 4096].into_iter().enumerate() {
            image.put_i32(start + 0xA0 + i * 4, scale);
        }
        image.put(start + 0x7C8, name.as_bytes());
        image.put(start + RECORD_SIZE - 1, &[0]);
        start
    }

    fn world_record(&self, image: &mut Image) {
        let start = Self::base_record(image, 0, 0, "WORLD");
        image.put_i32(start + 0x0C, TSP_BLOCK);

        let tsp = Image::abs(TSP_BLOCK);
        image.put_u16(tsp, 1);
        image.put_u16(tsp + 2, 3);
        for (i, (count, offset)) in [(1, 52), (0, 88), (0, 88), (0, 88), (0, 88), (0, 88)]
            .into_iter()
            .enumerate()
        {
            image.put_i32(tsp + 4 + i * 8, count);
            image.put_i32(tsp + 8 + i * 8, offset);
        }
        let node = tsp + 52;
        for (i, v) in [-64i16, -64, -64, 64, 64, 64].into_iter().enumerate() {
            image.put_i16(node + i * 2, v);
        }
        for i in 0..3 {
            image.put_i32(node + 12 + i * 4, -1);
        }
    }

    fn static_record(&self, image: &mut Image) {
        let start = Self::base_record(image, 1, 1, "CRATE.RSC");
        image.put_i32(start + 0x10, 7);
        image.put_i32(start + 0x14, 2);
        image.put_i32(start + 0x30, TEXTURED_FACES);
        image.put_i32(start + 0x34, UNTEXTURED_FACES);
        image.put_i32(start + 0x38, STATIC_COLORS);
        image.put_i32(start + 0x7C, STATIC_VERTICES);
        image.put_u16(start + 0x80, 3);
        // Unused offsets stored as zero are absent too
        image.put_i32(start + 0x20, 0);

        for (i, (x, y, z)) in [(0, 0, 0), (64, 0, 0), (0, 64, 0)].into_iter().enumerate() {
            image.put_vertex(Image::abs(STATIC_VERTICES) + i * 8, x, y, z);
        }
        for i in 0..3 {
            image.put(Image::abs(STATIC_COLORS) + i * 4, &[i as u8, 127, 0, 0]);
        }

        // One GT3 face
        let faces = Image::abs(TEXTURED_FACES);
        image.put_i32(faces, 1);
        let packet = faces + 4;
        image.put(packet + 4, &[127, 127, 127, 0]);
        image.put(packet + 12, &[8, 9]);
        image.put_u16(packet + 14, 0x0040);
        image.put(packet + 24, &[10, 11]);
        image.put_u16(packet + 26, 0x0107);
        image.put(packet + 36, &[12, 13]);
        image.put_i32(packet + 40, 2 | (1 << 10));

        // A GT3 block no record points at, appended by hand
        let faces = Image::abs(EXTRA_TEXTURED_FACES);
        image.put_i32(faces, 1);
        let packet = faces + 4;
        image.put(packet + 4, &[0, 127, 0, 0]);
        image.put(packet + 12, &[40, 41]);
        image.put(packet + 24, &[42, 43]);
        image.put(packet + 36, &[44, 45]);
        image.put_i32(packet + 40, 1 | (2 << 10));

        // Two G3 faces
        let faces = Image::abs(UNTEXTURED_FACES);
        image.put_i32(faces, 2);
        for i in 0..2 {
            let packet = faces + 4 + i * 32;
            image.put(packet + 4, &[63, 0, 0, 0]);
            image.put_i32(packet + 28, (1 << 20) | (2 << 10));
        }
    }

    fn animated_record(&self, image: &mut Image) {
        let start = Self::base_record(image, 2, 2, "SOLDIER.RSC");
        image.put_i32(start + 0x08, CLIP_HEADER);
        image.put_i32(start + 0x18, 0);
        image.put_i32(start + 0x1C, 0);
        image.put_i32(start + 0x28, self.hierarchy_offset);

        // Two vertex tables with one vertex each
        let index = Image::abs(VERTEX_TABLE_INDEX);
        image.put_i32(index, 0);
        image.put_i32(index + 4, 2);
        let tables = Image::abs(VERTEX_TABLE);
        image.put_i32(tables, 0);
        image.put_i32(tables + 4, 1);
        image.put_i32(tables + 8, 8);
        image.put_i32(tables + 12, 1);
        image.put_vertex(Image::abs(VERTEX_DATA), 10, 0, 0);
        image.put_vertex(Image::abs(VERTEX_DATA) + 8, 0, 5, 0);

        // One animated face
        let table = Image::abs(FACE_TABLE);
        image.put_i32(table, 0);
        image.put_i32(table + 4, 1);
        let face = Image::abs(FACE_DATA);
        image.put(face, &[1, 2, 3, 0, 4, 5, 6, 0, 7, 8, 9, 0]);
        image.put(face + 22, &[0, 0, 0, 1, 0, 0xE1]);

        // Root bone with one child1
        let bones = Image::abs(HIERARCHY_DATA);
        image.put_u16(bones, 0);
        image.put_i16(bones + 10, self.bone_pad);
        image.put_i32(bones + 12, 20);
        image.put_i32(bones + 16, -1);
        image.put_u16(bones + 20, 1);
        image.put_vertex(bones + 22, 100, 0, 0);
        image.put_i16(bones + 30, self.bone_pad);
        image.put_i32(bones + 32, self.child1_of_second_bone);
        image.put_i32(bones + 36, -1);

        // One clip in the first slot, the second slot is empty
        let clips = Image::abs(CLIP_HEADER);
        image.put_i16(clips, 2);
        image.put_u16(clips + 2, self.clip_pad);
        image.put_i32(clips + 4, 0);
        image.put_i32(clips + 8, -1);

        let entry = Image::abs(ANIMATION_TABLE);
        image.put(entry, &[3, 2]);
        image.put_u16(entry + 2, 0xCD00);
        image.put_i32(entry + 4, 0);

        let frames = Image::abs(ANIMATION_DATA);
        for (j, (interpolation, quaternions)) in [(0u8, 0), (0x11, -1), (0, 12)].into_iter().enumerate() {
            let frame = frames + j * 20;
            image.put(frame + 14, &[interpolation, 2]);
            image.put_i32(frame + 16, quaternions);
        }

        // Frame 0: two identity rotations. Frame 2: identity, then 90 degrees about Z
        let words = Image::abs(QUATERNION_DATA);
        for (i, word) in [0x4000_0000, 0, 0x0000_4000, 0x4000_0000, 0, 0x4000_4000]
            .into_iter()
            .enumerate()
        {
            image.put_i32(words + i * 4, word);
        }
    }
}

fn load(scene: &Scene) -> jp_bsd::LoadReport {
    let _ = env_logger::builder().is_test(true).try_init();
    load_bsd(&mut Cursor::new(scene.build())).unwrap()
}

#[test]
fn test_catalog() {
    let data = Scene::default().build();
    let catalog = BsdLoader::new()
        .read_catalog(&mut Cursor::new(&data))
        .unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.layout, RecordLayout::Standard);
    assert_eq!(catalog.lights.count, 0);
    assert_eq!(
        catalog.sections.entry(SectionKind::QuaternionData).offset,
        QUATERNION_DATA
    );
    let records: Vec<_> = catalog.records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(records, vec!["WORLD", "CRATE.RSC", "SOLDIER.RSC"]);
    assert_eq!(catalog.find(1).unwrap().reference(), Some(7));
    assert!(catalog.find(2).unwrap().is_animated());
}

#[test]
fn test_catalog_size_mismatch() {
    let scene = Scene {
        node_table: Scene::default().node_table + 4,
        ..Scene::default()
    };
    let err = load_bsd(&mut Cursor::new(scene.build())).unwrap_err();
    assert!(matches!(
        err,
        BsdError::RecordSizeMismatch {
            expected: 2124,
            actual: 2125,
            ..
        }
    ));
}

#[rstest]
#[case::empty(0)]
#[case::too_many(1001)]
#[case::negative(-3)]
fn test_catalog_count_out_of_range(#[case] count: i32) {
    let scene = Scene {
        object_count: count,
        ..Scene::default()
    };
    let err = load_bsd(&mut Cursor::new(scene.build())).unwrap_err();
    assert!(matches!(
        err,
        BsdError::InvalidCount {
            field: "render object count",
            ..
        }
    ));
}

#[test]
fn test_extended_layout_reads_shifted_count() {
    let data = Scene::default().build();
    let err = BsdLoader::new()
        .with_layout(RecordLayout::Extended)
        .read_catalog(&mut Cursor::new(&data))
        .unwrap_err();
    // That slot holds the world object's tsp offset
    assert!(matches!(
        err,
        BsdError::InvalidCount {
            field: "render object count",
            value: 8600
        }
    ));
}

#[test]
fn test_world_object_embeds_level() {
    let report = load(&Scene::default());
    assert!(report.failures.is_empty());
    assert_eq!(report.objects.len(), 3);

    let world = report.world().unwrap();
    assert_eq!(world.id, 0);
    let level = world.level.as_ref().unwrap();
    assert_eq!(level.header.version, 3);
    assert_eq!(level.nodes.len(), 1);
    assert!(world.vertices.is_empty());
}

#[test]
fn test_static_object() {
    let report = load(&Scene::default());
    let object = report.find(1).unwrap();

    assert_eq!(object.kind, 2);
    assert_eq!(object.referenced_id, 7);
    assert_eq!(object.vertices.len(), 3);
    assert_eq!(object.vertices[1].x, 64);
    assert_eq!(object.colors[2].r, 2);

    assert_eq!(object.textured_faces.len(), 1);
    let face = object.textured_faces[0];
    assert_eq!(face.vertices, [2, 1, 0]);
    assert_eq!(face.colors[0].r, 255);
    assert_eq!(face.cba, 0x0040);
    assert_eq!(face.tex_info.texture_page(), 7);
    assert_eq!(face.tex_info.color_mode(), 2);
    assert_eq!((face.uv[0].u, face.uv[2].v), (8, 13));

    assert_eq!(object.untextured_faces.len(), 2);
    assert_eq!(object.untextured_faces[1].vertices, [0, 2, 1]);
    // 63 truncates to zero before scaling
    assert_eq!(object.untextured_faces[0].colors[0].r, 0);
    assert!(!object.is_animated());
}

#[test]
fn test_static_append_across_stages() {
    let data = Scene::default().build();
    let mut cursor = Cursor::new(&data);
    let loader = BsdLoader::new();
    let catalog = loader.read_catalog(&mut cursor).unwrap();
    let mut object = loader
        .load_object(&mut cursor, &catalog.sections, &catalog.records[1])
        .unwrap();

    let added = object
        .append_faces(&mut cursor, FaceStage::SecondaryTextured, EXTRA_TEXTURED_FACES)
        .unwrap();
    assert_eq!(added, 1);
    object
        .append_faces(&mut cursor, FaceStage::PrimaryTextured, TEXTURED_FACES)
        .unwrap();

    // Batches land in call order after the faces the record loaded
    let first_u: Vec<_> = object.textured_faces.iter().map(|f| f.uv[0].u).collect();
    assert_eq!(first_u, vec![8, 40, 8]);
    assert_eq!(object.textured_faces[1].vertices, [1, 2, 0]);
    assert_eq!(object.textured_faces[1].colors[0].g, 255);
    assert_eq!(object.textured_faces[0], object.textured_faces[2]);
}

#[test]
fn test_animated_object() {
    let report = load(&Scene::default());
    let object = report.find(2).unwrap();

    assert!(object.is_animated());
    assert_eq!(object.vertex_tables.len(), 2);
    assert_eq!(object.vertex_tables[1].rest[0].y, 5);
    assert_eq!(object.animated_faces.len(), 1);
    assert_eq!(object.animated_faces[0].corners[2].table_index, 1);

    let skeleton = object.skeleton.as_ref().unwrap();
    assert_eq!(skeleton.len(), 2);
    assert_eq!(skeleton.nodes[0].child1, Some(1));
    assert_eq!(skeleton.nodes[1].position.x, 100);

    assert_eq!(object.animations.len(), 2);
    assert!(object.animations[1].is_empty());
    let clip = &object.animations[0];
    assert_eq!(clip.frames.len(), 3);
    assert_eq!(clip.entry.unwrap().affected_vertex_count, 2);
    assert_eq!(
        clip.frames[2].decoded,
        Some(vec![
            Quaternion::new(0, 0, 0, 2048),
            Quaternion::new(0, 0, 2048, 2048)
        ])
    );
    // Rebuilt halfway between frames 0 and 2
    assert_eq!(
        clip.frames[1].decoded,
        Some(vec![
            Quaternion::new(0, 0, 0, 4096),
            Quaternion::new(0, 0, 1831, 3663)
        ])
    );
    assert_eq!(clip.unresolved_frames(), 0);
}

#[test]
fn test_pose_animated_object() {
    let mut report = load(&Scene::default());
    let object = report.objects.iter_mut().find(|o| o.id == 2).unwrap();

    assert_eq!(object.set_animation_pose(0, 0, false), PoseOutcome::Applied);
    assert_eq!(object.vertex_tables[0].current[0].x, 10);
    let posed = object.vertex_tables[1].current[0];
    assert_eq!((posed.x, posed.y, posed.z), (100, 5, 0));

    assert_eq!(
        object.set_animation_pose(1, 0, false),
        PoseOutcome::NoOp(PoseNoOp::EmptyAnimation { animation: 1 })
    );
    assert_eq!(object.current_pose(), Some((0, 0)));
}

#[test]
fn test_pose_rotates_child_bone() {
    let mut report = load(&Scene::default());
    let object = report.objects.iter_mut().find(|o| o.id == 2).unwrap();

    assert!(object.set_animation_pose(0, 2, false).is_applied());
    // The transposed 90 degree rotation maps +Y onto +X
    let posed = object.vertex_tables[1].current[0];
    assert!((i32::from(posed.x) - 105).abs() <= 1, "got {posed:?}");
    assert!(i32::from(posed.y).abs() <= 1, "got {posed:?}");
}

#[test]
fn test_bad_bone_pad_only_fails_that_object() {
    let report = load(&Scene {
        bone_pad: 0,
        ..Scene::default()
    });
    assert_eq!(report.objects.len(), 2);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!((failure.index, failure.id), (2, 2));
    assert!(matches!(
        failure.error,
        BsdError::InvalidPadding {
            field: "bone record",
            ..
        }
    ));
}

#[test]
fn test_cyclic_hierarchy() {
    let report = load(&Scene {
        child1_of_second_bone: 0,
        ..Scene::default()
    });
    assert!(matches!(
        report.failures[0].error,
        BsdError::CyclicHierarchy { offset: 0 }
    ));
}

#[test]
fn test_bad_clip_pad() {
    let report = load(&Scene {
        clip_pad: 0,
        ..Scene::default()
    });
    assert!(matches!(
        report.failures[0].error,
        BsdError::InvalidPadding {
            expected: 0xCDCD,
            actual: 0,
            ..
        }
    ));
}

#[test]
fn test_missing_hierarchy_offset() {
    let report = load(&Scene {
        hierarchy_offset: -1,
        ..Scene::default()
    });
    assert!(matches!(
        report.failures[0].error,
        BsdError::InvalidOffset {
            field: "hierarchy offset",
            value: -1
        }
    ));
}
