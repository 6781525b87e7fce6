use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use log::{debug, info, warn};

use crate::animation::read_clips;
use crate::catalog::{Catalog, RecordLayout, RenderObjectRecord};
use crate::error::{BsdError, Result};
use crate::face::FaceStage;
use crate::hierarchy::BoneTree;
use crate::render_object::RenderObject;
use crate::section::{BSD_HEADER_SIZE, SectionTable, is_linked, is_present, resolve_absolute};
use crate::types::{BsdColor, BsdVertex};
use crate::vertex::{read_animated_faces, read_vertex_tables};

/// A render object that failed to load
#[derive(Debug)]
pub struct LoadFailure {
    /// Position of the record in the catalog
    pub index: usize,
    pub id: u32,
    pub error: BsdError,
}

/// Everything [`BsdLoader::load_all`] produced
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully loaded objects, in catalog order
    pub objects: Vec<RenderObject>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn find(&self, id: u32) -> Option<&RenderObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn world(&self) -> Option<&RenderObject> {
        self.objects.iter().find(|o| o.is_world())
    }
}

/// Loader for BSD scene descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct BsdLoader {
    layout: RecordLayout,
}

impl BsdLoader {
    /// Create a loader for the standard record layout
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    pub fn read_catalog<R: Read + Seek>(&self, reader: &mut R) -> Result<Catalog> {
        Catalog::read(reader, self.layout)
    }

    /// Load every render object in catalog order.
    ///
    /// A catalog error is fatal. A failing object is logged, recorded in
    /// [`LoadReport::failures`] and skipped.
    pub fn load_all<R: Read + Seek>(&self, reader: &mut R) -> Result<LoadReport> {
        let catalog = self.read_catalog(reader)?;
        let mut report = LoadReport::default();
        for (index, record) in catalog.records.iter().enumerate() {
            match self.load_object(reader, &catalog.sections, record) {
                Ok(object) => report.objects.push(object),
                Err(error) => {
                    warn!(
                        "Skipping render object {} (id {}): {}",
                        index, record.id, error
                    );
                    report.failures.push(LoadFailure {
                        index,
                        id: record.id,
                        error,
                    });
                }
            }
        }
        info!(
            "Loaded {} of {} render objects",
            report.objects.len(),
            catalog.records.len()
        );
        Ok(report)
    }

    /// Load one render object and everything it owns.
    ///
    /// The object is only returned when every stage succeeds.
    pub fn load_object<R: Read + Seek>(
        &self,
        reader: &mut R,
        sections: &SectionTable,
        record: &RenderObjectRecord,
    ) -> Result<RenderObject> {
        let mut object = RenderObject::from_record(record);
        debug!("Loading render object {} '{}'", record.id, record.file_name);

        if record.is_world() {
            if record.tsp_offset <= 0 {
                return Err(BsdError::InvalidOffset {
                    field: "tsp offset",
                    value: i64::from(record.tsp_offset),
                });
            }
            let base = record.tsp_offset as u64 + BSD_HEADER_SIZE;
            object.level = Some(jp_tsp::parse_tsp(reader, base)?);
            return Ok(object);
        }

        let count = usize::from(record.vertex_count);
        if is_present(record.vertex_offset) {
            object.vertices = read_records::<_, BsdVertex>(
                reader,
                resolve_absolute(record.vertex_offset, "vertex offset")?,
                count,
            )?;
        }
        if is_present(record.color_offset) {
            object.colors = read_records::<_, BsdColor>(
                reader,
                resolve_absolute(record.color_offset, "color offset")?,
                count,
            )?;
        }
        for stage in FaceStage::ALL {
            let offset = stage.offset(record);
            if is_present(offset) {
                object.append_faces(reader, stage, offset)?;
            }
        }

        if record.is_animated() {
            load_animated(reader, sections, record, &mut object)?;
        }
        Ok(object)
    }
}

fn load_animated<R: Read + Seek>(
    reader: &mut R,
    sections: &SectionTable,
    record: &RenderObjectRecord,
    object: &mut RenderObject,
) -> Result<()> {
    for (field, offset) in [
        ("vertex table index offset", record.vertex_table_index_offset),
        ("animated face table offset", record.face_table_offset),
        ("hierarchy offset", record.hierarchy_offset),
    ] {
        if !is_linked(offset) {
            return Err(BsdError::InvalidOffset {
                field,
                value: i64::from(offset),
            });
        }
    }

    object.vertex_tables = read_vertex_tables(reader, sections, record.vertex_table_index_offset)?;
    let tables = object.vertex_tables.len();
    object.animated_faces = read_animated_faces(reader, sections, record.face_table_offset, tables)?;
    object.skeleton = Some(BoneTree::read(
        reader,
        sections,
        record.hierarchy_offset,
        tables,
    )?);
    object.animations = read_clips(reader, sections, record.animation_data_offset)?;
    debug!(
        "Object {}: {} vertex tables, {} animated faces, {} animations",
        record.id,
        tables,
        object.animated_faces.len(),
        object.animations.len()
    );
    Ok(())
}

fn read_records<R, T>(reader: &mut R, position: u64, count: usize) -> Result<Vec<T>>
where
    R: Read + Seek,
    T: for<'a> BinRead<Args<'a> = ()> + binrw::meta::ReadEndian,
{
    reader.seek(SeekFrom::Start(position))?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(T::read(reader)?);
    }
    Ok(items)
}
