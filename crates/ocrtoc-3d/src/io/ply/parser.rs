use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{
    properties::{
        read_element, PlyDataType, PlyElementDefinition, PlyFormat, PlyPropertyDefinition,
        PlyPropertyKind, PlyValue,
    },
    PlyError,
};
use crate::{
    mesh::TriangleMesh,
    pointcloud::{ColoredPointCloud, DEFAULT_COLOR},
};

// The parsed header of a PLY file.
#[derive(Debug, PartialEq, Clone)]
struct PlyHeader {
    format: PlyFormat,
    // the elements in storage order
    elements: Vec<PlyElementDefinition>,
}

impl PlyHeader {
    fn element(&self, name: &str) -> Option<&PlyElementDefinition> {
        self.elements.iter().find(|e| e.name == name)
    }
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(PlyError::MalformedHeader("missing magic number".to_string()));
    }

    let mut format = None;
    let mut elements: Vec<PlyElementDefinition> = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::MalformedHeader("missing end_header".to_string()));
        }

        let parts = line.split_whitespace().collect::<Vec<_>>();
        match parts.as_slice() {
            ["end_header"] => break,
            ["format", fmt, _version] => format = Some(PlyFormat::parse(fmt)?),
            ["comment", ..] | ["obj_info", ..] | [] => {}
            ["element", name, count] => {
                let count = count
                    .parse::<usize>()
                    .map_err(|_| PlyError::MalformedHeader(line.trim().to_string()))?;
                elements.push(PlyElementDefinition {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count, item, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| PlyError::MalformedHeader(line.trim().to_string()))?;
                element.properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    kind: PlyPropertyKind::List {
                        count: PlyDataType::parse(count)?,
                        item: PlyDataType::parse(item)?,
                    },
                });
            }
            ["property", data_type, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| PlyError::MalformedHeader(line.trim().to_string()))?;
                element.properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    kind: PlyPropertyKind::Scalar(PlyDataType::parse(data_type)?),
                });
            }
            _ => return Err(PlyError::MalformedHeader(line.trim().to_string())),
        }
    }

    let format = format.ok_or_else(|| PlyError::MalformedHeader("missing format".to_string()))?;

    Ok(PlyHeader { format, elements })
}

// position of a scalar property in the element, with its type
fn scalar_index(
    element: &PlyElementDefinition,
    name: &str,
) -> Result<Option<(usize, PlyDataType)>, PlyError> {
    match element.property(name) {
        None => Ok(None),
        Some((idx, prop)) => match prop.kind {
            PlyPropertyKind::Scalar(data_type) => Ok(Some((idx, data_type))),
            PlyPropertyKind::List { .. } => {
                Err(PlyError::UnsupportedProperty(format!("list property {name}")))
            }
        },
    }
}

fn scalar_at(values: &[PlyValue], idx: usize) -> Result<f64, PlyError> {
    values
        .get(idx)
        .and_then(PlyValue::as_scalar)
        .ok_or_else(|| PlyError::InvalidValue(format!("property {idx}")))
}

// decoded vertex element: positions and, if present, normalized colors
struct VertexData {
    points: Vec<[f64; 3]>,
    colors: Option<Vec<[f64; 3]>>,
}

struct VertexLayout {
    xyz: [usize; 3],
    rgb: Option<([usize; 3], f64)>,
}

impl VertexLayout {
    fn new(element: &PlyElementDefinition) -> Result<Self, PlyError> {
        let mut xyz = [0usize; 3];
        for (slot, name) in xyz.iter_mut().zip(["x", "y", "z"]) {
            let (idx, _) = scalar_index(element, name)?
                .ok_or_else(|| PlyError::MissingProperty(format!("vertex {name}")))?;
            *slot = idx;
        }

        let (r, g, b) = (
            scalar_index(element, "red")?,
            scalar_index(element, "green")?,
            scalar_index(element, "blue")?,
        );
        let rgb = match (r, g, b) {
            (Some((r, dtype)), Some((g, _)), Some((b, _))) => {
                Some(([r, g, b], dtype.color_scale()))
            }
            _ => None,
        };

        Ok(Self { xyz, rgb })
    }

    fn decode(&self, values: &[PlyValue], data: &mut VertexData) -> Result<(), PlyError> {
        let [ix, iy, iz] = self.xyz;
        data.points.push([
            scalar_at(values, ix)?,
            scalar_at(values, iy)?,
            scalar_at(values, iz)?,
        ]);

        if let (Some(([ir, ig, ib], scale)), Some(colors)) = (self.rgb, data.colors.as_mut()) {
            colors.push([
                scalar_at(values, ir)? / scale,
                scalar_at(values, ig)? / scale,
                scalar_at(values, ib)? / scale,
            ]);
        }
        Ok(())
    }
}

// body of the file, decoded element by element
struct PlyBody {
    vertices: VertexData,
    faces: Vec<Vec<usize>>,
}

fn read_body<R: BufRead>(
    reader: &mut R,
    header: &PlyHeader,
    with_faces: bool,
) -> Result<PlyBody, PlyError> {
    let vertex_element = header
        .element("vertex")
        .ok_or_else(|| PlyError::MissingProperty("vertex element".to_string()))?;
    let layout = VertexLayout::new(vertex_element)?;

    let mut vertices = VertexData {
        points: Vec::with_capacity(vertex_element.count),
        colors: layout
            .rgb
            .map(|_| Vec::with_capacity(vertex_element.count)),
    };
    let mut faces = Vec::new();

    for (pos, element) in header.elements.iter().enumerate() {
        // stop once nothing needed is left in the file
        let needed_later = header.elements[pos..]
            .iter()
            .any(|e| e.name == "vertex" || (with_faces && e.name == "face"));
        if !needed_later {
            break;
        }

        let face_property = match element.name.as_str() {
            "face" if with_faces => element
                .property("vertex_indices")
                .or_else(|| element.property("vertex_index"))
                .map(|(idx, _)| idx),
            _ => None,
        };

        for _ in 0..element.count {
            let values = read_element(reader, header.format, element)?;
            if element.name == "vertex" {
                layout.decode(&values, &mut vertices)?;
            } else if let Some(idx) = face_property {
                let indices = values
                    .get(idx)
                    .and_then(PlyValue::as_list)
                    .ok_or_else(|| PlyError::InvalidValue("face indices".to_string()))?;
                faces.push(
                    indices
                        .iter()
                        .map(|&i| {
                            if i < 0.0 {
                                Err(PlyError::InvalidValue(format!("vertex index {i}")))
                            } else {
                                Ok(i as usize)
                            }
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                );
            }
        }
    }

    Ok(PlyBody { vertices, faces })
}

fn open_ply(path: impl AsRef<Path>) -> Result<(BufReader<File>, PlyHeader), PlyError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let header = parse_header(&mut reader)?;
    Ok((reader, header))
}

/// Read a triangle mesh from a PLY file.
///
/// Supports ascii and binary bodies. Polygons with more than three vertices
/// are split into a triangle fan; polygons with fewer are ignored. Vertex
/// colors are read from `red`, `green` and `blue` when present and scaled to
/// `[0, 1]`.
///
/// # Arguments
///
/// * `path` - The path to the PLY file.
///
/// # Returns
///
/// The triangle mesh.
pub fn read_ply_mesh(path: impl AsRef<Path>) -> Result<TriangleMesh, PlyError> {
    let (mut reader, header) = open_ply(path)?;
    let body = read_body(&mut reader, &header, true)?;

    let mut triangles = Vec::with_capacity(body.faces.len());
    for face in body.faces.iter().filter(|f| f.len() >= 3) {
        for k in 1..face.len() - 1 {
            triangles.push([face[0], face[k], face[k + 1]]);
        }
    }

    Ok(TriangleMesh::new(
        body.vertices.points,
        triangles,
        body.vertices.colors,
    )?)
}

/// Read a colored point cloud from the vertices of a PLY file.
///
/// Vertices without color information get [`DEFAULT_COLOR`].
///
/// # Arguments
///
/// * `path` - The path to the PLY file.
///
/// # Returns
///
/// The colored point cloud.
pub fn read_ply_pointcloud(path: impl AsRef<Path>) -> Result<ColoredPointCloud, PlyError> {
    let (mut reader, header) = open_ply(path)?;
    let body = read_body(&mut reader, &header, false)?;

    let num_points = body.vertices.points.len();
    let colors = body
        .vertices
        .colors
        .unwrap_or_else(|| vec![DEFAULT_COLOR; num_points]);

    Ok(ColoredPointCloud::new(body.vertices.points, colors)?)
}
