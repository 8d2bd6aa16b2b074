use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Error types for the NPY module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NpyError {
    /// Failed to read or write the NPY file
    #[error("Failed to read NPY file")]
    Io(#[from] std::io::Error),

    /// The file does not start with the NPY magic string
    #[error("Invalid NPY magic string")]
    InvalidMagic,

    /// Unsupported format version
    #[error("Unsupported NPY version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    /// Malformed header dictionary
    #[error("Malformed NPY header: {0}")]
    MalformedHeader(String),

    /// Unsupported dtype descriptor
    #[error("Unsupported NPY dtype: {0}")]
    UnsupportedDtype(String),

    /// The array shape does not match the expected one
    #[error("Unexpected NPY shape. Expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The shape required by the caller.
        expected: Vec<usize>,
        /// The shape found in the file.
        got: Vec<usize>,
    },

    /// A value cannot be represented in the requested type
    #[error("NPY value out of range: {0}")]
    ValueOutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endianness {
    Little,
    Big,
}

/// The typed payload of a NPY array, stored in C (row-major) order.
#[derive(Debug, Clone, PartialEq)]
pub enum NpyData {
    /// `|b1`
    Bool(Vec<bool>),
    /// `|i1`
    Int8(Vec<i8>),
    /// `|u1`
    UInt8(Vec<u8>),
    /// `i2`
    Int16(Vec<i16>),
    /// `u2`
    UInt16(Vec<u16>),
    /// `i4`
    Int32(Vec<i32>),
    /// `u4`
    UInt32(Vec<u32>),
    /// `i8`
    Int64(Vec<i64>),
    /// `u8`
    UInt64(Vec<u64>),
    /// `f4`
    Float32(Vec<f32>),
    /// `f8`
    Float64(Vec<f64>),
}

impl NpyData {
    fn len(&self) -> usize {
        match self {
            NpyData::Bool(v) => v.len(),
            NpyData::Int8(v) => v.len(),
            NpyData::UInt8(v) => v.len(),
            NpyData::Int16(v) => v.len(),
            NpyData::UInt16(v) => v.len(),
            NpyData::Int32(v) => v.len(),
            NpyData::UInt32(v) => v.len(),
            NpyData::Int64(v) => v.len(),
            NpyData::UInt64(v) => v.len(),
            NpyData::Float32(v) => v.len(),
            NpyData::Float64(v) => v.len(),
        }
    }

    fn permute(&mut self, order: &[usize]) {
        fn apply<T: Copy>(v: &mut Vec<T>, order: &[usize]) {
            *v = order.iter().map(|&i| v[i]).collect();
        }
        match self {
            NpyData::Bool(v) => apply(v, order),
            NpyData::Int8(v) => apply(v, order),
            NpyData::UInt8(v) => apply(v, order),
            NpyData::Int16(v) => apply(v, order),
            NpyData::UInt16(v) => apply(v, order),
            NpyData::Int32(v) => apply(v, order),
            NpyData::UInt32(v) => apply(v, order),
            NpyData::Int64(v) => apply(v, order),
            NpyData::UInt64(v) => apply(v, order),
            NpyData::Float32(v) => apply(v, order),
            NpyData::Float64(v) => apply(v, order),
        }
    }
}

/// A n-dimensional array read from a `.npy` file.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    /// The shape of the array.
    pub shape: Vec<usize>,
    /// The array values in C order.
    pub data: NpyData,
}

impl NpyArray {
    /// Number of elements in the array.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            NpyData::Bool(v) => v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect(),
            NpyData::Int8(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::UInt8(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::Int16(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::UInt16(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::UInt32(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            NpyData::Float64(v) => v.clone(),
        }
    }

    /// Convert every element of an integer or boolean array to `u32`.
    ///
    /// Floating point arrays and values outside of the `u32` range are rejected.
    pub fn to_u32_vec(&self) -> Result<Vec<u32>, NpyError> {
        fn cast<T>(v: &[T]) -> Result<Vec<u32>, NpyError>
        where
            T: Copy + std::fmt::Display + TryInto<u32>,
        {
            v.iter()
                .map(|&x| {
                    x.try_into()
                        .map_err(|_| NpyError::ValueOutOfRange(x.to_string()))
                })
                .collect()
        }
        match &self.data {
            NpyData::Bool(v) => Ok(v.iter().map(|&x| x as u32).collect()),
            NpyData::Int8(v) => cast(v),
            NpyData::UInt8(v) => Ok(v.iter().map(|&x| x as u32).collect()),
            NpyData::Int16(v) => cast(v),
            NpyData::UInt16(v) => Ok(v.iter().map(|&x| x as u32).collect()),
            NpyData::Int32(v) => cast(v),
            NpyData::UInt32(v) => Ok(v.clone()),
            NpyData::Int64(v) => cast(v),
            NpyData::UInt64(v) => cast(v),
            NpyData::Float32(_) => Err(NpyError::UnsupportedDtype("<f4".to_string())),
            NpyData::Float64(_) => Err(NpyError::UnsupportedDtype("<f8".to_string())),
        }
    }

    /// Interpret a 2-D array of shape (R, C) as a row-major `f64` matrix.
    ///
    /// Example:
    ///
    /// ```no_run
    /// use ocrtoc_io::npy::read_npy;
    ///
    /// let camera_k: [[f64; 3]; 3] = read_npy("color_camK.npy").unwrap().to_matrix().unwrap();
    /// ```
    pub fn to_matrix<const R: usize, const C: usize>(&self) -> Result<[[f64; C]; R], NpyError> {
        if self.shape != [R, C] {
            return Err(NpyError::ShapeMismatch {
                expected: vec![R, C],
                got: self.shape.clone(),
            });
        }
        let values = self.to_f64_vec();
        let mut matrix = [[0.0; C]; R];
        for (row, chunk) in matrix.iter_mut().zip(values.chunks_exact(C)) {
            row.copy_from_slice(chunk);
        }
        Ok(matrix)
    }
}

struct NpyHeader {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn parse_header(header: &str) -> Result<NpyHeader, NpyError> {
    let malformed = || NpyError::MalformedHeader(header.trim().to_string());

    // 'descr': '<f8'
    let descr = {
        let start = header.find("'descr'").ok_or_else(malformed)?;
        let rest = &header[start + "'descr'".len()..];
        let open = rest.find('\'').ok_or_else(malformed)?;
        let rest = &rest[open + 1..];
        let close = rest.find('\'').ok_or_else(malformed)?;
        rest[..close].to_string()
    };

    // 'fortran_order': False
    let fortran_order = {
        let start = header.find("'fortran_order'").ok_or_else(malformed)?;
        let rest = header[start + "'fortran_order'".len()..]
            .trim_start_matches([':', ' '])
            .to_string();
        if rest.starts_with("True") {
            true
        } else if rest.starts_with("False") {
            false
        } else {
            return Err(malformed());
        }
    };

    // 'shape': (720, 1280)
    let shape = {
        let start = header.find("'shape'").ok_or_else(malformed)?;
        let rest = &header[start..];
        let open = rest.find('(').ok_or_else(malformed)?;
        let close = rest.find(')').ok_or_else(malformed)?;
        rest[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

fn read_values<const N: usize, T>(
    bytes: &[u8],
    endianness: Endianness,
    from_le: fn([u8; N]) -> T,
    from_be: fn([u8; N]) -> T,
) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            match endianness {
                Endianness::Little => from_le(buf),
                Endianness::Big => from_be(buf),
            }
        })
        .collect()
}

fn decode_data(descr: &str, bytes: &[u8]) -> Result<NpyData, NpyError> {
    let (endianness, kind) = match descr.as_bytes().first() {
        Some(b'<') | Some(b'|') | Some(b'=') => (Endianness::Little, &descr[1..]),
        Some(b'>') => (Endianness::Big, &descr[1..]),
        _ => (Endianness::Little, descr),
    };

    let e = endianness;
    let data = match kind {
        "b1" => NpyData::Bool(bytes.iter().map(|&b| b != 0).collect()),
        "i1" => NpyData::Int8(bytes.iter().map(|&b| b as i8).collect()),
        "u1" => NpyData::UInt8(bytes.to_vec()),
        "i2" => NpyData::Int16(read_values(bytes, e, i16::from_le_bytes, i16::from_be_bytes)),
        "u2" => NpyData::UInt16(read_values(bytes, e, u16::from_le_bytes, u16::from_be_bytes)),
        "i4" => NpyData::Int32(read_values(bytes, e, i32::from_le_bytes, i32::from_be_bytes)),
        "u4" => NpyData::UInt32(read_values(bytes, e, u32::from_le_bytes, u32::from_be_bytes)),
        "i8" => NpyData::Int64(read_values(bytes, e, i64::from_le_bytes, i64::from_be_bytes)),
        "u8" => NpyData::UInt64(read_values(bytes, e, u64::from_le_bytes, u64::from_be_bytes)),
        "f4" => NpyData::Float32(read_values(bytes, e, f32::from_le_bytes, f32::from_be_bytes)),
        "f8" => NpyData::Float64(read_values(bytes, e, f64::from_le_bytes, f64::from_be_bytes)),
        _ => return Err(NpyError::UnsupportedDtype(descr.to_string())),
    };
    Ok(data)
}

fn element_size(descr: &str) -> Result<usize, NpyError> {
    descr
        .trim_start_matches(['<', '>', '|', '='])
        .get(1..)
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| NpyError::UnsupportedDtype(descr.to_string()))
}

// For each C-order position, the position of the same element in Fortran order.
fn fortran_to_c_order(shape: &[usize]) -> Vec<usize> {
    let num_elements = shape.iter().product::<usize>();
    let mut fortran_strides = vec![1usize; shape.len()];
    for i in 1..shape.len() {
        fortran_strides[i] = fortran_strides[i - 1] * shape[i - 1];
    }

    (0..num_elements)
        .map(|mut c_index| {
            let mut f_index = 0;
            for (dim, stride) in shape.iter().zip(fortran_strides.iter()).rev() {
                f_index += (c_index % dim) * stride;
                c_index /= dim;
            }
            f_index
        })
        .collect()
}

/// Read a `.npy` file into a [`NpyArray`].
///
/// Supports format versions 1.0, 2.0 and 3.0, boolean, integer and floating
/// point dtypes of either endianness, and both C and Fortran memory orders.
/// The returned data is always in C order.
///
/// # Arguments
///
/// * `path` - The path to the `.npy` file.
pub fn read_npy(path: impl AsRef<Path>) -> Result<NpyArray, NpyError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != NPY_MAGIC {
        return Err(NpyError::InvalidMagic);
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    let header_len = match version[0] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        _ => return Err(NpyError::UnsupportedVersion(version[0], version[1])),
    };

    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);
    let header = parse_header(&header)?;

    let num_elements = header.shape.iter().product::<usize>();
    let mut bytes = vec![0u8; num_elements * element_size(&header.descr)?];
    reader.read_exact(&mut bytes)?;

    let mut data = decode_data(&header.descr, &bytes)?;
    if header.fortran_order && header.shape.len() > 1 {
        data.permute(&fortran_to_c_order(&header.shape));
    }

    Ok(NpyArray {
        shape: header.shape,
        data,
    })
}

/// Element types that can be written to a `.npy` file.
pub trait NpyElement: Copy {
    /// The little-endian dtype descriptor, e.g. `<f8`.
    const DESCR: &'static str;

    /// Append the little-endian bytes of the value to the buffer.
    fn write_le(&self, buf: &mut Vec<u8>);
}

macro_rules! impl_npy_element {
    ($ty:ty, $descr:expr) => {
        impl NpyElement for $ty {
            const DESCR: &'static str = $descr;

            fn write_le(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_npy_element!(u8, "|u1");
impl_npy_element!(u16, "<u2");
impl_npy_element!(i32, "<i4");
impl_npy_element!(u32, "<u4");
impl_npy_element!(i64, "<i8");
impl_npy_element!(f32, "<f4");
impl_npy_element!(f64, "<f8");

/// Write a C-ordered array to a version 1.0 `.npy` file.
///
/// # Arguments
///
/// * `path` - The destination path.
/// * `shape` - The array shape. The product must equal `data.len()`.
/// * `data` - The array values in C order.
pub fn write_npy<T: NpyElement>(
    path: impl AsRef<Path>,
    shape: &[usize],
    data: &[T],
) -> Result<(), NpyError> {
    if shape.iter().product::<usize>() != data.len() {
        return Err(NpyError::ShapeMismatch {
            expected: shape.to_vec(),
            got: vec![data.len()],
        });
    }

    let shape_str = match shape {
        [n] => format!("({},)", n),
        _ => format!(
            "({})",
            shape
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        T::DESCR,
        shape_str
    );
    // magic (6) + version (2) + header length (2) + header + '\n' is a multiple of 64
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut buf = Vec::with_capacity(10 + header.len() + data.len() * 8);
    buf.extend_from_slice(NPY_MAGIC);
    buf.extend_from_slice(&[1, 0]);
    buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
    buf.extend_from_slice(header.as_bytes());
    for value in data {
        value.write_le(&mut buf);
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_raw(path: &Path, descr: &str, fortran: bool, shape: &str, payload: &[u8]) {
        let header = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}\n",
            descr,
            if fortran { "True" } else { "False" },
            shape
        );
        let mut buf = Vec::new();
        buf.extend_from_slice(NPY_MAGIC);
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(payload);
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn test_parse_header() -> Result<(), NpyError> {
        let header =
            parse_header("{'descr': '<f8', 'fortran_order': False, 'shape': (720, 1280), }")?;
        assert_eq!(header.descr, "<f8");
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![720, 1280]);

        let header = parse_header("{'descr': '|u1', 'fortran_order': True, 'shape': (5,), }")?;
        assert!(header.fortran_order);
        assert_eq!(header.shape, vec![5]);

        assert!(parse_header("{'fortran_order': False}").is_err());
        Ok(())
    }

    #[test]
    fn test_write_read_matrix() -> Result<(), NpyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("pose.npy");
        let pose = [
            1.0, 0.0, 0.0, 0.5, //
            0.0, 1.0, 0.0, -0.25, //
            0.0, 0.0, 1.0, 2.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        write_npy(&path, &[4, 4], &pose)?;

        // the data offset must be aligned to 64 bytes
        let bytes = std::fs::read(&path)?;
        assert_eq!((bytes.len() - 16 * 8) % 64, 0);

        let array = read_npy(&path)?;
        assert_eq!(array.shape, vec![4, 4]);
        let matrix: [[f64; 4]; 4] = array.to_matrix()?;
        assert_eq!(matrix[0][3], 0.5);
        assert_eq!(matrix[1][3], -0.25);
        assert_eq!(matrix[3], [0.0, 0.0, 0.0, 1.0]);

        assert!(matches!(
            array.to_matrix::<3, 3>(),
            Err(NpyError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_read_fortran_order() -> Result<(), NpyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("fortran.npy");
        // [[1, 2, 3], [4, 5, 6]] stored column by column
        let payload = [1i32, 4, 2, 5, 3, 6]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<_>>();
        write_raw(&path, "<i4", true, "(2, 3)", &payload);

        let array = read_npy(&path)?;
        assert_eq!(array.shape, vec![2, 3]);
        assert_eq!(array.to_u32_vec()?, vec![1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn test_read_big_endian() -> Result<(), NpyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("be.npy");
        let payload = [1.5f32, -2.0]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect::<Vec<_>>();
        write_raw(&path, ">f4", false, "(2,)", &payload);

        let array = read_npy(&path)?;
        assert_eq!(array.to_f64_vec(), vec![1.5, -2.0]);
        Ok(())
    }

    #[test]
    fn test_mask_conversion() -> Result<(), NpyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("mask.npy");
        write_npy(&path, &[2, 2], &[0i64, 1, 2, -1])?;

        let array = read_npy(&path)?;
        assert!(matches!(
            array.to_u32_vec(),
            Err(NpyError::ValueOutOfRange(_))
        ));

        write_npy(&path, &[2, 2], &[0u8, 1, 2, 3])?;
        assert_eq!(read_npy(&path)?.to_u32_vec()?, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_invalid_magic() -> Result<(), NpyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("bad.npy");
        std::fs::write(&path, b"not a numpy file")?;
        assert!(matches!(read_npy(&path), Err(NpyError::InvalidMagic)));
        Ok(())
    }
}
