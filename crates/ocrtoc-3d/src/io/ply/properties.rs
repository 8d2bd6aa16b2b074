use std::io::{BufRead, Read};

use super::PlyError;

/// The encoding of the PLY body.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyFormat {
    /// Whitespace separated text, one element per line.
    Ascii,
    /// Packed little endian binary.
    BinaryLittleEndian,
    /// Packed big endian binary.
    BinaryBigEndian,
}

impl PlyFormat {
    pub(crate) fn parse(s: &str) -> Result<Self, PlyError> {
        match s {
            "ascii" => Ok(PlyFormat::Ascii),
            "binary_little_endian" => Ok(PlyFormat::BinaryLittleEndian),
            "binary_big_endian" => Ok(PlyFormat::BinaryBigEndian),
            _ => Err(PlyError::MalformedHeader(format!("unknown format {s}"))),
        }
    }
}

/// The scalar types a PLY property can hold.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyDataType {
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
}

impl PlyDataType {
    /// The size in bytes of one value.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// Whether the type is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, PlyDataType::Float32 | PlyDataType::Float64)
    }

    /// The value that maps an integer color channel to `1.0`.
    pub(crate) fn color_scale(&self) -> f64 {
        match self {
            PlyDataType::Float32 | PlyDataType::Float64 => 1.0,
            PlyDataType::Int8 => i8::MAX as f64,
            PlyDataType::UInt8 => u8::MAX as f64,
            PlyDataType::Int16 => i16::MAX as f64,
            PlyDataType::UInt16 => u16::MAX as f64,
            PlyDataType::Int32 => i32::MAX as f64,
            PlyDataType::UInt32 => u32::MAX as f64,
        }
    }

    pub(crate) fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnsupportedProperty(type_str.to_string())),
        }
    }
}

/// The shape of a property: a single scalar or a variable length list.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyPropertyKind {
    /// A single scalar value.
    Scalar(PlyDataType),
    /// A list prefixed by its length.
    List {
        /// The type of the length prefix.
        count: PlyDataType,
        /// The type of the list items.
        item: PlyDataType,
    },
}

/// A property declared in the header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// The property name.
    pub name: String,
    /// The property shape and type.
    pub kind: PlyPropertyKind,
}

/// An element declared in the header, e.g. `vertex` or `face`.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyElementDefinition {
    /// The element name.
    pub name: String,
    /// The number of instances stored in the body.
    pub count: usize,
    /// The properties of each instance, in storage order.
    pub properties: Vec<PlyPropertyDefinition>,
}

impl PlyElementDefinition {
    /// Find the position and the definition of a property by name.
    pub fn property(&self, name: &str) -> Option<(usize, &PlyPropertyDefinition)> {
        self.properties
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }
}

/// A decoded property value.
#[derive(Debug, PartialEq, Clone)]
pub enum PlyValue {
    /// A scalar, widened to `f64`.
    Scalar(f64),
    /// A list of scalars, widened to `f64`.
    List(Vec<f64>),
}

impl PlyValue {
    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            PlyValue::Scalar(v) => Some(*v),
            PlyValue::List(_) => None,
        }
    }

    /// The list items, if this is a list.
    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            PlyValue::Scalar(_) => None,
            PlyValue::List(v) => Some(v),
        }
    }
}

macro_rules! read_binary {
    ($reader:expr, $ty:ty, $format:expr) => {{
        let mut bytes = [0u8; std::mem::size_of::<$ty>()];
        $reader.read_exact(&mut bytes)?;
        let value = match $format {
            PlyFormat::BinaryBigEndian => <$ty>::from_be_bytes(bytes),
            _ => <$ty>::from_le_bytes(bytes),
        };
        value as f64
    }};
}

fn read_binary_scalar<R: Read>(
    reader: &mut R,
    data_type: PlyDataType,
    format: PlyFormat,
) -> Result<f64, PlyError> {
    let value = match data_type {
        PlyDataType::Float32 => read_binary!(reader, f32, format),
        PlyDataType::Float64 => read_binary!(reader, f64, format),
        PlyDataType::Int8 => read_binary!(reader, i8, format),
        PlyDataType::UInt8 => read_binary!(reader, u8, format),
        PlyDataType::Int16 => read_binary!(reader, i16, format),
        PlyDataType::UInt16 => read_binary!(reader, u16, format),
        PlyDataType::Int32 => read_binary!(reader, i32, format),
        PlyDataType::UInt32 => read_binary!(reader, u32, format),
    };
    Ok(value)
}

fn parse_ascii_scalar<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    data_type: PlyDataType,
) -> Result<f64, PlyError> {
    let token = tokens
        .next()
        .ok_or_else(|| PlyError::InvalidValue("unexpected end of line".to_string()))?;
    let value = if data_type.is_float() {
        token.parse::<f64>().ok()
    } else {
        token.parse::<i64>().ok().map(|v| v as f64)
    };
    value.ok_or_else(|| PlyError::InvalidValue(token.to_string()))
}

fn list_len(value: f64) -> Result<usize, PlyError> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(PlyError::InvalidValue(format!("list length {value}")));
    }
    Ok(value as usize)
}

/// Read one instance of an element from the body.
///
/// The values are returned in the same order as the element properties.
pub(crate) fn read_element<R: BufRead>(
    reader: &mut R,
    format: PlyFormat,
    element: &PlyElementDefinition,
) -> Result<Vec<PlyValue>, PlyError> {
    let mut values = Vec::with_capacity(element.properties.len());

    if format == PlyFormat::Ascii {
        let mut line = String::new();
        // skip blank lines between elements
        while line.trim().is_empty() {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(PlyError::InvalidValue("unexpected end of file".to_string()));
            }
        }

        let mut tokens = line.split_whitespace();
        for property in element.properties.iter() {
            let value = match property.kind {
                PlyPropertyKind::Scalar(data_type) => {
                    PlyValue::Scalar(parse_ascii_scalar(&mut tokens, data_type)?)
                }
                PlyPropertyKind::List { count, item } => {
                    let len = list_len(parse_ascii_scalar(&mut tokens, count)?)?;
                    let items = (0..len)
                        .map(|_| parse_ascii_scalar(&mut tokens, item))
                        .collect::<Result<Vec<_>, _>>()?;
                    PlyValue::List(items)
                }
            };
            values.push(value);
        }
    } else {
        for property in element.properties.iter() {
            let value = match property.kind {
                PlyPropertyKind::Scalar(data_type) => {
                    PlyValue::Scalar(read_binary_scalar(reader, data_type, format)?)
                }
                PlyPropertyKind::List { count, item } => {
                    let len = list_len(read_binary_scalar(reader, count, format)?)?;
                    let items = (0..len)
                        .map(|_| read_binary_scalar(reader, item, format))
                        .collect::<Result<Vec<_>, _>>()?;
                    PlyValue::List(items)
                }
            };
            values.push(value);
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_element() -> PlyElementDefinition {
        PlyElementDefinition {
            name: "face".to_string(),
            count: 1,
            properties: vec![PlyPropertyDefinition {
                name: "vertex_indices".to_string(),
                kind: PlyPropertyKind::List {
                    count: PlyDataType::UInt8,
                    item: PlyDataType::Int32,
                },
            }],
        }
    }

    #[test]
    fn test_data_type_parsing() -> Result<(), PlyError> {
        assert_eq!(PlyDataType::parse("float")?, PlyDataType::Float32);
        assert_eq!(PlyDataType::parse("uchar")?, PlyDataType::UInt8);
        assert_eq!(PlyDataType::parse("double")?, PlyDataType::Float64);
        assert_eq!(PlyDataType::parse("uint32")?.size(), 4);
        assert!(PlyDataType::parse("invalid").is_err());
        Ok(())
    }

    #[test]
    fn test_read_binary_list() -> Result<(), PlyError> {
        let mut data = vec![3u8];
        for i in [4i32, 5, 6] {
            data.extend_from_slice(&i.to_be_bytes());
        }
        let mut reader = std::io::BufReader::new(data.as_slice());
        let values = read_element(&mut reader, PlyFormat::BinaryBigEndian, &face_element())?;
        assert_eq!(values, vec![PlyValue::List(vec![4.0, 5.0, 6.0])]);
        Ok(())
    }

    #[test]
    fn test_read_ascii_list() -> Result<(), PlyError> {
        let text = "\n4 0 1 2 3\n";
        let mut reader = std::io::BufReader::new(text.as_bytes());
        let values = read_element(&mut reader, PlyFormat::Ascii, &face_element())?;
        assert_eq!(values[0].as_list(), Some(&[0.0, 1.0, 2.0, 3.0][..]));

        let mut reader = std::io::BufReader::new("3 0 1\n".as_bytes());
        let res = read_element(&mut reader, PlyFormat::Ascii, &face_element());
        assert!(matches!(res, Err(PlyError::InvalidValue(_))));
        Ok(())
    }
}
