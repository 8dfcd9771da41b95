use std::num::NonZeroU64;

use lazy_static::lazy_static;

use crate::core::byte_view::ViewReader;
use crate::import::{ImportError, WithContext};
use crate::registry::{self, DecodeErr, Decodable, DecodedBuffer, Entry, TypeTag, TypeTagRegistry};

/// Declares the custom-data layer types in on-disk order, so that the tag
/// values, the names and `COUNT` are generated from one list.
macro_rules! custom_data_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Layer types of Blender's `CustomData`, numbered as in `CD_*`.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum CustomDataType {
            $($variant),*
        }

        impl CustomDataType {
            pub const ALL: &'static [CustomDataType] = &[$(CustomDataType::$variant),*];
        }

        impl TypeTag for CustomDataType {
            const COUNT: usize = CustomDataType::ALL.len();

            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> Option<Self> {
                CustomDataType::ALL.get(index).copied()
            }

            fn name(self) -> &'static str {
                match self {
                    $(CustomDataType::$variant => $name),*
                }
            }
        }
    };
}

custom_data_types! {
    MVert => "MVert",
    MSticky => "MSticky",
    MDeformVert => "MDeformVert",
    MEdge => "MEdge",
    MFace => "MFace",
    MTFace => "MTFace",
    MCol => "MCol",
    OrigIndex => "OrigIndex",
    Normal => "Normal",
    PolyIndex => "PolyIndex",
    PropFlt => "PropFlt",
    PropInt => "PropInt",
    PropStr => "PropStr",
    OrigSpace => "OrigSpace",
    Orco => "Orco",
    MTexPoly => "MTexPoly",
    MLoopUv => "MLoopUV",
    MLoopCol => "MLoopCol",
    Tangent => "Tangent",
    MDisps => "MDisps",
    PreviewMCol => "PreviewMCol",
    IdMCol => "IdMCol",
    TextureMLoopCol => "TextureMLoopCol",
    ClothOrco => "ClothOrco",
    Recast => "Recast",
    MPoly => "MPoly",
    MLoop => "MLoop",
    ShapeKeyIndex => "ShapeKeyIndex",
    ShapeKey => "ShapeKey",
    BWeight => "BWeight",
    Crease => "Crease",
    OrigSpaceMLoop => "OrigSpaceMLoop",
    PreviewMLoopCol => "PreviewMLoopCol",
    BmElemPyPtr => "BMElemPyPtr",
    PaintMask => "PaintMask",
    GridPaintMask => "GridPaintMask",
    MVertSkin => "MVertSkin",
    FreestyleEdge => "FreestyleEdge",
    FreestyleFace => "FreestyleFace",
    MLoopTangent => "MLoopTangent",
    TessLoopNormal => "TessLoopNormal",
    CustomLoopNormal => "CustomLoopNormal",
}

/// The layer type value telling the reader to resolve the type from the layer name.
pub const AUTO_FROM_NAME: i32 = -1;

// Record layouts below are those of files written with 64-bit pointers.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MVert {
    pub co: [f32; 3],
    pub no: [i16; 3],
    pub flag: u8,
    pub bweight: u8,
}

impl Decodable for MVert {
    const SIZE: usize = 20;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        Ok(MVert {
            co: reader.read()?,
            no: reader.read()?,
            flag: reader.read()?,
            bweight: reader.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MEdge {
    pub v1: u32,
    pub v2: u32,
    pub crease: u8,
    pub bweight: u8,
    pub flag: i16,
}

impl Decodable for MEdge {
    const SIZE: usize = 12;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        let v1 = vertex_index(reader.read_i32()?)?;
        let v2 = vertex_index(reader.read_i32()?)?;
        Ok(MEdge {
            v1,
            v2,
            crease: reader.read()?,
            bweight: reader.read()?,
            flag: reader.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MFace {
    /// `v4` is 0 for triangles.
    pub v: [u32; 4],
    pub mat_nr: i16,
    pub edcode: u8,
    pub flag: u8,
}

impl Decodable for MFace {
    const SIZE: usize = 20;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        let mut v = [0_u32; 4];
        for index in v.iter_mut() {
            *index = vertex_index(reader.read_i32()?)?;
        }
        Ok(MFace {
            v,
            mat_nr: reader.read()?,
            edcode: reader.read()?,
            flag: reader.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MTFace {
    pub uv: [[f32; 2]; 4],
    /// Address of the image block, if any.
    pub tpage: Option<NonZeroU64>,
    pub flag: u8,
    pub transp: u8,
    pub mode: i16,
    pub tile: i16,
    pub unwrap: i16,
}

impl Decodable for MTFace {
    const SIZE: usize = 48;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        Ok(MTFace {
            uv: reader.read()?,
            tpage: NonZeroU64::new(reader.read_u64()?),
            flag: reader.read()?,
            transp: reader.read()?,
            mode: reader.read()?,
            tile: reader.read()?,
            unwrap: reader.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MTexPoly {
    pub tpage: Option<NonZeroU64>,
    pub flag: u8,
    pub transp: u8,
    pub mode: i16,
    pub tile: i16,
}

impl Decodable for MTexPoly {
    const SIZE: usize = 16;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        let out = MTexPoly {
            tpage: NonZeroU64::new(reader.read_u64()?),
            flag: reader.read()?,
            transp: reader.read()?,
            mode: reader.read()?,
            tile: reader.read()?,
        };
        reader.skip(2)?; // pad
        Ok(out)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MLoopUv {
    pub uv: [f32; 2],
    pub flag: i32,
}

impl Decodable for MLoopUv {
    const SIZE: usize = 12;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        Ok(MLoopUv { uv: reader.read()?, flag: reader.read()? })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MLoopCol {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Decodable for MLoopCol {
    const SIZE: usize = 4;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        let [r, g, b, a] = reader.read::<[u8; 4]>()?;
        Ok(MLoopCol { r, g, b, a })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MPoly {
    pub loopstart: u32,
    pub totloop: u32,
    pub mat_nr: i16,
    pub flag: u8,
}

impl Decodable for MPoly {
    const SIZE: usize = 12;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        let loopstart = reader.read_i32()?;
        let totloop = reader.read_i32()?;
        let (Ok(loopstart), Ok(totloop)) = (u32::try_from(loopstart), u32::try_from(totloop)) else {
            return Err(DecodeErr::Inconsistent(format!(
                "polygon with loop start {} and loop count {}",
                loopstart, totloop
            )));
        };
        let out = MPoly {
            loopstart,
            totloop,
            mat_nr: reader.read()?,
            flag: reader.read()?,
        };
        reader.skip(1)?; // pad
        Ok(out)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MLoop {
    pub v: u32,
    pub e: u32,
}

impl Decodable for MLoop {
    const SIZE: usize = 8;

    fn decode(reader: &mut ViewReader<'_>) -> Result<Self, DecodeErr> {
        let v = vertex_index(reader.read_i32()?)?;
        let e = edge_index(reader.read_i32()?)?;
        Ok(MLoop { v, e })
    }
}

fn vertex_index(raw: i32) -> Result<u32, DecodeErr> {
    u32::try_from(raw).map_err(|_| DecodeErr::Inconsistent(format!("negative vertex index {}", raw)))
}

fn edge_index(raw: i32) -> Result<u32, DecodeErr> {
    u32::try_from(raw).map_err(|_| DecodeErr::Inconsistent(format!("negative edge index {}", raw)))
}

lazy_static! {
    /// The layer types this crate can materialize; every other type is recognized but unsupported.
    pub static ref REGISTRY: TypeTagRegistry<CustomDataType> = {
        use CustomDataType as Cd;
        let rows = [
            (Cd::MVert, Entry::supported::<MVert>()),
            (Cd::MEdge, Entry::supported::<MEdge>()),
            (Cd::MFace, Entry::supported::<MFace>()),
            (Cd::MTFace, Entry::supported::<MTFace>()),
            (Cd::PropFlt, Entry::supported::<f32>()),
            (Cd::PropInt, Entry::supported::<i32>()),
            (Cd::MTexPoly, Entry::supported::<MTexPoly>()),
            (Cd::MLoopUv, Entry::supported::<MLoopUv>()),
            (Cd::MLoopCol, Entry::supported::<MLoopCol>()),
            (Cd::MPoly, Entry::supported::<MPoly>()),
            (Cd::MLoop, Entry::supported::<MLoop>()),
        ];
        match TypeTagRegistry::build(&rows) {
            Ok(registry) => registry,
            // The rows are a fixed list checked by the tests below.
            Err(err) => panic!("invalid custom data registry: {}", err),
        }
    };
}

/// A decoded custom-data layer.
#[derive(Clone, Debug)]
pub struct Layer {
    pub ty: CustomDataType,
    pub name: String,
    pub data: DecodedBuffer,
}

impl Layer {
    pub fn as_slice<T: 'static>(&self) -> Option<&[T]> {
        self.data.as_slice()
    }
}

/// Reads `count` records of a custom-data layer from `reader`.
///
/// `raw_type` is the layer type stored in the file; [`AUTO_FROM_NAME`] resolves it from `name` instead.
pub fn read_layer(raw_type: i32, name: &str, count: usize, reader: &mut ViewReader<'_>) -> Result<Layer, ImportError> {
    let context = || format!("Blender custom data layer '{}' (type {})", name, raw_type);

    let ty = if raw_type == AUTO_FROM_NAME {
        CustomDataType::from_name(name)
            .ok_or_else(|| registry::Err::UnknownTypeName { name: name.to_string() })
            .with_context(context)?
    } else {
        TypeTagRegistry::<CustomDataType>::resolve(raw_type.into()).with_context(context)?
    };

    let data = REGISTRY.decode_tag(ty, count, reader).with_context(context)?;
    tracing::debug!(
        layer = name,
        ty = ty.name(),
        count,
        bytes = count * data.element_size(),
        "decoded custom data layer"
    );
    Ok(Layer { ty, name: name.to_string(), data })
}
