use crate::CutterError;

/// Media preset: the default pressure, speed and depth for a media code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Media {
    pub code: u16,
    pub pressure: Option<u32>,
    pub speed: Option<u32>,
    pub depth: Option<u32>,
    /// Color of the blade cap recommended for this media.
    pub cap: &'static str,
    pub name: &'static str,
}

const fn media(
    code: u16,
    pressure: Option<u32>,
    speed: Option<u32>,
    depth: Option<u32>,
    cap: &'static str,
    name: &'static str,
) -> Media {
    Media {
        code,
        pressure,
        speed,
        depth,
        cap,
        name,
    }
}

/// Media code of the pen.
pub const MEDIA_PEN: u16 = 113;

/// Media code used for anything outside of 100..=300.
pub const MEDIA_CUSTOM: u16 = 300;

/// Default media, "Print Paper Light Weight".
pub const MEDIA_DEFAULT: u16 = 132;

#[rustfmt::skip]
pub const MEDIA: &[Media] = &[
    media(100, Some(27), Some(10), Some(1), "yellow", "Card without Craft Paper Backing"),
    media(101, Some(27), Some(10), Some(1), "yellow", "Card with Craft Paper Backing"),
    media(102, Some(10), Some(5),  Some(1), "blue",   "Vinyl Sticker"),
    media(106, Some(14), Some(10), Some(1), "blue",   "Film Labels"),
    media(111, Some(27), Some(10), Some(1), "yellow", "Thick Media"),
    media(112, Some(2),  Some(10), Some(1), "blue",   "Thin Media"),
    media(113, Some(18), Some(10), None,    "pen",    "Pen"),
    media(120, Some(30), Some(10), Some(1), "blue",   "Bond Paper 13-28 lbs (105g)"),
    media(121, Some(30), Some(10), Some(1), "yellow", "Bristol Paper 57-67 lbs (145g)"),
    media(122, Some(30), Some(10), Some(1), "yellow", "Cardstock 40-60 lbs (90g)"),
    media(123, Some(30), Some(10), Some(1), "yellow", "Cover 40-60 lbs (170g)"),
    media(124, Some(1),  Some(10), Some(1), "blue",   "Film, Double Matte Translucent"),
    media(125, Some(1),  Some(10), Some(1), "blue",   "Film, Vinyl With Adhesive Back"),
    media(126, Some(1),  Some(10), Some(1), "blue",   "Film, Window With Kling Adhesive"),
    media(127, Some(30), Some(10), Some(1), "red",    "Index 90 lbs (165g)"),
    media(128, Some(20), Some(10), Some(1), "yellow", "Inkjet Photo Paper 28-44 lbs (70g)"),
    media(129, Some(27), Some(10), Some(1), "red",    "Inkjet Photo Paper 45-75 lbs (110g)"),
    media(130, Some(30), Some(3),  Some(1), "red",    "Magnetic Sheet"),
    media(131, Some(30), Some(10), Some(1), "blue",   "Offset 24-60 lbs (90g)"),
    media(132, Some(5),  Some(10), Some(1), "blue",   "Print Paper Light Weight"),
    media(133, Some(25), Some(10), Some(1), "yellow", "Print Paper Medium Weight"),
    media(134, Some(20), Some(10), Some(1), "blue",   "Sticker Sheet"),
    media(135, Some(20), Some(10), Some(1), "red",    "Tag 100 lbs (275g)"),
    media(136, Some(30), Some(10), Some(1), "blue",   "Text Paper 24-70 lbs (105g)"),
    media(137, Some(30), Some(10), Some(1), "yellow", "Vellum Bristol 57-67 lbs (145g)"),
    media(138, Some(30), Some(10), Some(1), "blue",   "Writing Paper 24-70 lbs (105g)"),
    media(300, None,     None,     None,    "custom", "Custom"),
];

/// Maps codes outside of 100..=300 to the custom media code.
pub fn normalize_media_code(code: u16) -> u16 {
    if (100..=300).contains(&code) {
        code
    } else {
        MEDIA_CUSTOM
    }
}

/// Looks up the preset of a media code.
pub fn lookup_media(code: u16) -> Option<&'static Media> {
    MEDIA.iter().find(|m| m.code == code)
}

/// Cutting mats known to the Cameo3 and newer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CuttingMat {
    #[default]
    NoMat,
    Cameo12x12,
    Cameo12x24,
    Portrait8x12,
    CameoPlus15x15,
    CameoPro24x24,
}

impl CuttingMat {
    /// Argument of the `TG` command.
    pub fn code(&self) -> char {
        match self {
            Self::NoMat => '0',
            Self::Cameo12x12 => '1',
            Self::Cameo12x24 => '2',
            Self::Portrait8x12 => '3',
            Self::CameoPlus15x15 => '8',
            Self::CameoPro24x24 => '9',
        }
    }

    /// Size in inches as `(bottom, right)` of the boundary, `None` without a mat.
    pub fn size_inches(&self) -> Option<(u32, u32)> {
        match self {
            Self::NoMat => None,
            Self::Cameo12x12 => Some((12, 12)),
            Self::Cameo12x24 => Some((24, 12)),
            Self::Portrait8x12 => Some((8, 12)),
            Self::CameoPlus15x15 => Some((15, 15)),
            Self::CameoPro24x24 => Some((24, 24)),
        }
    }
}

impl TryFrom<&str> for CuttingMat {
    type Error = CutterError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        use CuttingMat::*;

        Ok(match value {
            "no_mat" => NoMat,
            "cameo_12x12" => Cameo12x12,
            "cameo_12x24" => Cameo12x24,
            "portrait_8x12" => Portrait8x12,
            "cameo_plus_15x15" => CameoPlus15x15,
            "cameo_pro_24x24" => CameoPro24x24,

            _ => return Err(CutterError::UnknownCuttingMat(value.to_string())),
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, int_enum::IntEnum)]
/// Tool reported by the tool setup query (Cameo4, Portrait3).
pub enum ToolId {
    Empty = 0,
    RatchetBlade = 1,
    AutoBlade = 2,
    DeepCutBlade = 3,
    KraftBlade = 4,
    RotaryBlade = 5,
    Pen = 7,
    Fault = 255,
}

impl ToolId {
    /// Parses the tool setup reply, e.g. `" 2, 0"`. Only the first field is considered.
    pub fn from_setup(reply: &str) -> Option<Self> {
        let first = reply.split(',').next()?.trim();
        let id: u8 = first.parse().ok()?;

        Self::try_from(id).ok()
    }
}
