use std::fmt::Display;

use crate::consts::VENDOR_ID_GRAPHTEC;

use Family::{Cameo as CameoFamily, Portrait as PortraitFamily};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, int_enum::IntEnum)]
/// USB product ids of the known cutters (robocut/Plotter.h).
pub enum ProductId {
    CraftRoboCc200_20 = 0x110A,
    CraftRoboCc300_20 = 0x111A,
    SilhouetteSd1 = 0x111C,
    SilhouetteSd2 = 0x111D,
    Cameo = 0x1121,
    Cameo2 = 0x112B,
    Cameo3 = 0x112F,
    Cameo4 = 0x1137,
    // The Cameo4 Plus is likely 0x1138, but that is not verified.
    Cameo4Pro = 0x1139,
    Portrait = 0x1123,
    Portrait2 = 0x1132,
    Portrait3 = 0x113A,
}

impl ProductId {
    /// Cameo4 line: sets pressure and cutter offset twice during setup.
    pub fn is_cameo4_line(&self) -> bool {
        matches!(self, Self::Cameo4 | Self::Cameo4Pro)
    }

    /// Cameo3 and newer: tool selection, cutting mats, calibration queries.
    pub fn is_cameo3_on(&self) -> bool {
        self.is_cameo4_line() || matches!(self, Self::Cameo3 | Self::Portrait3)
    }
}

/// The two command dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Cameo, Cameo2..4, Portrait, Portrait2, Craft Robo and SD.
    Cameo,
    /// Portrait3.
    Portrait,
}

/// Static description of a cutter model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub vendor_id: u16,
    /// `None` for the placeholder used in a dry run without hardware.
    pub product_id: Option<u16>,
    pub name: &'static str,
    /// Cuttable width. If known, loaded media is expected left aligned.
    pub width_mm: Option<f64>,
    pub length_mm: Option<f64>,
    /// Physical limit, relative to `width_mm`.
    pub margin_left_mm: Option<f64>,
    /// Safety margin when moving backwards with thin media.
    pub margin_top_mm: Option<f64>,
    pub regmark: bool,
    pub family: Family,
}

const fn device(product_id: ProductId, name: &'static str, family: Family) -> DeviceProfile {
    DeviceProfile {
        vendor_id: VENDOR_ID_GRAPHTEC,
        product_id: Some(product_id as u16),
        name,
        width_mm: None,
        length_mm: None,
        margin_left_mm: None,
        margin_top_mm: None,
        regmark: false,
        family,
    }
}

const fn sized(mut profile: DeviceProfile, width_mm: f64, length_mm: f64) -> DeviceProfile {
    profile.width_mm = Some(width_mm);
    profile.length_mm = Some(length_mm);
    profile.regmark = true;
    profile
}

const fn margins(mut profile: DeviceProfile, left_mm: f64, top_mm: f64) -> DeviceProfile {
    profile.margin_left_mm = Some(left_mm);
    profile.margin_top_mm = Some(top_mm);
    profile
}

/// Known cutters, in the order they are searched for.
pub const DEVICES: &[DeviceProfile] = &[
    sized(device(ProductId::Portrait, "Silhouette Portrait", CameoFamily), 206.0, 3000.0),
    sized(device(ProductId::Portrait2, "Silhouette Portrait2", CameoFamily), 203.0, 3000.0),
    sized(device(ProductId::Portrait3, "Silhouette Portrait3", PortraitFamily), 216.0, 3000.0),
    margins(sized(device(ProductId::Cameo, "Silhouette Cameo", CameoFamily), 304.0, 3000.0), 9.0, 1.0),
    margins(sized(device(ProductId::Cameo2, "Silhouette Cameo2", CameoFamily), 304.0, 3000.0), 9.0, 1.0),
    margins(sized(device(ProductId::Cameo3, "Silhouette Cameo3", CameoFamily), 304.8, 3000.0), 0.0, 0.0),
    margins(sized(device(ProductId::Cameo4, "Silhouette Cameo4", CameoFamily), 304.8, 3000.0), 0.0, 0.0),
    // 24 in. would be 609.6 mm, Silhouette Studio leaves 600 mm of cuttable width.
    margins(sized(device(ProductId::Cameo4Pro, "Silhouette Cameo4 Pro", CameoFamily), 600.0, 3000.0), 0.0, 0.0),
    sized(device(ProductId::CraftRoboCc200_20, "Craft Robo CC200-20", CameoFamily), 200.0, 1000.0),
    device(ProductId::CraftRoboCc300_20, "Craft Robo CC300-20", CameoFamily),
    device(ProductId::SilhouetteSd1, "Silhouette SD 1", CameoFamily),
    device(ProductId::SilhouetteSd2, "Silhouette SD 2", CameoFamily),
];

impl DeviceProfile {
    /// Profile of a Graphtec device which is not in the table.
    pub fn unknown(product_id: u16) -> Self {
        Self {
            vendor_id: VENDOR_ID_GRAPHTEC,
            product_id: Some(product_id),
            name: "Unknown Graphtec device",
            width_mm: None,
            length_mm: None,
            margin_left_mm: None,
            margin_top_mm: None,
            regmark: false,
            family: Family::Cameo,
        }
    }

    /// Profile used for a dry run without any hardware attached.
    pub fn dummy() -> Self {
        Self {
            product_id: None,
            name: "Crashtest Dummy Device",
            ..Self::unknown(0)
        }
    }

    /// Finds the profile of a product id.
    pub fn find(vendor_id: u16, product_id: u16) -> Option<&'static DeviceProfile> {
        DEVICES
            .iter()
            .find(|d| d.vendor_id == vendor_id && d.product_id == Some(product_id))
    }

    /// Finds a profile by its display name.
    pub fn by_name(name: &str) -> Option<&'static DeviceProfile> {
        DEVICES.iter().find(|d| d.name == name)
    }

    /// The product, if it is one we know.
    pub fn product(&self) -> Option<ProductId> {
        ProductId::try_from(self.product_id?).ok()
    }

    pub fn is_cameo4_line(&self) -> bool {
        self.product().is_some_and(|p| p.is_cameo4_line())
    }

    pub fn is_cameo3_on(&self) -> bool {
        self.product().is_some_and(|p| p.is_cameo3_on())
    }

    pub fn is_cameo3(&self) -> bool {
        self.product() == Some(ProductId::Cameo3)
    }
}

impl Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.product(), self.product_id) {
            (None, Some(pid)) => write!(f, "{} {:#06x}", self.name, pid),
            _ => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup() {
        let cameo = DeviceProfile::find(0x0B4D, 0x1121).unwrap();
        assert_eq!(cameo.name, "Silhouette Cameo");
        assert_eq!(cameo.margin_left_mm, Some(9.0));
        assert_eq!(cameo.family, Family::Cameo);

        let portrait3 = DeviceProfile::by_name("Silhouette Portrait3").unwrap();
        assert_eq!(portrait3.family, Family::Portrait);
        assert_eq!(portrait3.width_mm, Some(216.0));

        assert!(DeviceProfile::find(0x0B4D, 0x1138).is_none());
    }

    #[test]
    fn generations() {
        let by = |pid: ProductId| DeviceProfile::find(VENDOR_ID_GRAPHTEC, pid as u16).unwrap();

        assert!(by(ProductId::Cameo4Pro).is_cameo4_line());
        assert!(by(ProductId::Cameo4).is_cameo3_on());
        assert!(by(ProductId::Portrait3).is_cameo3_on());
        assert!(!by(ProductId::Portrait3).is_cameo4_line());
        assert!(by(ProductId::Cameo3).is_cameo3());
        assert!(!by(ProductId::Cameo2).is_cameo3_on());
        assert!(!DeviceProfile::dummy().is_cameo3_on());
    }

    #[test]
    fn unknown_devices_show_their_product_id() {
        assert_eq!(
            DeviceProfile::unknown(0x1138).to_string(),
            "Unknown Graphtec device 0x1138"
        );
        assert_eq!(DeviceProfile::dummy().to_string(), "Crashtest Dummy Device");
        assert!(!DEVICES.iter().any(|d| d.product().is_none()));
    }
}
