//! Processing configuration, stored as XML
//!
//! ```xml
//! <processingConfig>
//!   <ellipsoid><a>6378137</a><e2>0.0066943799901</e2></ellipsoid>
//!   <topo>
//!     <lines_per_block>1000</lines_per_block>
//!     ...
//!   </topo>
//!   ...
//! </processingConfig>
//! ```

use crate::core::ellipsoid::Ellipsoid;
use crate::geometry::baseline::BaselineConfig;
use crate::geometry::geo2rdr::Geo2RdrConfig;
use crate::geometry::topo::TopoConfig;
use crate::types::{SarError, SarResult};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const ROOT_ELEMENT: &str = "processingConfig";

/// Settings for the Topo, geo2rdr and baseline drivers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingConfig {
    #[serde(default)]
    pub ellipsoid: Ellipsoid,
    #[serde(default)]
    pub topo: TopoConfig,
    #[serde(default)]
    pub geo2rdr: Geo2RdrConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
}

impl ProcessingConfig {
    /// Parse and validate an XML document
    pub fn from_xml_str(xml: &str) -> SarResult<Self> {
        let config: ProcessingConfig = from_str(xml)
            .map_err(|e| SarError::XmlParsing(format!("Failed to parse processing config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_xml_file<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        log::info!("Reading processing config: {}", path.as_ref().display());
        let xml = fs::read_to_string(path.as_ref())?;
        Self::from_xml_str(&xml)
    }

    pub fn to_xml_string(&self) -> SarResult<String> {
        quick_xml::se::to_string_with_root(ROOT_ELEMENT, self)
            .map_err(|e| SarError::XmlParsing(format!("Failed to write processing config: {}", e)))
    }

    pub fn to_xml_file<P: AsRef<Path>>(&self, path: P) -> SarResult<()> {
        fs::write(path.as_ref(), self.to_xml_string()?)?;
        log::debug!("Wrote processing config to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> SarResult<()> {
        Ellipsoid::new(self.ellipsoid.a(), self.ellipsoid.e2())?;
        self.topo.validate()?;
        self.geo2rdr.validate()?;
        self.baseline.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::DataInterpMethod;

    #[test]
    fn test_partial_document_uses_defaults() {
        let xml = r#"
            <processingConfig>
                <topo>
                    <lines_per_block>250</lines_per_block>
                    <dem_method>Bicubic</dem_method>
                    <epsg_out>32611</epsg_out>
                    <compute_mask>true</compute_mask>
                    <dem_margin>0.1</dem_margin>
                    <rdr2geo>
                        <threshold>0.01</threshold>
                        <max_iterations>30</max_iterations>
                        <extra_iterations>10</extra_iterations>
                        <orbit_method>Legendre</orbit_method>
                    </rdr2geo>
                </topo>
            </processingConfig>
        "#;
        let config = ProcessingConfig::from_xml_str(xml).unwrap();
        assert_eq!(config.topo.lines_per_block, 250);
        assert_eq!(config.topo.dem_method, DataInterpMethod::Bicubic);
        assert_eq!(config.topo.epsg_out, 32611);
        assert!(config.topo.compute_mask);
        assert_eq!(config.topo.rdr2geo.max_iterations, 30);
        assert_eq!(config.geo2rdr, Geo2RdrConfig::default());
        assert_eq!(config.ellipsoid, Ellipsoid::wgs84());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let xml = r#"
            <processingConfig>
                <geo2rdr>
                    <lines_per_block>0</lines_per_block>
                    <azimuth_shift>0</azimuth_shift>
                    <range_shift>0</range_shift>
                    <geo2rdr>
                        <threshold>1e-8</threshold>
                        <max_iterations>50</max_iterations>
                        <delta_range>1e-8</delta_range>
                        <orbit_method>Hermite</orbit_method>
                    </geo2rdr>
                </geo2rdr>
            </processingConfig>
        "#;
        assert!(matches!(
            ProcessingConfig::from_xml_str(xml),
            Err(SarError::InvalidParameter(_))
        ));
        assert!(matches!(
            ProcessingConfig::from_xml_str("<processingConfig><topo>"),
            Err(SarError::XmlParsing(_))
        ));
    }
}
