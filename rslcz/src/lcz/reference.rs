//! Reference parameter ranges of the seventeen Local Climate Zones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::parameters::MorphologyParameter;

/// LCZ class identifier.
///
/// Declaration order is the total order used everywhere a tie has to be
/// broken: built classes `1`..`10` first, then `A`..`G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LczClass {
    #[serde(rename = "1")]
    CompactHighRise,
    #[serde(rename = "2")]
    CompactMidRise,
    #[serde(rename = "3")]
    CompactLowRise,
    #[serde(rename = "4")]
    OpenHighRise,
    #[serde(rename = "5")]
    OpenMidRise,
    #[serde(rename = "6")]
    OpenLowRise,
    #[serde(rename = "7")]
    LightweightLowRise,
    #[serde(rename = "8")]
    LargeLowRise,
    #[serde(rename = "9")]
    SparselyBuilt,
    #[serde(rename = "10")]
    HeavyIndustry,
    #[serde(rename = "A")]
    DenseTrees,
    #[serde(rename = "B")]
    ScatteredTrees,
    #[serde(rename = "C")]
    BushScrub,
    #[serde(rename = "D")]
    LowPlants,
    #[serde(rename = "E")]
    BareRockOrPaved,
    #[serde(rename = "F")]
    BareSoilOrSand,
    #[serde(rename = "G")]
    Water,
}

impl LczClass {
    pub const ALL: [LczClass; 17] = [
        LczClass::CompactHighRise,
        LczClass::CompactMidRise,
        LczClass::CompactLowRise,
        LczClass::OpenHighRise,
        LczClass::OpenMidRise,
        LczClass::OpenLowRise,
        LczClass::LightweightLowRise,
        LczClass::LargeLowRise,
        LczClass::SparselyBuilt,
        LczClass::HeavyIndustry,
        LczClass::DenseTrees,
        LczClass::ScatteredTrees,
        LczClass::BushScrub,
        LczClass::LowPlants,
        LczClass::BareRockOrPaved,
        LczClass::BareSoilOrSand,
        LczClass::Water,
    ];

    /// Short identifier: `"1"`..`"10"`, `"A"`..`"G"`
    pub fn id(self) -> &'static str {
        match self {
            LczClass::CompactHighRise => "1",
            LczClass::CompactMidRise => "2",
            LczClass::CompactLowRise => "3",
            LczClass::OpenHighRise => "4",
            LczClass::OpenMidRise => "5",
            LczClass::OpenLowRise => "6",
            LczClass::LightweightLowRise => "7",
            LczClass::LargeLowRise => "8",
            LczClass::SparselyBuilt => "9",
            LczClass::HeavyIndustry => "10",
            LczClass::DenseTrees => "A",
            LczClass::ScatteredTrees => "B",
            LczClass::BushScrub => "C",
            LczClass::LowPlants => "D",
            LczClass::BareRockOrPaved => "E",
            LczClass::BareSoilOrSand => "F",
            LczClass::Water => "G",
        }
    }

    /// Integer code used in LCZ maps (`lcz_int`): 1..10, then A=11 .. G=17
    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_code(code: u8) -> Option<Self> {
        code.checked_sub(1)
            .and_then(|i| LczClass::ALL.get(i as usize).copied())
    }

    /// Built types (`1`..`10`) as opposed to land-cover types (`A`..`G`)
    pub fn is_built(self) -> bool {
        self <= LczClass::HeavyIndustry
    }

    pub fn description(self) -> &'static str {
        match self {
            LczClass::CompactHighRise => "Compact high-rise",
            LczClass::CompactMidRise => "Compact mid-rise",
            LczClass::CompactLowRise => "Compact low-rise",
            LczClass::OpenHighRise => "Open high-rise",
            LczClass::OpenMidRise => "Open mid-rise",
            LczClass::OpenLowRise => "Open low-rise",
            LczClass::LightweightLowRise => "Lightweight low-rise",
            LczClass::LargeLowRise => "Large low-rise",
            LczClass::SparselyBuilt => "Sparsely built",
            LczClass::HeavyIndustry => "Heavy industry",
            LczClass::DenseTrees => "Dense trees",
            LczClass::ScatteredTrees => "Scattered trees",
            LczClass::BushScrub => "Bush, scrub",
            LczClass::LowPlants => "Low plants",
            LczClass::BareRockOrPaved => "Bare rock or paved",
            LczClass::BareSoilOrSand => "Bare soil or sand",
            LczClass::Water => "Water",
        }
    }

    /// Standard LCZ map colour
    pub fn color(self) -> &'static str {
        match self {
            LczClass::CompactHighRise => "#8b0101",
            LczClass::CompactMidRise => "#cc0200",
            LczClass::CompactLowRise => "#fc0001",
            LczClass::OpenHighRise => "#be4c03",
            LczClass::OpenMidRise => "#ff6602",
            LczClass::OpenLowRise => "#ff9856",
            LczClass::LightweightLowRise => "#fbed08",
            LczClass::LargeLowRise => "#bcbcba",
            LczClass::SparselyBuilt => "#ffcca7",
            LczClass::HeavyIndustry => "#57555a",
            LczClass::DenseTrees => "#006700",
            LczClass::ScatteredTrees => "#05aa05",
            LczClass::BushScrub => "#648423",
            LczClass::LowPlants => "#bbdb7a",
            LczClass::BareRockOrPaved => "#010101",
            LczClass::BareSoilOrSand => "#fdf6ae",
            LczClass::Water => "#6d67fd",
        }
    }
}

impl fmt::Display for LczClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LczClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LczClass::ALL
            .iter()
            .copied()
            .find(|c| c.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown LCZ class '{}'", s))
    }
}

/// Inclusive parameter range; `max == None` is unbounded above
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl ParameterRange {
    pub const fn new(min: f64, max: f64) -> Self {
        ParameterRange {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: f64) -> Self {
        ParameterRange { min, max: None }
    }

    /// Both bounds inclusive
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }

    /// Reference value an out-of-range sample is compared to:
    /// the lower bound of an open range, else the midpoint
    pub fn target(&self) -> f64 {
        match self.max {
            None => self.min,
            Some(max) => (self.min + max) / 2.0,
        }
    }
}

impl fmt::Display for ParameterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            None => write!(f, ">{}", self.min),
            Some(max) => write!(f, "({}, {})", self.min, max),
        }
    }
}

/// One LCZ class with a range for every morphology parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LczClassDefinition {
    pub class: LczClass,
    /// Ranges indexed by [`MorphologyParameter::index`]
    ranges: [ParameterRange; 10],
}

impl LczClassDefinition {
    pub fn description(&self) -> &'static str {
        self.class.description()
    }

    pub fn range(&self, parameter: MorphologyParameter) -> ParameterRange {
        self.ranges[parameter.index()]
    }

    pub fn ranges(&self) -> impl Iterator<Item = (MorphologyParameter, ParameterRange)> + '_ {
        MorphologyParameter::ALL
            .iter()
            .map(move |&p| (p, self.ranges[p.index()]))
    }
}

/// Read-only table of class definitions, enumerated in [`LczClass`] order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LczReferenceTable {
    definitions: [LczClassDefinition; 17],
}

const fn r(min: f64, max: f64) -> ParameterRange {
    ParameterRange::new(min, max)
}

const fn open(min: f64) -> ParameterRange {
    ParameterRange::at_least(min)
}

const fn def(class: LczClass, ranges: [ParameterRange; 10]) -> LczClassDefinition {
    LczClassDefinition { class, ranges }
}

// Column order: sky view factor, aspect ratio, building / impervious / pervious
// surface fraction, height of roughness elements, terrain roughness class,
// surface admittance, surface albedo, anthropogenic heat output.
static STANDARD: LczReferenceTable = LczReferenceTable {
    definitions: [
        def(
            LczClass::CompactHighRise,
            [r(0.2, 0.4), open(2.0), r(40.0, 60.0), r(40.0, 60.0), r(0.0, 10.0),
             open(25.0), r(8.0, 8.0), r(1500.0, 1800.0), r(0.1, 0.2), r(50.0, 300.0)],
        ),
        def(
            LczClass::CompactMidRise,
            [r(0.3, 0.6), r(0.75, 2.0), r(40.0, 70.0), r(30.0, 50.0), r(0.0, 20.0),
             r(10.0, 25.0), r(6.0, 7.0), r(1500.0, 2200.0), r(0.1, 0.2), r(0.0, 75.0)],
        ),
        def(
            LczClass::CompactLowRise,
            [r(0.2, 0.6), r(0.75, 1.5), r(40.0, 70.0), r(20.0, 50.0), r(0.0, 30.0),
             r(3.0, 10.0), r(6.0, 6.0), r(1200.0, 1800.0), r(0.1, 0.2), r(0.0, 75.0)],
        ),
        def(
            LczClass::OpenHighRise,
            [r(0.5, 0.7), r(0.75, 1.25), r(20.0, 40.0), r(30.0, 40.0), r(30.0, 40.0),
             open(25.0), r(7.0, 8.0), r(1400.0, 1800.0), r(0.12, 0.25), r(0.0, 50.0)],
        ),
        def(
            LczClass::OpenMidRise,
            [r(0.5, 0.8), r(0.3, 0.75), r(20.0, 40.0), r(30.0, 50.0), r(20.0, 40.0),
             r(10.0, 25.0), r(5.0, 6.0), r(1400.0, 2000.0), r(0.12, 0.25), r(0.0, 25.0)],
        ),
        def(
            LczClass::OpenLowRise,
            [r(0.6, 0.9), r(0.3, 0.75), r(20.0, 40.0), r(20.0, 50.0), r(30.0, 60.0),
             r(3.0, 10.0), r(5.0, 6.0), r(1200.0, 1800.0), r(0.12, 0.25), r(0.0, 25.0)],
        ),
        def(
            LczClass::LightweightLowRise,
            [r(0.2, 0.5), r(1.0, 2.0), r(60.0, 90.0), r(0.0, 20.0), r(0.0, 30.0),
             r(2.0, 4.0), r(4.0, 5.0), r(800.0, 1500.0), r(0.15, 0.35), r(0.0, 35.0)],
        ),
        def(
            LczClass::LargeLowRise,
            [open(0.7), r(0.1, 0.3), r(30.0, 50.0), r(40.0, 50.0), r(0.0, 20.0),
             r(3.0, 10.0), r(5.0, 5.0), r(1200.0, 1800.0), r(0.15, 0.25), r(0.0, 50.0)],
        ),
        def(
            LczClass::SparselyBuilt,
            [r(0.8, 1.0), r(0.1, 0.25), r(10.0, 20.0), r(0.0, 20.0), r(60.0, 80.0),
             r(3.0, 10.0), r(5.0, 6.0), r(1000.0, 1800.0), r(0.12, 0.25), r(0.0, 10.0)],
        ),
        def(
            LczClass::HeavyIndustry,
            [r(0.6, 0.9), r(0.2, 0.5), r(20.0, 30.0), r(20.0, 40.0), r(40.0, 50.0),
             r(5.0, 15.0), r(5.0, 6.0), r(1000.0, 2500.0), r(0.12, 0.2), open(300.0)],
        ),
        def(
            LczClass::DenseTrees,
            [r(0.0, 0.4), open(1.0), r(0.0, 10.0), r(0.0, 10.0), r(90.0, 100.0),
             r(3.0, 30.0), r(8.0, 8.0), r(1000.0, 1800.0), r(0.12, 0.2), r(0.0, 0.0)],
        ),
        def(
            LczClass::ScatteredTrees,
            [r(0.5, 0.8), r(0.25, 0.75), r(0.0, 10.0), r(0.0, 10.0), r(90.0, 100.0),
             r(3.0, 15.0), r(5.0, 6.0), r(1200.0, 1800.0), r(0.15, 0.25), r(0.0, 0.0)],
        ),
        def(
            LczClass::BushScrub,
            [r(0.7, 0.9), r(0.25, 1.0), r(0.0, 10.0), r(0.0, 10.0), r(90.0, 100.0),
             r(0.0, 2.0), r(4.0, 5.0), r(700.0, 1500.0), r(0.15, 0.30), r(0.0, 0.0)],
        ),
        def(
            LczClass::LowPlants,
            [r(0.9, 1.0), r(0.0, 0.1), r(0.0, 10.0), r(0.0, 10.0), r(90.0, 100.0),
             r(0.0, 1.0), r(3.0, 4.0), r(1200.0, 1600.0), r(0.15, 0.25), r(0.0, 0.0)],
        ),
        def(
            LczClass::BareRockOrPaved,
            [r(0.9, 1.0), r(0.0, 0.1), r(0.0, 10.0), r(90.0, 100.0), r(0.0, 10.0),
             r(0.0, 0.25), r(1.0, 2.0), r(1200.0, 2500.0), r(0.15, 0.3), r(0.0, 0.0)],
        ),
        def(
            LczClass::BareSoilOrSand,
            [r(0.9, 1.0), r(0.0, 0.1), r(0.0, 10.0), r(0.0, 10.0), r(90.0, 100.0),
             r(0.0, 0.25), r(1.0, 2.0), r(600.0, 1400.0), r(0.2, 0.35), r(0.0, 0.0)],
        ),
        def(
            LczClass::Water,
            [r(0.9, 1.0), r(0.0, 0.1), r(0.0, 10.0), r(0.0, 10.0), r(90.0, 100.0),
             r(0.0, 0.25), r(1.0, 1.0), r(1500.0, 1500.0), r(0.02, 0.10), r(0.0, 0.0)],
        ),
    ],
};

impl LczReferenceTable {
    /// The standard table (Stewart & Oke ranges)
    pub fn standard() -> &'static LczReferenceTable {
        &STANDARD
    }

    pub fn get(&self, class: LczClass) -> &LczClassDefinition {
        &self.definitions[class as usize]
    }

    /// Lookup by identifier (`"1"`..`"10"`, `"A"`..`"G"`)
    pub fn get_by_id(&self, id: &str) -> Option<&LczClassDefinition> {
        id.parse::<LczClass>().ok().map(|c| self.get(c))
    }

    /// Definitions in class order
    pub fn definitions(&self) -> impl Iterator<Item = &LczClassDefinition> {
        self.definitions.iter()
    }

    /// `(class, description)` pairs in class order
    pub fn descriptions(&self) -> Vec<(LczClass, &'static str)> {
        self.definitions
            .iter()
            .map(|d| (d.class, d.description()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_in_class_order() {
        let table = LczReferenceTable::standard();
        for (definition, class) in table.definitions().zip(LczClass::ALL) {
            assert_eq!(definition.class, class);
        }
        assert_eq!(table.descriptions().len(), 17);
    }

    #[test]
    fn test_lookup_by_id() {
        let table = LczReferenceTable::standard();
        let g = table.get_by_id("G").unwrap();
        assert_eq!(g.description(), "Water");
        assert_eq!(
            g.range(MorphologyParameter::SurfaceAdmittance),
            ParameterRange::new(1500.0, 1500.0)
        );
        assert_eq!(table.get_by_id("10").unwrap().class, LczClass::HeavyIndustry);
        assert!(table.get_by_id("11").is_none());
    }

    #[test]
    fn test_class_codes_and_order() {
        assert_eq!(LczClass::CompactHighRise.code(), 1);
        assert_eq!(LczClass::DenseTrees.code(), 11);
        assert_eq!(LczClass::Water.code(), 17);
        assert_eq!(LczClass::from_code(11), Some(LczClass::DenseTrees));
        assert_eq!(LczClass::from_code(0), None);
        assert!(LczClass::HeavyIndustry < LczClass::DenseTrees);
        assert!(LczClass::HeavyIndustry.is_built());
        assert!(!LczClass::DenseTrees.is_built());
        assert_eq!("a".parse::<LczClass>().unwrap(), LczClass::DenseTrees);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = ParameterRange::new(0.2, 0.4);
        assert!(range.contains(0.2));
        assert!(range.contains(0.4));
        assert!(!range.contains(0.41));
        let open_range = ParameterRange::at_least(25.0);
        assert!(open_range.contains(25.0));
        assert!(open_range.contains(1e9));
        assert!(!open_range.contains(24.9));
    }

    #[test]
    fn test_range_target() {
        assert_eq!(ParameterRange::new(40.0, 60.0).target(), 50.0);
        assert_eq!(ParameterRange::at_least(300.0).target(), 300.0);
        assert_eq!(ParameterRange::new(0.0, 0.0).target(), 0.0);
    }

    #[test]
    fn test_range_display() {
        assert_eq!(ParameterRange::at_least(2.0).to_string(), ">2");
        assert_eq!(ParameterRange::new(0.1, 0.2).to_string(), "(0.1, 0.2)");
    }

    #[test]
    fn test_serialized_class_id() {
        let json = serde_json::to_string(&LczClass::BushScrub).unwrap();
        assert_eq!(json, "\"C\"");
    }
}
