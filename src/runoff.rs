/**
Curve-number runoff and effective precipitation.

The curve number for the day is taken from the crop/hydrologic-group table,
interpolated through the season for grain and row crops and reduced for residue
cover. Its retention parameter is then corrected for antecedent moisture in the
top foot of soil before the SCS relative runoff is applied. Depths are inches
except for the retention parameter, which is carried in millimeters.
*/
use crate::crop::{CropId, PhenologyThresholds, Terrace};
use crate::error::{Result, SimError};
use crate::soil_hydra::{LAYERS, LayerVec, SoilColumn};
use crate::tables::ResidueClass;

// Depth of soil (in) whose moisture sets the antecedent condition
const RUNOFF_SOIL_DEPTH: f64 = 12.0;

/**
Fractional curve-number reduction for residue on the surface.

# Arguments
* `residue` - Residue mass, lb/acre.
* `class` - Residue class of the crop that left it.

# Returns
The reduction as a fraction; may be negative for light residue, callers floor it at 0.
*/
pub fn residue_adjustment(residue: f64, class: ResidueClass) -> f64 {
    let root = (0.001123 * residue).sqrt();
    match class {
        ResidueClass::NonFragile => (12.648 - 4.7 / root) / 100.0,
        ResidueClass::Fragile => (12.456 - 6.4098 / root) / 100.0,
    }
}

/**
Curve number for the day before the antecedent-moisture correction.

Grain and row crops move from the bare-fallow number before the vegetative
threshold, through the tabled number at effective cover, to a peak at maturity,
and drop back to fallow after maturity. All of these carry the residue factor.

# Arguments
* `crop` - Crop being simulated.
* `tabled` - Tabled curve number for the crop and hydrologic group.
* `fallow` - Bare-fallow curve number for the hydrologic group.
* `gdd` - Cumulative GDD for the day.
* `phenology` - GDD thresholds of the crop.
* `residue` - Residue mass, lb/acre.
* `class` - Residue class of the previous crop.
*/
pub fn seasonal_curve_number(
    crop: CropId,
    tabled: f64,
    fallow: f64,
    gdd: f64,
    phenology: &PhenologyThresholds,
    residue: f64,
    class: ResidueClass,
) -> f64 {
    if !crop.is_grain_or_tuber() {
        return tabled;
    }
    let inverse = 1.0 - residue_adjustment(residue, class).max(0.0);
    let fallow_adj = fallow * inverse;
    let p = phenology;
    let mut cn = if gdd <= p.vegetative {
        fallow_adj
    } else {
        let average = tabled * inverse;
        if gdd <= p.effective_cover {
            fallow_adj + (average - fallow_adj) * (gdd - p.vegetative) / (p.effective_cover - p.vegetative)
        } else {
            let peak = (2.0 * tabled - fallow) * inverse;
            average + (peak - average) * (gdd - p.effective_cover) / (p.maturity - p.effective_cover)
        }
    };
    // residue factor applied a second time after maturity
    if gdd > p.maturity {
        cn = fallow_adj * inverse;
    }
    cn
}

// Retention parameter (mm) and the curve number it corresponds to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    pub s: f64,
    pub curve_number: f64,
}

// Curve number for a retention parameter in mm
pub fn curve_number_for(s: f64) -> f64 {
    25400.0 / (s + 254.0)
}

// Dry and wet limits of the retention parameter (mm) for a curve number
pub fn retention_limits(cn: f64) -> (f64, f64) {
    let wet = 25.4 * (1000.0 / (23.0 * cn / (10.0 + 0.13 * cn)) - 10.0);
    let dry = 25.4 * (1000.0 / (4.2 * cn / (10.0 - 0.058 * cn)) - 10.0);
    (dry, wet)
}

/**
Retention parameter corrected for the water in the top foot of soil.

An exponential curve is fitted through the wet limit at field capacity and a
2.54 mm retention at saturation, then evaluated at the current soil water.

# Arguments
* `cn` - Curve number before correction.
* `theta` - Layer water contents.
* `soil` - Soil column.
* `wilting_point` - Season-adjusted wilting points.
*/
pub fn antecedent_retention(cn: f64, theta: &LayerVec, soil: &SoilColumn, wilting_point: &LayerVec) -> Retention {
    let (s_max, s_wet) = retention_limits(cn);
    let saturation = soil.saturation();
    let (mut sat, mut sw, mut fc) = (0.0, 0.0, 0.0);
    let mut total = 0.0;
    for i in 0..LAYERS {
        let d = soil.depth[i];
        total += d;
        let part = if total < RUNOFF_SOIL_DEPTH {
            d
        } else {
            RUNOFF_SOIL_DEPTH - (total - d)
        };
        let pwp = wilting_point[i];
        sat += (saturation - pwp) * 25.4 * part;
        sw += (theta[i] - pwp) * 25.4 * part;
        fc += (soil.field_capacity[i] - pwp) * 25.4 * part;
        if total >= RUNOFF_SOIL_DEPTH {
            break;
        }
    }
    let temp = (fc / (1.0 - s_wet / s_max) - fc).ln();
    let w2 = (temp - (sat / (1.0 - 2.54 / s_max) - sat).ln()) / (sat - fc);
    let w1 = temp + w2 * fc;
    let s = (s_max * (1.0 - sw / (sw + (w1 - w2 * sw).exp()))).max(2.54);
    Retention {
        s,
        curve_number: curve_number_for(s),
    }
}

/**
SCS relative runoff, the fraction of precipitation that runs off.

# Arguments
* `s` - Retention parameter, inches.
* `precip` - Rain plus melt for the day, inches.
*/
pub fn relative_runoff(s: f64, precip: f64) -> f64 {
    let ia = 0.2 * s;
    if ia > precip {
        return 0.0;
    }
    let excess = precip - ia;
    (excess * excess / (precip + 0.8 * s)) / precip
}

// How a day's rain splits at the surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Partition {
    pub effective: f64,
    pub runoff: f64,
    pub runon: f64,
}

/**
Splits rain into effective precipitation and runoff.

On terraced fields the runoff from the terrace interval collects in the channel
as run-on; only ponding above the channel depth leaves the field.

# Errors
`PhysicalInconsistency` for negative runoff, or effective precipitation above
rain on a field without terraces.
*/
pub fn partition(day: u32, rain: f64, relative: f64, terrace: Option<&Terrace>) -> Result<Partition> {
    let split = match terrace {
        None => {
            let effective = rain * (1.0 - relative);
            Partition {
                effective,
                runoff: rain - effective,
                runon: 0.0,
            }
        }
        Some(t) => {
            let runon = rain * relative * (t.interval - t.channel_width) / t.channel_width;
            let pond = (rain * relative + runon) / 12.0;
            if pond <= t.channel_depth {
                Partition {
                    effective: runon + rain,
                    runoff: 0.0,
                    runon,
                }
            } else {
                Partition {
                    effective: rain * (1.0 - relative) + t.channel_depth * 12.0,
                    runoff: (pond - t.channel_depth) * 12.0,
                    runon,
                }
            }
        }
    };
    if split.runoff < 0.0 || (terrace.is_none() && split.effective > rain) {
        return Err(SimError::PhysicalInconsistency {
            day,
            detail: format!(
                "rain {rain:.3} in split into effective {:.3} in and runoff {:.3} in",
                split.effective, split.runoff
            ),
        });
    }
    Ok(split)
}
